//! Unit-level tests against the public graph API.

mod graph_store_test;
mod path_test;
mod query_builder_test;
