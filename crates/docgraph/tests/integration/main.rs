//! End-to-end tests of the document layer and snapshot persistence.

mod document_test;
