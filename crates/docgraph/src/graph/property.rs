//! Property system for node and edge metadata.
//!
//! Values are explicitly tagged so the snapshot format stays well defined.

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strongly-typed property value for node/edge metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// String value (content, names, ISO timestamps)
    String(String),
    /// Integer value
    Int(i64),
    /// Floating point value (scores, weights)
    Float(f64),
    /// Boolean flag
    Bool(bool),
    /// Ordered list of values
    List(Vec<PropertyValue>),
    /// Nested key-value map (document metadata)
    Map(PropertyMap),
    /// Explicit null/absence of value
    Null,
}

impl PropertyValue {
    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "string",
            PropertyValue::Int(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::List(_) => "list",
            PropertyValue::Map(_) => "map",
            PropertyValue::Null => "null",
        }
    }

    /// Exact-match comparison used by query filters.
    ///
    /// Floats compare within `f64::EPSILON`; everything else must be equal
    /// and of the same variant.
    pub fn matches(&self, other: &PropertyValue) -> bool {
        match (self, other) {
            (PropertyValue::Float(a), PropertyValue::Float(b)) => (a - b).abs() < f64::EPSILON,
            (a, b) => a == b,
        }
    }

    /// The string, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            PropertyValue::Int(i) => Some(i),
            _ => None,
        }
    }

    /// The float, if this is a `Float`. Integers are not widened.
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            PropertyValue::Float(f) => Some(f),
            _ => None,
        }
    }

    /// The flag, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            PropertyValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// The elements, if this is a `List`.
    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// The nested map, if this is a `Map`.
    pub fn as_map(&self) -> Option<&PropertyMap> {
        match self {
            PropertyValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// True for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// False if this value, or any value nested in it, is a NaN or infinite
    /// float. JSON has no encoding for those.
    pub fn is_finite(&self) -> bool {
        match self {
            PropertyValue::Float(f) => f.is_finite(),
            PropertyValue::List(items) => items.iter().all(PropertyValue::is_finite),
            PropertyValue::Map(map) => map.non_finite_key().is_none(),
            _ => true,
        }
    }
}

macro_rules! impl_from_scalar {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for PropertyValue {
                fn from(value: $source) -> Self {
                    PropertyValue::$variant(value.into())
                }
            }
        )*
    };
}

impl_from_scalar! {
    String => String,
    &str => String,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    bool => Bool,
    Vec<PropertyValue> => List,
    PropertyMap => Map,
}

impl From<Vec<String>> for PropertyValue {
    fn from(items: Vec<String>) -> Self {
        PropertyValue::List(items.into_iter().map(PropertyValue::String).collect())
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropertyValue::Null, Into::into)
    }
}

/// Key-value metadata store for nodes and edges.
///
/// Keys are kept sorted so serialized snapshots are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap {
    data: BTreeMap<String, PropertyValue>,
}

impl PropertyMap {
    /// Create a new empty property map.
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
        }
    }

    /// Builder pattern: add a property and return self.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Insert a property value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.data.insert(key.into(), value.into())
    }

    /// Get a property value by key.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.data.get(key)
    }

    /// Get a mutable property value by key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut PropertyValue> {
        self.data.get_mut(key)
    }

    /// Remove a property by key.
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.data.remove(key)
    }

    /// Check if a property exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Get the number of properties.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the property map is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over all properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.data.iter()
    }

    /// Merge `other` into this map, overwriting duplicate keys.
    pub fn extend(&mut self, other: PropertyMap) {
        self.data.extend(other.data);
    }

    /// True if every entry of `filter` is present here with a matching value.
    pub fn matches_all(&self, filter: &PropertyMap) -> bool {
        filter.iter().all(|(key, expected)| {
            self.data
                .get(key)
                .is_some_and(|actual| actual.matches(expected))
        })
    }

    /// String value of `key`; `None` if absent or not a string.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(PropertyValue::as_str)
    }

    /// Integer value of `key`.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(PropertyValue::as_int)
    }

    /// Float value of `key`.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(PropertyValue::as_float)
    }

    /// Boolean value of `key`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(PropertyValue::as_bool)
    }

    /// List value of `key`.
    pub fn get_list(&self, key: &str) -> Option<&[PropertyValue]> {
        self.data.get(key).and_then(PropertyValue::as_list)
    }

    /// Nested map under `key` (document metadata lives here).
    pub fn get_map(&self, key: &str) -> Option<&PropertyMap> {
        self.data.get(key).and_then(PropertyValue::as_map)
    }

    /// First top-level key whose value holds a NaN or infinite float.
    pub fn non_finite_key(&self) -> Option<&str> {
        self.data
            .iter()
            .find(|(_, value)| !value.is_finite())
            .map(|(key, _)| key.as_str())
    }

    /// Reject maps that could not be written to a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidOperation`] naming the first property
    /// holding a NaN or infinite float.
    pub fn ensure_finite(&self) -> Result<()> {
        match self.non_finite_key() {
            Some(key) => Err(GraphError::InvalidOperation {
                message: format!("property '{key}' holds a non-finite float"),
            }),
            None => Ok(()),
        }
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyMap {
    fn from_iter<T: IntoIterator<Item = (String, PropertyValue)>>(iter: T) -> Self {
        Self {
            data: BTreeMap::from_iter(iter),
        }
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, PropertyValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}
