//! Common types used throughout Offsync.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of an entity type (e.g., "widget", "order").
///
/// Type names namespace every piece of bookkeeping in the sync core, so
/// identifiers of different types never collide even when their keys do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeName(String);

impl TypeName {
    /// Create a new TypeName from a string.
    ///
    /// # Preconditions
    /// - `name` must be non-empty
    /// - `name` must not contain `:` (reserved for composite bookkeeping keys)
    ///
    /// # Errors
    /// - Returns error if name is empty or contains a separator
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(crate::Error::InvalidInput(
                "TypeName cannot be empty".to_string(),
            ));
        }
        if name.contains(':') {
            return Err(crate::Error::InvalidInput(
                "TypeName cannot contain ':'".to_string(),
            ));
        }
        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque record, identified by (type name, primary key).
///
/// The sync core never inspects fields beyond the primary key; field
/// contents are owned by the caller and the two adapters.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Opaque filter parameters for query operations.
pub type QueryParams = serde_json::Map<String, serde_json::Value>;

/// Extract a record's primary key as a string.
///
/// String and numeric identifiers are both accepted; anything else
/// (or a missing field) yields `None`.
pub fn record_key(record: &Record, primary_key_field: &str) -> Option<String> {
    match record.get(primary_key_field)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
