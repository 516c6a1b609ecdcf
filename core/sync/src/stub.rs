//! Placeholder records for local misses.

use std::sync::Arc;

use offsync_common::{Record, Result, TypeName};
use offsync_storage::LocalAdapter;

/// Synthesizes identifier-only records when a local lookup misses.
///
/// A stub is never persisted and is recomputed per call, so callers
/// always receive a well-formed result shape while the real fetch is
/// still outstanding. Stubs are only built when at least one identifier
/// was supplied; a query with no identifiers and no results stays empty.
pub struct StubFactory {
    local: Arc<dyn LocalAdapter>,
}

impl StubFactory {
    /// Create a factory resolving primary-key fields through the local adapter.
    pub fn new(local: Arc<dyn LocalAdapter>) -> Self {
        Self { local }
    }

    /// Build `{ <primary-key field>: key }` for one identifier.
    ///
    /// # Errors
    /// - `Error::Config` if the primary-key field for the type cannot be
    ///   resolved
    pub fn stub_for(&self, type_name: &TypeName, key: &str) -> Result<Record> {
        let field = self.local.primary_key_field(type_name)?;
        let mut record = Record::new();
        record.insert(field, serde_json::Value::String(key.to_string()));
        Ok(record)
    }

    /// Build a stub per key, each mapped independently.
    pub fn stubs_for(&self, type_name: &TypeName, keys: &[String]) -> Result<Vec<Record>> {
        keys.iter().map(|key| self.stub_for(type_name, key)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offsync_storage::MemoryLocalAdapter;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_stub_shape() {
        let factory = StubFactory::new(Arc::new(MemoryLocalAdapter::new()));
        let widgets = TypeName::new("widget").unwrap();

        let stub = factory.stub_for(&widgets, "w1").unwrap();

        assert_eq!(stub.len(), 1);
        assert_eq!(stub.get("id"), Some(&json!("w1")));
    }

    #[test]
    fn test_stub_uses_resolved_primary_key_field() {
        let mut keys = HashMap::new();
        keys.insert("order".to_string(), "order_no".to_string());
        let factory = StubFactory::new(Arc::new(MemoryLocalAdapter::with_primary_keys(keys)));

        let orders = TypeName::new("order").unwrap();
        let stub = factory.stub_for(&orders, "o-17").unwrap();

        assert_eq!(stub.get("order_no"), Some(&json!("o-17")));
    }

    #[test]
    fn test_stubs_for_maps_each_key() {
        let factory = StubFactory::new(Arc::new(MemoryLocalAdapter::new()));
        let widgets = TypeName::new("widget").unwrap();

        let stubs = factory
            .stubs_for(&widgets, &["w1".to_string(), "w2".to_string()])
            .unwrap();

        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0].get("id"), Some(&json!("w1")));
        assert_eq!(stubs[1].get("id"), Some(&json!("w2")));
    }

    #[test]
    fn test_unresolvable_primary_key_is_config_error() {
        let factory =
            StubFactory::new(Arc::new(MemoryLocalAdapter::with_primary_keys(HashMap::new())));
        let widgets = TypeName::new("widget").unwrap();

        let err = factory.stub_for(&widgets, "w1").unwrap_err();
        assert!(err.is_config());
    }
}
