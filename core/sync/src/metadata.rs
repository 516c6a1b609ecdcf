//! Fetch-freshness and pending-mutation bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use offsync_common::{Error, Result, TypeName};

/// Which shape of read produced a fetch record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchScope {
    /// A whole-collection read (`find_all`).
    All,
    /// A single-record read (`find`).
    One,
    /// A batch read (`find_many`).
    Many,
}

impl fmt::Display for FetchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchScope::All => write!(f, "all"),
            FetchScope::One => write!(f, "one"),
            FetchScope::Many => write!(f, "many"),
        }
    }
}

/// Timestamp of the last successful remote fetch for one scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRecord {
    /// Read shape that produced this record.
    pub scope: FetchScope,
    /// Entity type that was fetched.
    pub type_name: TypeName,
    /// Key for single-record scopes, `None` for collection scopes.
    pub key: Option<String>,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
}

/// Pending-sync marker for one locally mutated record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncMeta {
    /// Entity type of the mutated record.
    pub type_name: TypeName,
    /// Primary key of the mutated record.
    pub key: String,
    /// Whether the mutation still awaits remote confirmation.
    pub dirty: bool,
    /// When the record was last mutated locally.
    pub last_mutated_at: DateTime<Utc>,
}

/// Bookkeeping for per-type and per-record sync state.
///
/// Fetch records are keyed by a `scope:type[:key]` composite; type names
/// cannot contain `:`, so identifiers of different types never collide.
/// Every operation is idempotent and last-write-wins; the store carries
/// no cross-key ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataStore {
    fetches: HashMap<String, FetchRecord>,
    mutations: HashMap<String, SyncMeta>,
}

impl MetadataStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn fetch_key(scope: FetchScope, type_name: &TypeName, key: Option<&str>) -> String {
        match key {
            Some(key) => format!("{}:{}:{}", scope, type_name, key),
            None => format!("{}:{}", scope, type_name),
        }
    }

    fn mutation_key(type_name: &TypeName, key: &str) -> String {
        format!("{}:{}", type_name, key)
    }

    /// Record a successful remote fetch now. Last writer wins.
    pub fn record_fetch(&mut self, scope: FetchScope, type_name: &TypeName, key: Option<&str>) {
        self.record_fetch_at(scope, type_name, key, Utc::now());
    }

    /// Record a successful remote fetch at an explicit instant.
    pub fn record_fetch_at(
        &mut self,
        scope: FetchScope,
        type_name: &TypeName,
        key: Option<&str>,
        fetched_at: DateTime<Utc>,
    ) {
        let record = FetchRecord {
            scope,
            type_name: type_name.clone(),
            key: key.map(String::from),
            fetched_at,
        };
        self.fetches
            .insert(Self::fetch_key(scope, type_name, key), record);
    }

    /// When the matching fetch last completed, if ever.
    pub fn last_fetch(
        &self,
        scope: FetchScope,
        type_name: &TypeName,
        key: Option<&str>,
    ) -> Option<DateTime<Utc>> {
        self.fetches
            .get(&Self::fetch_key(scope, type_name, key))
            .map(|record| record.fetched_at)
    }

    /// Mark a record as locally mutated and awaiting remote confirmation.
    pub fn mark_dirty(&mut self, type_name: &TypeName, key: &str) {
        let meta = SyncMeta {
            type_name: type_name.clone(),
            key: key.to_string(),
            dirty: true,
            last_mutated_at: Utc::now(),
        };
        self.mutations
            .insert(Self::mutation_key(type_name, key), meta);
    }

    /// Clear the pending-sync marker. Safe to call redundantly.
    pub fn clear_dirty(&mut self, type_name: &TypeName, key: &str) {
        if let Some(meta) = self.mutations.get_mut(&Self::mutation_key(type_name, key)) {
            meta.dirty = false;
        }
    }

    /// Whether a record still awaits remote confirmation.
    pub fn is_dirty(&self, type_name: &TypeName, key: &str) -> bool {
        self.mutations
            .get(&Self::mutation_key(type_name, key))
            .map(|meta| meta.dirty)
            .unwrap_or(false)
    }

    /// All records still awaiting remote confirmation.
    pub fn dirty_entries(&self) -> Vec<&SyncMeta> {
        self.mutations.values().filter(|meta| meta.dirty).collect()
    }

    /// Serialize to JSON so a host can persist the bookkeeping.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}
