//! In-memory adapters for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use crate::adapter::{LocalAdapter, RemoteAdapter};
use offsync_common::{Error, QueryParams, Record, Result, TypeName};

/// Records of one type, keyed by primary key.
type Table = HashMap<String, Record>;

/// Naive subset match: every filter field must equal the record field.
fn matches(record: &Record, params: &QueryParams) -> bool {
    params
        .iter()
        .all(|(field, value)| record.get(field) == Some(value))
}

/// In-memory local adapter.
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop. By default every type resolves its primary key to
/// `"id"`; with [`MemoryLocalAdapter::with_primary_keys`] only the
/// registered types resolve, and unknown types yield a configuration
/// error.
pub struct MemoryLocalAdapter {
    tables: RwLock<HashMap<String, Table>>,
    primary_keys: Option<HashMap<String, String>>,
    failing: AtomicBool,
}

impl MemoryLocalAdapter {
    /// Create a new empty adapter resolving `"id"` for every type.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            primary_keys: None,
            failing: AtomicBool::new(false),
        }
    }

    /// Create an adapter that only resolves the registered primary keys.
    pub fn with_primary_keys(primary_keys: HashMap<String, String>) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            primary_keys: Some(primary_keys),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail with a local-store error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Seed a record directly, bypassing the adapter interface.
    pub fn insert(&self, type_name: &TypeName, key: &str, record: Record) {
        self.tables
            .write()
            .unwrap()
            .entry(type_name.as_str().to_string())
            .or_default()
            .insert(key.to_string(), record);
    }

    /// Read a record directly, bypassing the adapter interface.
    pub fn get(&self, type_name: &TypeName, key: &str) -> Option<Record> {
        self.tables
            .read()
            .unwrap()
            .get(type_name.as_str())
            .and_then(|table| table.get(key))
            .cloned()
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::LocalStore("injected failure".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryLocalAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalAdapter for MemoryLocalAdapter {
    fn name(&self) -> &str {
        "memory"
    }

    fn primary_key_field(&self, type_name: &TypeName) -> Result<String> {
        match &self.primary_keys {
            None => Ok("id".to_string()),
            Some(keys) => keys.get(type_name.as_str()).cloned().ok_or_else(|| {
                Error::Config(format!("no primary key registered for type {}", type_name))
            }),
        }
    }

    async fn find(
        &self,
        type_name: &TypeName,
        key: &str,
        _from_job: bool,
    ) -> Result<Option<Record>> {
        self.check_failing()?;
        Ok(self.get(type_name, key))
    }

    async fn find_all(&self, type_name: &TypeName, _from_job: bool) -> Result<Vec<Record>> {
        self.check_failing()?;
        let tables = self.tables.read().unwrap();
        Ok(tables
            .get(type_name.as_str())
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_many(
        &self,
        type_name: &TypeName,
        keys: &[String],
        _from_job: bool,
    ) -> Result<Vec<Option<Record>>> {
        self.check_failing()?;
        let tables = self.tables.read().unwrap();
        let table = tables.get(type_name.as_str());
        Ok(keys
            .iter()
            .map(|key| table.and_then(|t| t.get(key)).cloned())
            .collect())
    }

    async fn query(
        &self,
        type_name: &TypeName,
        params: &QueryParams,
        _from_job: bool,
    ) -> Result<Vec<Record>> {
        self.check_failing()?;
        let tables = self.tables.read().unwrap();
        Ok(tables
            .get(type_name.as_str())
            .map(|table| {
                table
                    .values()
                    .filter(|record| matches(record, params))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(
        &self,
        type_name: &TypeName,
        key: &str,
        record: &Record,
        _from_job: bool,
    ) -> Result<()> {
        self.check_failing()?;
        self.insert(type_name, key, record.clone());
        Ok(())
    }

    async fn update(
        &self,
        type_name: &TypeName,
        key: &str,
        record: &Record,
        _from_job: bool,
    ) -> Result<()> {
        self.check_failing()?;
        self.insert(type_name, key, record.clone());
        Ok(())
    }

    async fn delete(&self, type_name: &TypeName, key: &str, _from_job: bool) -> Result<()> {
        self.check_failing()?;
        if let Some(table) = self.tables.write().unwrap().get_mut(type_name.as_str()) {
            table.remove(key);
        }
        Ok(())
    }
}

/// One observed call against the in-memory remote adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    /// Operation name ("find", "create", ...).
    pub operation: &'static str,
    /// Whether the call was a job replay.
    pub from_job: bool,
}

/// In-memory remote adapter.
///
/// Mirrors [`MemoryLocalAdapter`] but records every call so tests can
/// assert on traffic: which operations ran, whether they were replays,
/// and that nothing hit the network before a read returned. Supports
/// injected latency so jobs stay observably in flight under paused-time
/// tests.
pub struct MemoryRemoteAdapter {
    tables: RwLock<HashMap<String, Table>>,
    calls: Mutex<Vec<RemoteCall>>,
    latency: Mutex<Option<Duration>>,
    failing: AtomicBool,
}

impl MemoryRemoteAdapter {
    /// Create a new empty adapter.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            latency: Mutex::new(None),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every subsequent operation by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Seed a record on the "server".
    pub fn insert(&self, type_name: &TypeName, key: &str, record: Record) {
        self.tables
            .write()
            .unwrap()
            .entry(type_name.as_str().to_string())
            .or_default()
            .insert(key.to_string(), record);
    }

    /// Read a record on the "server".
    pub fn get(&self, type_name: &TypeName, key: &str) -> Option<Record> {
        self.tables
            .read()
            .unwrap()
            .get(type_name.as_str())
            .and_then(|table| table.get(key))
            .cloned()
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    /// How many times `operation` has been invoked.
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    async fn observe(&self, operation: &'static str, from_job: bool) -> Result<()> {
        self.calls.lock().unwrap().push(RemoteCall {
            operation,
            from_job,
        });
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::RemoteTransport("injected failure".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryRemoteAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteAdapter for MemoryRemoteAdapter {
    fn name(&self) -> &str {
        "memory"
    }

    async fn find(
        &self,
        type_name: &TypeName,
        key: &str,
        from_job: bool,
    ) -> Result<Option<Record>> {
        self.observe("find", from_job).await?;
        Ok(self.get(type_name, key))
    }

    async fn find_all(&self, type_name: &TypeName, from_job: bool) -> Result<Vec<Record>> {
        self.observe("find_all", from_job).await?;
        let tables = self.tables.read().unwrap();
        Ok(tables
            .get(type_name.as_str())
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_many(
        &self,
        type_name: &TypeName,
        keys: &[String],
        from_job: bool,
    ) -> Result<Vec<Option<Record>>> {
        self.observe("find_many", from_job).await?;
        let tables = self.tables.read().unwrap();
        let table = tables.get(type_name.as_str());
        Ok(keys
            .iter()
            .map(|key| table.and_then(|t| t.get(key)).cloned())
            .collect())
    }

    async fn query(
        &self,
        type_name: &TypeName,
        params: &QueryParams,
        from_job: bool,
    ) -> Result<Vec<Record>> {
        self.observe("query", from_job).await?;
        let tables = self.tables.read().unwrap();
        Ok(tables
            .get(type_name.as_str())
            .map(|table| {
                table
                    .values()
                    .filter(|record| matches(record, params))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(
        &self,
        type_name: &TypeName,
        key: &str,
        record: &Record,
        from_job: bool,
    ) -> Result<()> {
        self.observe("create", from_job).await?;
        self.insert(type_name, key, record.clone());
        Ok(())
    }

    async fn update(
        &self,
        type_name: &TypeName,
        key: &str,
        record: &Record,
        from_job: bool,
    ) -> Result<()> {
        self.observe("update", from_job).await?;
        self.insert(type_name, key, record.clone());
        Ok(())
    }

    async fn delete(&self, type_name: &TypeName, key: &str, from_job: bool) -> Result<()> {
        self.observe("delete", from_job).await?;
        if let Some(table) = self.tables.write().unwrap().get_mut(type_name.as_str()) {
            table.remove(key);
        }
        Ok(())
    }
}
