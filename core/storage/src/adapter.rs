//! Adapter trait definitions for the local store and the remote source.

use async_trait::async_trait;

use offsync_common::{QueryParams, Record, Result, TypeName};

/// Local persistence adapter: CRUD against on-device storage.
///
/// Implementations are expected to be fast relative to the network; the
/// orchestrator serves every read from here before anything else. The
/// trailing `from_job` flag distinguishes organic calls from sync-machinery
/// replay and is ignored by local implementations.
///
/// `update` must upsert: it is the write-back target for records fetched
/// remotely by replayed read jobs, which may not exist locally yet.
#[async_trait]
pub trait LocalAdapter: Send + Sync {
    /// Get the adapter name (e.g., "memory", "sqlite").
    fn name(&self) -> &str;

    /// Resolve the primary-key field name for a type.
    ///
    /// # Errors
    /// - `Error::Config` if the type has no known primary key; this is
    ///   treated as a fatal misconfiguration, never swallowed
    fn primary_key_field(&self, type_name: &TypeName) -> Result<String>;

    /// Look up a single record by key.
    async fn find(&self, type_name: &TypeName, key: &str, from_job: bool)
        -> Result<Option<Record>>;

    /// Fetch every record of a type.
    async fn find_all(&self, type_name: &TypeName, from_job: bool) -> Result<Vec<Record>>;

    /// Look up a batch of records.
    ///
    /// # Postconditions
    /// - The result is aligned with `keys`: position `i` holds the record
    ///   for `keys[i]`, or `None` on a miss
    async fn find_many(
        &self,
        type_name: &TypeName,
        keys: &[String],
        from_job: bool,
    ) -> Result<Vec<Option<Record>>>;

    /// Fetch records matching opaque filter parameters.
    async fn query(
        &self,
        type_name: &TypeName,
        params: &QueryParams,
        from_job: bool,
    ) -> Result<Vec<Record>>;

    /// Store a new record.
    async fn create(
        &self,
        type_name: &TypeName,
        key: &str,
        record: &Record,
        from_job: bool,
    ) -> Result<()>;

    /// Replace a record (upsert).
    async fn update(
        &self,
        type_name: &TypeName,
        key: &str,
        record: &Record,
        from_job: bool,
    ) -> Result<()>;

    /// Remove a record.
    async fn delete(&self, type_name: &TypeName, key: &str, from_job: bool) -> Result<()>;
}

/// Remote adapter: CRUD against the network source of truth.
///
/// Only ever invoked from job-queue execution or the direct escalation
/// path in `query`; never awaited before a caller-facing read returns.
/// `from_job` is `true` exactly when the call is a replay of a deferred
/// job, so implementations wrapping richer clients can tell replay from
/// organic traffic.
#[async_trait]
pub trait RemoteAdapter: Send + Sync {
    /// Get the adapter name.
    fn name(&self) -> &str;

    /// Fetch a single record by key.
    async fn find(&self, type_name: &TypeName, key: &str, from_job: bool)
        -> Result<Option<Record>>;

    /// Fetch every record of a type.
    async fn find_all(&self, type_name: &TypeName, from_job: bool) -> Result<Vec<Record>>;

    /// Fetch a batch of records, aligned with `keys` as in
    /// [`LocalAdapter::find_many`].
    async fn find_many(
        &self,
        type_name: &TypeName,
        keys: &[String],
        from_job: bool,
    ) -> Result<Vec<Option<Record>>>;

    /// Fetch records matching opaque filter parameters.
    async fn query(
        &self,
        type_name: &TypeName,
        params: &QueryParams,
        from_job: bool,
    ) -> Result<Vec<Record>>;

    /// Push a new record to the source of truth.
    async fn create(
        &self,
        type_name: &TypeName,
        key: &str,
        record: &Record,
        from_job: bool,
    ) -> Result<()>;

    /// Push a replacement record (last write wins).
    async fn update(
        &self,
        type_name: &TypeName,
        key: &str,
        record: &Record,
        from_job: bool,
    ) -> Result<()>;

    /// Delete a record from the source of truth.
    async fn delete(&self, type_name: &TypeName, key: &str, from_job: bool) -> Result<()>;
}
