//! Deferred remote operations with per-key de-duplication.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::metadata::{FetchScope, MetadataStore};
use offsync_common::{record_key, Error, QueryParams, Record, Result, TypeName};
use offsync_storage::{LocalAdapter, RemoteAdapter};

/// Arguments of a deferred remote operation.
#[derive(Debug, Clone)]
pub enum JobKind {
    /// Refresh a single record.
    Find { type_name: TypeName, key: String },
    /// Refresh every record of a type.
    FindAll { type_name: TypeName },
    /// Refresh a batch of records.
    FindMany {
        type_name: TypeName,
        keys: Vec<String>,
    },
    /// Re-run a query against the source of truth.
    Query {
        type_name: TypeName,
        params: QueryParams,
    },
    /// Replay a local create.
    Create {
        type_name: TypeName,
        key: String,
        record: Record,
    },
    /// Replay a local update.
    Update {
        type_name: TypeName,
        key: String,
        record: Record,
    },
    /// Replay a local delete.
    Delete { type_name: TypeName, key: String },
}

impl JobKind {
    /// Operation name for logs and failure reports.
    pub fn operation(&self) -> &'static str {
        match self {
            JobKind::Find { .. } => "find",
            JobKind::FindAll { .. } => "find_all",
            JobKind::FindMany { .. } => "find_many",
            JobKind::Query { .. } => "query",
            JobKind::Create { .. } => "create",
            JobKind::Update { .. } => "update",
            JobKind::Delete { .. } => "delete",
        }
    }
}

/// A deferred remote operation.
///
/// The queue owns a job for its full lifetime; nothing mutates a job
/// after enqueue.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique id for logs and failure reports.
    pub id: Uuid,
    /// The operation to replay.
    pub kind: JobKind,
    /// Logical identity for de-duplication, if any.
    pub dedupe_key: Option<String>,
}

impl Job {
    /// Create a job with no de-duplication key.
    pub fn new(kind: JobKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            dedupe_key: None,
        }
    }

    /// Set the de-duplication key.
    pub fn with_dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }
}

/// Failure report delivered on the queue's failure channel.
#[derive(Debug)]
pub struct JobFailure {
    /// Id of the failed job.
    pub job_id: Uuid,
    /// Operation name of the failed job.
    pub operation: &'static str,
    /// The error that ended it.
    pub error: Error,
}

/// Queue of deferred remote operations.
///
/// Jobs carrying the same non-null dedupe key collapse to at most one
/// queued-or-executing instance; the later job is dropped silently.
/// Jobs with no dedupe key are never de-duplicated. Admitted jobs run
/// to completion concurrently across keys; a failed job is logged,
/// reported on the failure channel, and discarded without retry.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    local: Arc<dyn LocalAdapter>,
    remote: Arc<dyn RemoteAdapter>,
    metadata: Arc<RwLock<MetadataStore>>,
    in_flight: Mutex<HashSet<String>>,
    outstanding: watch::Sender<usize>,
    failure_tx: mpsc::UnboundedSender<JobFailure>,
}

impl JobQueue {
    /// Create a queue draining into the given adapters and bookkeeping.
    pub fn new(
        local: Arc<dyn LocalAdapter>,
        remote: Arc<dyn RemoteAdapter>,
        metadata: Arc<RwLock<MetadataStore>>,
        failure_tx: mpsc::UnboundedSender<JobFailure>,
    ) -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            inner: Arc::new(QueueInner {
                local,
                remote,
                metadata,
                in_flight: Mutex::new(HashSet::new()),
                outstanding,
                failure_tx,
            }),
        }
    }

    /// Admit a job unless one with the same dedupe key is already
    /// queued or executing.
    ///
    /// The check-and-insert on the dedupe key happens under one lock,
    /// so two near-simultaneous calls cannot both admit.
    pub fn enqueue(&self, job: Job) {
        if let Some(key) = &job.dedupe_key {
            let mut in_flight = self.inner.in_flight.lock().unwrap();
            if !in_flight.insert(key.clone()) {
                debug!(
                    "dropping job {} ({}): {} already in flight",
                    job.id,
                    job.kind.operation(),
                    key
                );
                return;
            }
        }
        self.inner.outstanding.send_modify(|n| *n += 1);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let Job {
                id,
                kind,
                dedupe_key,
            } = job;
            let operation = kind.operation();

            match inner.execute(kind).await {
                Ok(()) => debug!("job {} ({}) completed", id, operation),
                Err(error) => {
                    warn!("job {} ({}) failed: {}", id, operation, error);
                    let _ = inner.failure_tx.send(JobFailure {
                        job_id: id,
                        operation,
                        error,
                    });
                }
            }

            if let Some(key) = dedupe_key {
                inner.in_flight.lock().unwrap().remove(&key);
            }
            inner.outstanding.send_modify(|n| *n -= 1);
        });
    }

    /// Number of jobs admitted but not yet finished.
    pub fn pending_jobs(&self) -> usize {
        *self.inner.outstanding.borrow()
    }

    /// Wait until every admitted job has finished.
    pub async fn wait_idle(&self) {
        let mut outstanding = self.inner.outstanding.subscribe();
        while *outstanding.borrow_and_update() != 0 {
            if outstanding.changed().await.is_err() {
                return;
            }
        }
    }
}

impl QueueInner {
    /// Replay one job against the remote adapter.
    ///
    /// Every remote call carries `from_job = true`, so replay can never
    /// generate further jobs. Successful reads are written back into the
    /// local adapter and recorded in the fetch bookkeeping; successful
    /// mutations clear the dirty marker.
    async fn execute(&self, kind: JobKind) -> Result<()> {
        match kind {
            JobKind::Find { type_name, key } => {
                let record = self.remote.find(&type_name, &key, true).await?;
                if let Some(record) = &record {
                    self.local.update(&type_name, &key, record, true).await?;
                }
                self.metadata
                    .write()
                    .await
                    .record_fetch(FetchScope::One, &type_name, Some(&key));
                Ok(())
            }
            JobKind::FindAll { type_name } => {
                let records = self.remote.find_all(&type_name, true).await?;
                let fetched = self.write_back(&type_name, &records).await?;
                let mut metadata = self.metadata.write().await;
                for key in &fetched {
                    metadata.record_fetch(FetchScope::One, &type_name, Some(key));
                }
                metadata.record_fetch(FetchScope::All, &type_name, None);
                Ok(())
            }
            JobKind::FindMany { type_name, keys } => {
                let results = self.remote.find_many(&type_name, &keys, true).await?;
                let mut fetched = Vec::new();
                for (key, record) in keys.iter().zip(results.iter()) {
                    if let Some(record) = record {
                        self.local.update(&type_name, key, record, true).await?;
                        fetched.push(key.clone());
                    }
                }
                let mut metadata = self.metadata.write().await;
                for key in &fetched {
                    metadata.record_fetch(FetchScope::One, &type_name, Some(key));
                }
                metadata.record_fetch(FetchScope::Many, &type_name, None);
                Ok(())
            }
            JobKind::Query { type_name, params } => {
                let records = self.remote.query(&type_name, &params, true).await?;
                let fetched = self.write_back(&type_name, &records).await?;
                let mut metadata = self.metadata.write().await;
                for key in &fetched {
                    metadata.record_fetch(FetchScope::One, &type_name, Some(key));
                }
                Ok(())
            }
            JobKind::Create {
                type_name,
                key,
                record,
            } => {
                self.remote.create(&type_name, &key, &record, true).await?;
                self.metadata.write().await.clear_dirty(&type_name, &key);
                Ok(())
            }
            JobKind::Update {
                type_name,
                key,
                record,
            } => {
                self.remote.update(&type_name, &key, &record, true).await?;
                self.metadata.write().await.clear_dirty(&type_name, &key);
                Ok(())
            }
            JobKind::Delete { type_name, key } => self.remote.delete(&type_name, &key, true).await,
        }
    }

    /// Upsert fetched records into the local adapter, returning the keys
    /// that were written.
    async fn write_back(&self, type_name: &TypeName, records: &[Record]) -> Result<Vec<String>> {
        let field = self.local.primary_key_field(type_name)?;
        let mut written = Vec::with_capacity(records.len());
        for record in records {
            let Some(key) = record_key(record, &field) else {
                warn!("skipping {} record without usable primary key", type_name);
                continue;
            };
            self.local.update(type_name, &key, record, true).await?;
            written.push(key);
        }
        Ok(written)
    }
}
