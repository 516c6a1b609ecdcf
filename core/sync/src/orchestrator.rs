//! Offline-first facade over the local and remote adapters.

use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::warn;

use crate::config::{OnlineFlag, SyncConfig};
use crate::freshness::FreshnessPolicy;
use crate::metadata::{FetchScope, MetadataStore};
use crate::queue::{Job, JobFailure, JobKind, JobQueue};
use crate::stub::StubFactory;
use offsync_common::{record_key, QueryParams, Record, Result, TypeName};
use offsync_storage::{LocalAdapter, RemoteAdapter};

/// Entry point for every read and write while disconnected from the
/// source of truth.
///
/// Each operation is served from the local adapter and returns without
/// awaiting the network; remote reconciliation happens through the job
/// queue afterward. Local and remote failures never propagate to
/// callers — reads degrade to empty results or identifier-only stubs.
/// The one exception is `Error::Config`, which indicates programmer
/// error and always surfaces.
pub struct SyncOrchestrator {
    local: Arc<dyn LocalAdapter>,
    remote: Arc<dyn RemoteAdapter>,
    metadata: Arc<RwLock<MetadataStore>>,
    policy: FreshnessPolicy,
    queue: JobQueue,
    stubs: StubFactory,
    config: SyncConfig,
    online: OnlineFlag,
}

impl SyncOrchestrator {
    /// Create an orchestrator and the receiving end of its job-failure
    /// channel.
    ///
    /// # Errors
    /// - `Error::Config` if the configuration is invalid; construction
    ///   fails fast rather than swallowing misconfiguration later
    pub fn new(
        local: Arc<dyn LocalAdapter>,
        remote: Arc<dyn RemoteAdapter>,
        config: SyncConfig,
        online: OnlineFlag,
    ) -> Result<(Self, mpsc::UnboundedReceiver<JobFailure>)> {
        config.validate()?;

        let metadata = Arc::new(RwLock::new(MetadataStore::new()));
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();
        let queue = JobQueue::new(
            Arc::clone(&local),
            Arc::clone(&remote),
            Arc::clone(&metadata),
            failure_tx,
        );
        let stubs = StubFactory::new(Arc::clone(&local));
        let policy = FreshnessPolicy::new(&config);

        Ok((
            Self {
                local,
                remote,
                metadata,
                policy,
                queue,
                stubs,
                config,
                online,
            },
            failure_rx,
        ))
    }

    /// The shared fetch and dirty-marker bookkeeping.
    pub fn metadata(&self) -> Arc<RwLock<MetadataStore>> {
        Arc::clone(&self.metadata)
    }

    /// The queue of deferred remote operations.
    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// The injected configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The externally-owned connectivity flag.
    pub fn online(&self) -> &OnlineFlag {
        &self.online
    }

    /// Look up one record, serving the local store first.
    ///
    /// A miss yields an identifier-only stub while the real data is
    /// still being fetched. If the cached copy is stale a refresh job is
    /// enqueued; the remote source is never awaited before returning.
    pub async fn find(&self, type_name: &TypeName, key: &str) -> Result<Record> {
        let local = match self.local.find(type_name, key, false).await {
            Ok(record) => record,
            Err(err) => {
                warn!("local find of {} {} failed: {}", type_name, key, err);
                None
            }
        };

        let stale = {
            let metadata = self.metadata.read().await;
            self.policy.is_stale_one(&metadata, type_name, key)
        };
        if self.policy.should_background_refresh() && stale {
            self.queue.enqueue(Job::new(JobKind::Find {
                type_name: type_name.clone(),
                key: key.to_string(),
            }));
        }

        match local {
            Some(record) => Ok(record),
            None => self.stubs.stub_for(type_name, key),
        }
    }

    /// Fetch every locally known record of a type.
    pub async fn find_all(&self, type_name: &TypeName) -> Result<Vec<Record>> {
        let records = match self.local.find_all(type_name, false).await {
            Ok(records) => records,
            Err(err) => {
                warn!("local find_all of {} failed: {}", type_name, err);
                Vec::new()
            }
        };

        let stale = {
            let metadata = self.metadata.read().await;
            self.policy.is_stale_all(&metadata, type_name)
        };
        if self.policy.should_background_refresh() && stale {
            self.queue.enqueue(Job::new(JobKind::FindAll {
                type_name: type_name.clone(),
            }));
        }

        Ok(records)
    }

    /// Look up a batch of records.
    ///
    /// Found records are returned even when some keys miss; only when
    /// every key misses is the result stubbed, one stub per key.
    pub async fn find_many(&self, type_name: &TypeName, keys: &[String]) -> Result<Vec<Record>> {
        let results = match self.local.find_many(type_name, keys, false).await {
            Ok(results) => results,
            Err(err) => {
                warn!("local find_many of {} failed: {}", type_name, err);
                vec![None; keys.len()]
            }
        };

        let expired = {
            let metadata = self.metadata.read().await;
            self.policy
                .is_expired_many(&metadata, type_name, keys, &results)
        };
        if self.policy.should_background_refresh() && expired {
            self.queue.enqueue(Job::new(JobKind::FindMany {
                type_name: type_name.clone(),
                keys: keys.to_vec(),
            }));
        }

        let found: Vec<Record> = results.into_iter().flatten().collect();
        if found.is_empty() && !keys.is_empty() {
            return self.stubs.stubs_for(type_name, keys);
        }
        Ok(found)
    }

    /// Query records, serving the local store when it has any.
    ///
    /// With cached records present they are returned immediately and a
    /// background refresh job is enqueued. With nothing cached,
    /// offline-first degrades to online-only: the remote source is
    /// queried synchronously, bypassing the queue, and its records are
    /// written back before returning. Remote failure degrades to empty.
    pub async fn query(&self, type_name: &TypeName, params: &QueryParams) -> Result<Vec<Record>> {
        let records = match self.local.query(type_name, params, false).await {
            Ok(records) => records,
            Err(err) => {
                warn!("local query of {} failed: {}", type_name, err);
                Vec::new()
            }
        };

        if !records.is_empty() {
            if self.policy.should_background_refresh() {
                self.queue.enqueue(Job::new(JobKind::Query {
                    type_name: type_name.clone(),
                    params: params.clone(),
                }));
            }
            return Ok(records);
        }

        match self.remote.query(type_name, params, false).await {
            Ok(fetched) => {
                let field = self.local.primary_key_field(type_name)?;
                let mut fetched_keys = Vec::with_capacity(fetched.len());
                for record in &fetched {
                    let Some(key) = record_key(record, &field) else {
                        continue;
                    };
                    if let Err(err) = self.local.update(type_name, &key, record, true).await {
                        warn!("write-back of {} {} failed: {}", type_name, key, err);
                        continue;
                    }
                    fetched_keys.push(key);
                }
                let mut metadata = self.metadata.write().await;
                for key in &fetched_keys {
                    metadata.record_fetch(FetchScope::One, type_name, Some(key));
                }
                Ok(fetched)
            }
            Err(err) => {
                warn!("remote query of {} failed: {}", type_name, err);
                Ok(Vec::new())
            }
        }
    }

    /// Create a record locally and schedule replay against the remote
    /// source.
    ///
    /// While online, rapid duplicate creates of a type collapse to one
    /// outbound call; while offline, every create is preserved so it
    /// replays exactly once when connectivity returns.
    pub async fn create(&self, type_name: &TypeName, key: &str, record: &Record) -> Result<()> {
        if let Err(err) = self.local.create(type_name, key, record, false).await {
            warn!("local create of {} {} failed: {}", type_name, key, err);
        }
        self.metadata.write().await.mark_dirty(type_name, key);

        let mut job = Job::new(JobKind::Create {
            type_name: type_name.clone(),
            key: key.to_string(),
            record: record.clone(),
        });
        if self.online.is_online() {
            job = job.with_dedupe_key(format!("create${}", type_name));
        }
        self.queue.enqueue(job);
        Ok(())
    }

    /// Update a record locally and schedule replay against the remote
    /// source. Last write wins.
    pub async fn update(&self, type_name: &TypeName, key: &str, record: &Record) -> Result<()> {
        if let Err(err) = self.local.update(type_name, key, record, false).await {
            warn!("local update of {} {} failed: {}", type_name, key, err);
        }
        self.metadata.write().await.mark_dirty(type_name, key);

        self.queue.enqueue(Job::new(JobKind::Update {
            type_name: type_name.clone(),
            key: key.to_string(),
            record: record.clone(),
        }));
        Ok(())
    }

    /// Delete a record locally and schedule replay against the remote
    /// source.
    pub async fn delete(&self, type_name: &TypeName, key: &str) -> Result<()> {
        if let Err(err) = self.local.delete(type_name, key, false).await {
            warn!("local delete of {} {} failed: {}", type_name, key, err);
        }

        self.queue.enqueue(Job::new(JobKind::Delete {
            type_name: type_name.clone(),
            key: key.to_string(),
        }));
        Ok(())
    }
}
