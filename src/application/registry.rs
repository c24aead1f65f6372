//! In-memory index of every job, backed by the job repository.
//!
//! Each record sits behind its own lock, so a slow transition of one job
//! never blocks readers or writers of another. Every mutation is persisted
//! and published on the event hub before the record's lock is released.

use crate::adapters::local::events::{hub::EventHub, JobEvent};
use crate::adapters::local::fs::ArtifactStore;
use crate::domain::jobs::{JobKind, JobRecord, JobSnapshot, JobStatus, NewJob};
use crate::error::PersistenceError;
use crate::ports::repository::JobRepository;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Message stored on jobs found mid-flight at startup.
pub const INTERRUPTED_BY_RESTART: &str = "Interrupted by restart";

#[derive(Debug)]
struct JobEntry {
    record: Mutex<JobRecord>,
    /// Set while a pipeline task owns the job.
    active: AtomicBool,
    /// Bumped on every in-process mutation; reloads never overwrite newer state.
    generation: AtomicU64,
    /// The last write to the repository failed, so memory is ahead of it.
    unsaved: AtomicBool,
}

impl JobEntry {
    fn new(record: JobRecord) -> Self {
        Self {
            record: Mutex::new(record),
            active: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            unsaved: AtomicBool::new(false),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("job '{0}' already exists")]
pub struct DuplicateJob(pub String);

pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Arc<JobEntry>>>,
    repo: Arc<dyn JobRepository>,
    events: Arc<EventHub>,
    store: ArtifactStore,
}

impl JobRegistry {
    pub fn new(repo: Arc<dyn JobRepository>, events: Arc<EventHub>, store: ArtifactStore) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            repo,
            events,
            store,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Merge persisted records into memory.
    ///
    /// Records owned by a running pipeline, or changed in this process since
    /// the scan started, keep their in-memory state. Records whose last write
    /// failed are written again instead of being overwritten.
    pub async fn load(&self) -> Result<usize, PersistenceError> {
        let generations: HashMap<String, u64> = self
            .jobs
            .read()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), entry.generation.load(Ordering::Acquire)))
            .collect();

        let records = self.repo.load_all().await?;
        let count = records.len();

        let mut jobs = self.jobs.write().await;
        for record in records {
            match jobs.get(&record.id).cloned() {
                None => {
                    jobs.insert(record.id.clone(), Arc::new(JobEntry::new(record)));
                }
                Some(entry) => {
                    if entry.active.load(Ordering::Acquire) {
                        continue;
                    }
                    let mut current = entry.record.lock().await;
                    if entry.unsaved.load(Ordering::Acquire) {
                        match self.repo.upsert(&current).await {
                            Ok(()) => {
                                entry.unsaved.store(false, Ordering::Release);
                                tracing::info!(job = %current.id, "persisted job after earlier failure");
                            }
                            Err(e) => {
                                tracing::warn!(job = %current.id, "job is still unsaved: {}", e);
                            }
                        }
                        continue;
                    }
                    let seen = generations.get(&record.id).copied();
                    if seen == Some(entry.generation.load(Ordering::Acquire)) {
                        *current = record;
                    }
                }
            }
        }
        Ok(count)
    }

    /// Fail every loaded job left in a non-terminal state by a previous run.
    pub async fn recover_interrupted(&self) -> usize {
        let entries: Vec<(String, Arc<JobEntry>)> = self
            .jobs
            .read()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();

        let mut recovered = 0;
        for (id, entry) in entries {
            if entry.active.load(Ordering::Acquire) {
                continue;
            }
            let handle = JobHandle {
                id,
                entry,
                repo: self.repo.clone(),
                events: self.events.clone(),
            };
            let changed = handle
                .try_update(|job| {
                    if job.status.is_terminal() {
                        return Err(());
                    }
                    job.fail(INTERRUPTED_BY_RESTART, Utc::now());
                    Ok(())
                })
                .await;
            if changed.is_ok() {
                recovered += 1;
            }
        }
        if recovered > 0 {
            tracing::warn!(recovered, "marked interrupted jobs as failed");
        }

        for entry in self.jobs.read().await.values() {
            let record = entry.record.lock().await;
            if record.can_retry() {
                tracing::info!(job = %record.id, kind = record.kind.as_str(), "job can be retried");
            }
        }
        recovered
    }

    /// Insert and persist a brand-new record.
    ///
    /// A persistence failure is logged; the job still runs from memory.
    pub async fn create(&self, job: NewJob) -> Result<JobHandle, DuplicateJob> {
        let record = JobRecord::new(job, Utc::now());
        let id = record.id.clone();

        let entry = {
            let mut jobs = self.jobs.write().await;
            if jobs.contains_key(&id) {
                return Err(DuplicateJob(id));
            }
            let entry = Arc::new(JobEntry::new(record.clone()));
            jobs.insert(id.clone(), entry.clone());
            entry
        };

        if let Err(e) = self.repo.upsert(&record).await {
            entry.unsaved.store(true, Ordering::Release);
            tracing::error!(job = %id, "failed to persist new job: {}", e);
        }
        self.events.publish(JobEvent::from(&record));

        Ok(JobHandle {
            id,
            entry,
            repo: self.repo.clone(),
            events: self.events.clone(),
        })
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.jobs.read().await.contains_key(id)
    }

    pub async fn handle(&self, id: &str) -> Option<JobHandle> {
        let entry = self.jobs.read().await.get(id)?.clone();
        Some(JobHandle {
            id: id.to_string(),
            entry,
            repo: self.repo.clone(),
            events: self.events.clone(),
        })
    }

    /// Copy of one record.
    pub async fn get(&self, id: &str) -> Option<JobRecord> {
        let handle = self.handle(id).await?;
        Some(handle.record().await)
    }

    pub async fn snapshot(&self, id: &str) -> Option<JobSnapshot> {
        let record = self.get(id).await?;
        Some(self.snapshot_of(&record).await)
    }

    /// Every job, newest first, after merging in the persisted view.
    pub async fn list_all(&self) -> Vec<JobSnapshot> {
        if let Err(e) = self.load().await {
            tracing::warn!("failed to reload jobs, serving in-memory view: {}", e);
        }

        let entries: Vec<Arc<JobEntry>> = self.jobs.read().await.values().cloned().collect();
        let mut snapshots = Vec::with_capacity(entries.len());
        for entry in entries {
            let record = entry.record.lock().await.clone();
            snapshots.push(self.snapshot_of(&record).await);
        }
        snapshots.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        snapshots
    }

    async fn snapshot_of(&self, record: &JobRecord) -> JobSnapshot {
        let size = match (&record.status, record.filename.as_deref()) {
            (JobStatus::Completed, Some(name)) => self.store.size_of(name).await,
            _ => 0,
        };
        JobSnapshot::new(record, size)
    }
}

/// Shared access to a single job record.
#[derive(Clone)]
pub struct JobHandle {
    id: String,
    entry: Arc<JobEntry>,
    repo: Arc<dyn JobRepository>,
    events: Arc<EventHub>,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn kind(&self) -> JobKind {
        self.entry.record.lock().await.kind
    }

    pub async fn record(&self) -> JobRecord {
        self.entry.record.lock().await.clone()
    }

    /// Apply `change` atomically, then persist and publish the result.
    ///
    /// When `change` returns an error the record is left as it was and
    /// nothing is written.
    pub async fn try_update<E>(
        &self,
        change: impl FnOnce(&mut JobRecord) -> Result<(), E>,
    ) -> Result<JobRecord, E> {
        let mut record = self.entry.record.lock().await;
        let mut next = record.clone();
        change(&mut next)?;
        *record = next;
        self.commit(&record).await;
        Ok(record.clone())
    }

    pub async fn update(&self, change: impl FnOnce(&mut JobRecord)) -> JobRecord {
        let result: Result<JobRecord, std::convert::Infallible> = self
            .try_update(|job| {
                change(job);
                Ok(())
            })
            .await;
        match result {
            Ok(record) => record,
            Err(never) => match never {},
        }
    }

    /// Apply the terminal transition and give up ownership of the job.
    ///
    /// The claim is released before the record lock, so anyone who observes
    /// the terminal state can claim the job again.
    pub async fn finish(&self, guard: ActiveGuard, change: impl FnOnce(&mut JobRecord)) -> JobRecord {
        let mut record = self.entry.record.lock().await;
        change(&mut record);
        self.commit(&record).await;
        drop(guard);
        record.clone()
    }

    async fn commit(&self, record: &JobRecord) {
        self.entry.generation.fetch_add(1, Ordering::AcqRel);
        match self.repo.upsert(record).await {
            Ok(()) => self.entry.unsaved.store(false, Ordering::Release),
            Err(e) => {
                self.entry.unsaved.store(true, Ordering::Release);
                tracing::error!(job = %self.id, "failed to persist job update: {}", e);
            }
        }
        self.events.publish(JobEvent::from(record));
    }

    /// Mark the job as owned by a pipeline task. Returns `None` when a task
    /// already owns it.
    pub fn claim(&self) -> Option<ActiveGuard> {
        self.entry
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(ActiveGuard {
            entry: self.entry.clone(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.entry.active.load(Ordering::Acquire)
    }
}

/// Ownership of a running job; released on drop.
#[derive(Debug)]
pub struct ActiveGuard {
    entry: Arc<JobEntry>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.entry.active.store(false, Ordering::Release);
    }
}
