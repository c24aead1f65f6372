//! In-process JobRepository, used by tests and by `--memory` CLI runs.

use crate::domain::jobs::JobRecord;
use crate::error::PersistenceError;
use crate::ports::repository::JobRepository;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryRepository {
    rows: Mutex<HashMap<String, JobRecord>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored copy of a single record.
    pub async fn stored(&self, id: &str) -> Option<JobRecord> {
        self.rows.lock().await.get(id).cloned()
    }
}

#[async_trait]
impl JobRepository for MemoryRepository {
    async fn upsert(&self, job: &JobRecord) -> Result<(), PersistenceError> {
        self.rows.lock().await.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<JobRecord>, PersistenceError> {
        Ok(self.rows.lock().await.values().cloned().collect())
    }
}
