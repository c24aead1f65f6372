use crate::domain::jobs::JobRecord;
use crate::error::PersistenceError;
use async_trait::async_trait;

/// Durable store of job records, keyed by job id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert or replace a single record. Concurrent upserts of different
    /// ids never touch each other's rows.
    async fn upsert(&self, job: &JobRecord) -> Result<(), PersistenceError>;

    /// Full scan of every stored record.
    async fn load_all(&self) -> Result<Vec<JobRecord>, PersistenceError>;
}
