//! Direct-Download Pipeline: download, then relocate into the completed
//! directory. No transcode step.

use super::registry::{ActiveGuard, JobHandle};
use super::transfer::TransferEngine;
use crate::adapters::local::fs::ArtifactStore;
use crate::domain::filename::safe_name;
use crate::domain::jobs::JobRecord;
use chrono::Utc;

#[derive(Clone)]
pub struct DirectDownloadPipeline {
    transfer: TransferEngine,
    store: ArtifactStore,
}

impl DirectDownloadPipeline {
    pub fn new(transfer: TransferEngine, store: ArtifactStore) -> Self {
        Self { transfer, store }
    }

    pub async fn run(&self, job: &JobHandle, guard: ActiveGuard) -> JobRecord {
        let record = job.update(|r| r.begin_processing()).await;
        let filename = format!("{}.mp4", safe_name(record.title_or_id(), &record.id));
        let temp_name = format!("{}.mp4", record.id);
        let temp_path = self.store.ongoing_path(&temp_name);
        tracing::info!(job = job.id(), file = %filename, "direct download started");

        if let Err(e) = self
            .transfer
            .fetch(job.id(), &record.download_url, &temp_path)
            .await
        {
            self.store.discard(&temp_path).await;
            tracing::error!(job = job.id(), "download failed: {}", e);
            return job
                .finish(guard, |r| r.fail(format!("Failed to download video: {}", e), Utc::now()))
                .await;
        }

        if let Err(e) = self.store.relocate(&temp_name, &filename).await {
            tracing::error!(job = job.id(), "relocation failed: {}", e);
            self.store.discard(&temp_path).await;
            return job
                .finish(guard, |r| r.fail(format!("Failed to move file: {}", e), Utc::now()))
                .await;
        }

        job.finish(guard, |r| r.complete(filename, Utc::now())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::events::hub::EventHub;
    use crate::adapters::local::memory::MemoryRepository;
    use crate::application::registry::JobRegistry;
    use crate::application::transfer::RetryPolicy;
    use crate::domain::jobs::{JobKind, JobStatus, NewJob};
    use crate::error::TransferError;
    use crate::ports::fetch::MockFetcher;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    fn new_job(title: Option<&str>) -> NewJob {
        NewJob {
            id: "abc123_1700000000".to_string(),
            kind: JobKind::Direct,
            url: "https://youtu.be/abc123".to_string(),
            format: String::new(),
            download_url: "https://cdn.example/abc123.mp4".to_string(),
            video_title: title.map(str::to_string),
        }
    }

    fn engine(fetcher: MockFetcher) -> TransferEngine {
        TransferEngine::new(
            Arc::new(fetcher),
            RetryPolicy {
                max_attempts: 3,
                backoff_step: Duration::ZERO,
            },
        )
    }

    async fn registry(root: &std::path::Path, create_dirs: bool) -> JobRegistry {
        let store = ArtifactStore::new(root.join("ongoing"), root.join("completed"));
        if create_dirs {
            store.ensure_dirs().await.unwrap();
        }
        JobRegistry::new(Arc::new(MemoryRepository::new()), Arc::new(EventHub::new()), store)
    }

    #[tokio::test]
    async fn relocates_finished_download() {
        let dir = tempdir().unwrap();
        let registry = registry(dir.path(), true).await;
        let store = registry.store().clone();
        let handle = registry.create(new_job(Some("Holiday"))).await.unwrap();
        assert_eq!(handle.record().await.status, JobStatus::Processing);

        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(1).returning(|_, dest| {
            std::fs::write(dest, b"video")?;
            Ok(5)
        });

        let done = DirectDownloadPipeline::new(engine(fetcher), store.clone())
            .run(&handle, handle.claim().unwrap())
            .await;

        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress, 1.0);
        assert_eq!(done.filename.as_deref(), Some("Holiday.mp4"));
        assert!(store.completed_path("Holiday.mp4").exists());
        assert!(store.list_ongoing().await.unwrap().is_empty());
        assert!(!handle.is_active());
    }

    #[tokio::test]
    async fn untitled_jobs_are_named_after_their_id() {
        let dir = tempdir().unwrap();
        let registry = registry(dir.path(), true).await;
        let handle = registry.create(new_job(None)).await.unwrap();

        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().returning(|_, dest| {
            std::fs::write(dest, b"video")?;
            Ok(5)
        });

        let done = DirectDownloadPipeline::new(engine(fetcher), registry.store().clone())
            .run(&handle, handle.claim().unwrap())
            .await;
        assert_eq!(done.filename.as_deref(), Some("abc123_1700000000.mp4"));
    }

    #[tokio::test]
    async fn transfer_failure_removes_partial_file() {
        let dir = tempdir().unwrap();
        let registry = registry(dir.path(), true).await;
        let store = registry.store().clone();
        let handle = registry.create(new_job(Some("Holiday"))).await.unwrap();

        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(3).returning(|_, dest| {
            std::fs::write(dest, b"vid")?;
            Err(TransferError::Status(500))
        });

        let done = DirectDownloadPipeline::new(engine(fetcher), store.clone())
            .run(&handle, handle.claim().unwrap())
            .await;

        assert_eq!(done.status, JobStatus::Failed);
        assert!(done.error.unwrap().starts_with("Failed to download video: "));
        assert!(store.list_ongoing().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn relocation_failure_is_its_own_error() {
        let dir = tempdir().unwrap();
        let registry = registry(dir.path(), false).await;
        let store = registry.store().clone();
        // Only the ongoing directory exists, so the rename has nowhere to go.
        tokio::fs::create_dir_all(store.ongoing_dir()).await.unwrap();
        let handle = registry.create(new_job(Some("Holiday"))).await.unwrap();

        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().returning(|_, dest| {
            std::fs::write(dest, b"video")?;
            Ok(5)
        });

        let done = DirectDownloadPipeline::new(engine(fetcher), store.clone())
            .run(&handle, handle.claim().unwrap())
            .await;

        assert_eq!(done.status, JobStatus::Failed);
        assert!(done.error.unwrap().starts_with("Failed to move file: "));
        assert!(store.list_ongoing().await.unwrap().is_empty());
    }
}
