//! Bounded execution of job pipelines.

use super::conversion::ConversionPipeline;
use super::direct::DirectDownloadPipeline;
use super::registry::{ActiveGuard, JobHandle};
use crate::domain::jobs::JobKind;
use crate::error::TransferError;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Launches one task per job; at most `max_concurrent` pipelines run at once,
/// the rest wait for a permit with their progress still at zero.
#[derive(Clone)]
pub struct JobRunner {
    permits: Arc<Semaphore>,
    conversion: ConversionPipeline,
    direct: DirectDownloadPipeline,
    shutdown: CancellationToken,
}

impl JobRunner {
    pub fn new(
        max_concurrent: usize,
        conversion: ConversionPipeline,
        direct: DirectDownloadPipeline,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            conversion,
            direct,
            shutdown,
        }
    }

    /// Fire-and-forget. The transfer never starts before `settle_until`.
    pub fn launch(
        &self,
        job: JobHandle,
        guard: ActiveGuard,
        settle_until: Option<Instant>,
    ) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move {
            if let Some(deadline) = settle_until {
                tracing::debug!(job = job.id(), "waiting for source link to settle");
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {}
                    _ = runner.shutdown.cancelled() => {
                        let message = capitalize(&TransferError::Interrupted.to_string());
                        job.finish(guard, |r| r.fail(message, Utc::now())).await;
                        return;
                    }
                }
            }

            let _permit = match runner.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!(job = job.id(), "runner closed before job could start");
                    return;
                }
            };

            match job.kind().await {
                JobKind::Conversion => {
                    runner.conversion.run(&job, guard).await;
                }
                JobKind::Direct => {
                    runner.direct.run(&job, guard).await;
                }
            }
        })
    }

    pub fn conversion(&self) -> &ConversionPipeline {
        &self.conversion
    }

    #[cfg(test)]
    fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::events::hub::EventHub;
    use crate::adapters::local::fs::ArtifactStore;
    use crate::adapters::local::memory::MemoryRepository;
    use crate::application::registry::JobRegistry;
    use crate::application::transfer::{RetryPolicy, TransferEngine};
    use crate::domain::jobs::{JobStatus, NewJob};
    use crate::ports::fetch::MockFetcher;
    use crate::ports::transcoder::MockTranscoder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::tempdir;

    fn new_job(id: &str, kind: JobKind) -> NewJob {
        NewJob {
            id: id.to_string(),
            kind,
            url: "https://youtu.be/abc123".to_string(),
            format: "avi".to_string(),
            download_url: "https://cdn.example/abc123.mp4".to_string(),
            video_title: Some(id.to_string()),
        }
    }

    fn runner(
        store: &ArtifactStore,
        fetcher: MockFetcher,
        max_concurrent: usize,
        shutdown: CancellationToken,
    ) -> JobRunner {
        let transfer = TransferEngine::new(
            Arc::new(fetcher),
            RetryPolicy {
                max_attempts: 3,
                backoff_step: Duration::ZERO,
            },
        );
        let mut transcoder = MockTranscoder::new();
        transcoder.expect_transcode().returning(|_, output, _| {
            std::fs::write(output, b"converted")?;
            Ok(())
        });
        JobRunner::new(
            max_concurrent,
            ConversionPipeline::new(transfer.clone(), Arc::new(transcoder), store.clone()),
            DirectDownloadPipeline::new(transfer, store.clone()),
            shutdown,
        )
    }

    #[tokio::test]
    async fn dispatches_on_job_kind() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("ongoing"), dir.path().join("completed"));
        store.ensure_dirs().await.unwrap();
        let registry =
            JobRegistry::new(Arc::new(MemoryRepository::new()), Arc::new(EventHub::new()), store.clone());

        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().returning(|_, dest| {
            std::fs::write(dest, b"video")?;
            Ok(5)
        });
        let runner = runner(&store, fetcher, 2, CancellationToken::new());

        let conversion = registry.create(new_job("conv_1", JobKind::Conversion)).await.unwrap();
        let direct = registry.create(new_job("direct_1", JobKind::Direct)).await.unwrap();
        let a = runner.launch(conversion.clone(), conversion.claim().unwrap(), None);
        let b = runner.launch(direct.clone(), direct.claim().unwrap(), None);
        a.await.unwrap();
        b.await.unwrap();

        assert_eq!(conversion.record().await.filename.as_deref(), Some("conv_1.avi"));
        assert_eq!(direct.record().await.filename.as_deref(), Some("direct_1.mp4"));
        assert!(!conversion.is_active());
        assert!(!direct.is_active());
    }

    #[tokio::test]
    async fn never_runs_more_pipelines_than_permits() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("ongoing"), dir.path().join("completed"));
        store.ensure_dirs().await.unwrap();
        let registry =
            JobRegistry::new(Arc::new(MemoryRepository::new()), Arc::new(EventHub::new()), store.clone());

        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut fetcher = MockFetcher::new();
        {
            let running = running.clone();
            let peak = peak.clone();
            fetcher.expect_fetch().returning(move |_, dest| {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                running.fetch_sub(1, Ordering::SeqCst);
                std::fs::write(dest, b"video")?;
                Ok(5)
            });
        }
        let runner = runner(&store, fetcher, 1, CancellationToken::new());

        let mut tasks = Vec::new();
        for i in 0..3 {
            let job = registry
                .create(new_job(&format!("job_{}", i), JobKind::Direct))
                .await
                .unwrap();
            tasks.push(runner.launch(job.clone(), job.claim().unwrap(), None));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(runner.available_permits(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_settle_fails_the_job_without_transfer() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("ongoing"), dir.path().join("completed"));
        store.ensure_dirs().await.unwrap();
        let registry =
            JobRegistry::new(Arc::new(MemoryRepository::new()), Arc::new(EventHub::new()), store.clone());

        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().never();
        let shutdown = CancellationToken::new();
        let runner = runner(&store, fetcher, 1, shutdown.clone());

        let job = registry.create(new_job("settle_1", JobKind::Conversion)).await.unwrap();
        let task = runner.launch(
            job.clone(),
            job.claim().unwrap(),
            Some(Instant::now() + Duration::from_secs(20)),
        );
        shutdown.cancel();
        task.await.unwrap();

        let record = job.record().await;
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("Interrupted before transfer"));
        assert!(record.can_retry());
    }
}
