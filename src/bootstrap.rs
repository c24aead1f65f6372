//! Wires adapters and services together for the binaries.

use crate::adapters::local::{events, ArtifactStore, EventHub, FfmpegTranscoder, SqlitePool};
use crate::adapters::remote::{HttpFetcher, RapidApiResolver};
use crate::application::conversion::ConversionPipeline;
use crate::application::direct::DirectDownloadPipeline;
use crate::application::transfer::{RetryPolicy, TransferEngine};
use crate::application::{DownloadService, JobRegistry, JobRunner};
use crate::config::AppConfig;
use crate::error::StartupError;
use crate::ports::repository::JobRepository;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Services {
    pub service: Arc<DownloadService>,
    pub registry: Arc<JobRegistry>,
    pub events: Arc<EventHub>,
    /// Cancelled on shutdown; jobs still settling fail instead of starting.
    pub shutdown: CancellationToken,
    pub event_listener: JoinHandle<()>,
}

pub async fn connect_repository(config: &AppConfig) -> Result<Arc<dyn JobRepository>, StartupError> {
    let pool = SqlitePool::connect(&config.database_url).await?;
    let repo: Arc<dyn JobRepository> = Arc::new(pool);
    Ok(repo)
}

pub async fn build(
    config: &AppConfig,
    repo: Arc<dyn JobRepository>,
) -> Result<Services, StartupError> {
    // 1. Local adapters
    let store = ArtifactStore::new(config.ongoing_dir(), config.completed_dir());
    store.ensure_dirs().await?;

    let events = Arc::new(EventHub::new());
    let event_listener = events::listener::start(events.clone());

    // 2. Registry, seeded from the job database
    let registry = Arc::new(JobRegistry::new(repo, events.clone(), store.clone()));
    match registry.load().await {
        Ok(count) => tracing::info!(count, "loaded jobs"),
        Err(e) => tracing::warn!("failed to load jobs: {}", e),
    }

    // 3. Remote adapters and pipelines
    let resolver = RapidApiResolver::new(&config.rapidapi_key, &config.rapidapi_host)?;
    let transfer = TransferEngine::new(Arc::new(HttpFetcher::new()?), RetryPolicy::default());
    let transcoder = Arc::new(FfmpegTranscoder::new(&config.ffmpeg_path));

    let shutdown = CancellationToken::new();
    let runner = JobRunner::new(
        config.max_concurrent_jobs,
        ConversionPipeline::new(transfer.clone(), transcoder, store.clone()),
        DirectDownloadPipeline::new(transfer, store),
        shutdown.clone(),
    );

    // 4. Application service
    let service = Arc::new(DownloadService::new(
        registry.clone(),
        Arc::new(resolver),
        runner,
        config.settle_delay,
    ));

    Ok(Services {
        service,
        registry,
        events,
        shutdown,
        event_listener,
    })
}
