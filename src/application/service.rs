//! Request orchestration: validate, resolve once, register, launch.

use super::registry::{JobRegistry, JobHandle};
use super::runner::JobRunner;
use crate::domain::jobs::{JobKind, JobRecord, JobSnapshot, JobStatus, NewJob};
use crate::domain::profile::normalize_format;
use crate::domain::video_id::extract_video_id;
use crate::error::{Error, ResolutionError, Result};
use crate::ports::resolver::VideoResolver;
use chrono::Utc;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Body of a download submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DownloadRequest {
    pub url: String,
    pub format: String,
    pub convert: bool,
    /// Skip job tracking and hand the resolved link straight back.
    pub passthrough: bool,
}

/// What the caller gets back once a request is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Converting { job_id: String },
    Processing { job_id: String },
    Ready { download_url: String },
}

/// State of a direct-download artifact, as seen by a polling client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectArtifact {
    Pending,
    Ready { filename: String, path: PathBuf },
}

pub struct DownloadService {
    registry: Arc<JobRegistry>,
    resolver: Arc<dyn VideoResolver>,
    runner: JobRunner,
    settle_delay: Duration,
}

impl DownloadService {
    pub fn new(
        registry: Arc<JobRegistry>,
        resolver: Arc<dyn VideoResolver>,
        runner: JobRunner,
        settle_delay: Duration,
    ) -> Self {
        Self {
            registry,
            resolver,
            runner,
            settle_delay,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub async fn submit(&self, request: DownloadRequest) -> Result<Submission> {
        // 1. Validate input
        let url = request.url.trim();
        if url.is_empty() {
            return Err(Error::validation("URL is required"));
        }
        let format = normalize_format(&request.format)
            .ok_or_else(|| Error::validation(format!("unsupported format '{}'", request.format)))?;
        let video_id = extract_video_id(url).ok_or(ResolutionError::InvalidUrl)?;

        // 2. Resolve the transient link, exactly once
        let resolved = self.resolver.resolve(&video_id).await?;
        let settle_until = Instant::now() + self.settle_delay;
        tracing::info!(video = %video_id, convert = request.convert, "resolved download link");

        if request.passthrough {
            tokio::time::sleep_until(settle_until).await;
            return Ok(Submission::Ready {
                download_url: resolved.file_url,
            });
        }

        // 3. Register the job
        let kind = if request.convert {
            JobKind::Conversion
        } else {
            JobKind::Direct
        };
        let title = resolved
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| video_id.clone());
        let handle = self
            .create_unique(NewJob {
                id: format!("{}_{}", video_id, Utc::now().timestamp()),
                kind,
                url: url.to_string(),
                format,
                download_url: resolved.file_url,
                video_title: Some(title),
            })
            .await;

        // 4. Launch; the settle delay runs on the job's own task
        let job_id = handle.id().to_string();
        match handle.claim() {
            Some(guard) => {
                self.runner.launch(handle, guard, Some(settle_until));
            }
            None => tracing::warn!(job = %job_id, "new job already claimed"),
        }

        Ok(match kind {
            JobKind::Conversion => Submission::Converting { job_id },
            JobKind::Direct => Submission::Processing { job_id },
        })
    }

    async fn create_unique(&self, mut job: NewJob) -> JobHandle {
        let base = job.id.clone();
        let mut suffix = 1;
        loop {
            match self.registry.create(job.clone()).await {
                Ok(handle) => return handle,
                Err(duplicate) => {
                    tracing::debug!("{}, adding suffix", duplicate);
                    suffix += 1;
                    job.id = format!("{}_{}", base, suffix);
                }
            }
        }
    }

    /// Re-run a failed job from its download step, reusing the stored link.
    pub async fn retry(&self, id: &str) -> Result<JobRecord> {
        if id.is_empty() {
            return Err(Error::validation("Job ID required"));
        }
        let handle = self
            .registry
            .handle(id)
            .await
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let guard = handle.claim().ok_or_else(|| Error::NotRetryable {
            id: id.to_string(),
            reason: "job is still running".to_string(),
        })?;

        let record = handle
            .try_update(|job| match job.retry_blocker() {
                Some(reason) => Err(reason),
                None => {
                    job.reset_for_retry(Utc::now());
                    Ok(())
                }
            })
            .await
            .map_err(|reason| Error::NotRetryable {
                id: id.to_string(),
                reason: reason.to_string(),
            })?;

        tracing::info!(job = %id, kind = record.kind.as_str(), "retrying job");
        self.runner.launch(handle, guard, None);
        Ok(record)
    }

    /// Convert a file already in the ongoing directory, waiting for the
    /// result. The job is recorded like any other but has no download link,
    /// so it cannot be retried.
    pub async fn convert_local(
        &self,
        filename: &str,
        format: &str,
        delete_source: bool,
    ) -> Result<JobRecord> {
        let format = normalize_format(format)
            .filter(|f| f == "mpg" || f == "avi")
            .ok_or_else(|| Error::validation(format!("unsupported format '{}'", format)))?;
        if !filename.ends_with(".mp4") {
            return Err(Error::validation("only .mp4 files can be converted"));
        }
        let source = self.registry.store().resolve_ongoing(filename)?;
        if !tokio::fs::try_exists(&source).await? {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found in the ongoing directory", filename),
            )));
        }

        let handle = self
            .create_unique(NewJob {
                id: format!("cli_{}", Utc::now().timestamp()),
                kind: JobKind::Conversion,
                url: "cli-conversion".to_string(),
                format,
                download_url: String::new(),
                video_title: None,
            })
            .await;
        let guard = handle.claim().ok_or_else(|| Error::NotRetryable {
            id: handle.id().to_string(),
            reason: "job is still running".to_string(),
        })?;

        tracing::info!(job = handle.id(), file = filename, "converting local file");
        Ok(self
            .runner
            .conversion()
            .convert_file(&handle, guard, filename, delete_source)
            .await)
    }

    pub async fn list(&self) -> Vec<JobSnapshot> {
        self.registry.list_all().await
    }

    pub async fn get(&self, id: &str) -> Result<JobSnapshot> {
        self.registry
            .snapshot(id)
            .await
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub async fn direct_artifact(&self, id: &str) -> Result<DirectArtifact> {
        let record = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        match (record.status, record.filename) {
            (JobStatus::Completed, Some(filename)) => {
                let path = self.registry.store().resolve_completed(&filename)?;
                Ok(DirectArtifact::Ready { filename, path })
            }
            _ => Ok(DirectArtifact::Pending),
        }
    }
}
