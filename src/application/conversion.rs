//! Conversion Pipeline: download, transcode, finalize.
//!
//! Scratch files in the ongoing directory are named after the job id, and the
//! transcoder writes to scratch too. Only a successful transcode is moved into
//! the completed directory, so a failing job never touches another job's
//! artifact.

use super::registry::{ActiveGuard, JobHandle};
use super::transfer::TransferEngine;
use crate::adapters::local::fs::ArtifactStore;
use crate::domain::filename::safe_name;
use crate::domain::jobs::JobRecord;
use crate::domain::profile::TranscodeProfile;
use crate::error::TranscodeError;
use crate::ports::transcoder::Transcoder;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct ConversionPipeline {
    transfer: TransferEngine,
    transcoder: Arc<dyn Transcoder>,
    store: ArtifactStore,
}

impl ConversionPipeline {
    pub fn new(transfer: TransferEngine, transcoder: Arc<dyn Transcoder>, store: ArtifactStore) -> Self {
        Self {
            transfer,
            transcoder,
            store,
        }
    }

    /// Runs one job to a terminal state. Failures are recorded on the job,
    /// never returned.
    pub async fn run(&self, job: &JobHandle, guard: ActiveGuard) -> JobRecord {
        // 1. Downloading
        let record = job.update(|r| r.begin_download()).await;
        let temp_path = self.store.ongoing_path(&format!("{}.mp4", record.id));
        tracing::info!(job = job.id(), file = %temp_path.display(), "downloading source");

        // 2. Transfer into the ongoing directory
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

        // 3. Converting
        job.update(|r| r.begin_converting()).await;
        let profile = TranscodeProfile::for_format(&record.format);
        let name = safe_name(record.title_or_id(), &record.id);
        let output_name = format!("{}.{}", name, profile.extension);
        let result = self
            .transcode_to_completed(job.id(), &temp_path, &output_name, &profile)
            .await;
        self.store.discard(&temp_path).await;

        // 4. Finalize
        match result {
            Ok(()) => job.finish(guard, |r| r.complete(output_name, Utc::now())).await,
            Err(e) => {
                job.finish(guard, |r| r.fail(format!("FFmpeg conversion failed: {}", e), Utc::now()))
                    .await
            }
        }
    }

    /// Transcodes a file already sitting in the ongoing directory.
    ///
    /// The source is removed only after a successful conversion, and only
    /// when `delete_source` is set.
    pub async fn convert_file(
        &self,
        job: &JobHandle,
        guard: ActiveGuard,
        source_name: &str,
        delete_source: bool,
    ) -> JobRecord {
        let record = job.update(|r| r.begin_converting()).await;
        let profile = TranscodeProfile::for_format(&record.format);
        let stem = source_name.strip_suffix(".mp4").unwrap_or(source_name);
        let output_name = format!("{}.{}", stem, profile.extension);
        let source = self.store.ongoing_path(source_name);

        match self
            .transcode_to_completed(job.id(), &source, &output_name, &profile)
            .await
        {
            Ok(()) => {
                if delete_source {
                    self.store.discard(&source).await;
                }
                job.finish(guard, |r| r.complete(output_name, Utc::now())).await
            }
            Err(e) => {
                job.finish(guard, |r| r.fail(format!("FFmpeg conversion failed: {}", e), Utc::now()))
                    .await
            }
        }
    }

    async fn transcode_to_completed(
        &self,
        job_id: &str,
        input: &Path,
        output_name: &str,
        profile: &TranscodeProfile,
    ) -> Result<(), TranscodeError> {
        let scratch_name = format!("{}.partial.{}", job_id, profile.extension);
        let scratch = self.store.ongoing_path(&scratch_name);
        tracing::info!(
            job = job_id,
            codec = profile.video_codec,
            output = output_name,
            "transcoding"
        );

        if let Err(e) = self.transcoder.transcode(input, &scratch, profile).await {
            tracing::error!(job = job_id, "transcode failed: {}", e);
            self.store.discard(&scratch).await;
            return Err(e);
        }
        if let Err(e) = self.store.relocate(&scratch_name, output_name).await {
            tracing::error!(job = job_id, "could not store converted file: {}", e);
            self.store.discard(&scratch).await;
            return Err(TranscodeError::Finalize(e));
        }
        Ok(())
    }
}
