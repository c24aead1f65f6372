use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which pipeline owns a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Download, then transcode into the requested format.
    Conversion,
    /// Download only, then relocate into the completed directory.
    Direct,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversion => "conversion",
            Self::Direct => "direct",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "conversion" => Some(Self::Conversion),
            "direct" => Some(Self::Direct),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Downloading,
    Converting,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Downloading => "downloading",
            Self::Converting => "converting",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "downloading" => Some(Self::Downloading),
            "converting" => Some(Self::Converting),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything known about a job at creation time.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: String,
    pub kind: JobKind,
    pub url: String,
    pub format: String,
    pub download_url: String,
    pub video_title: Option<String>,
}

/// The unit of state tracked per request.
///
/// Fields are public for the persistence adapters; state changes go through
/// the transition methods so the status/error/filename/end_time pairing holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub kind: JobKind,
    pub url: String,
    pub format: String,
    pub status: JobStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub filename: Option<String>,
    pub error: Option<String>,
    pub progress: f64,
    pub download_url: String,
    pub video_title: Option<String>,
}

impl JobRecord {
    pub fn new(job: NewJob, now: DateTime<Utc>) -> Self {
        let status = match job.kind {
            JobKind::Conversion => JobStatus::Downloading,
            JobKind::Direct => JobStatus::Processing,
        };
        Self {
            id: job.id,
            kind: job.kind,
            url: job.url,
            format: job.format,
            status,
            start_time: now,
            end_time: None,
            filename: None,
            error: None,
            progress: 0.0,
            download_url: job.download_url,
            video_title: job.video_title,
        }
    }

    pub fn begin_download(&mut self) {
        self.status = JobStatus::Downloading;
        self.advance(0.25);
    }

    pub fn begin_converting(&mut self) {
        self.status = JobStatus::Converting;
        self.advance(0.5);
    }

    pub fn begin_processing(&mut self) {
        self.status = JobStatus::Processing;
        self.advance(0.25);
    }

    pub fn complete(&mut self, filename: String, now: DateTime<Utc>) {
        self.status = JobStatus::Completed;
        self.advance(1.0);
        self.filename = Some(filename);
        self.error = None;
        self.end_time = Some(now);
    }

    pub fn fail(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.filename = None;
        self.error = Some(error.into());
        self.end_time = Some(now);
    }

    /// A failed job holding a resolved download URL can be run again.
    pub fn can_retry(&self) -> bool {
        self.status == JobStatus::Failed && !self.download_url.is_empty()
    }

    /// Reason the job cannot be retried, if any.
    pub fn retry_blocker(&self) -> Option<&'static str> {
        if self.download_url.is_empty() {
            Some("no download URL available")
        } else if self.status != JobStatus::Failed {
            Some("only failed jobs can be retried")
        } else {
            None
        }
    }

    /// Puts a failed job back at the start of its pipeline.
    ///
    /// Callers check `retry_blocker` first.
    pub fn reset_for_retry(&mut self, now: DateTime<Utc>) {
        self.status = match self.kind {
            JobKind::Conversion => JobStatus::Downloading,
            JobKind::Direct => JobStatus::Processing,
        };
        self.error = None;
        self.end_time = None;
        self.filename = None;
        self.progress = 0.25;
        self.start_time = now;
    }

    /// Title used to derive artifact names, falling back to the job id.
    pub fn title_or_id(&self) -> &str {
        match self.video_title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => &self.id,
        }
    }

    fn advance(&mut self, progress: f64) {
        self.progress = self.progress.max(progress).min(1.0);
    }
}

/// Point-in-time view of one job, as reported to polling clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: String,
    pub kind: JobKind,
    pub url: String,
    pub format: String,
    pub status: JobStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub filename: String,
    pub error: String,
    pub progress: f64,
    /// Artifact size in bytes, read from disk when the snapshot is taken.
    pub size: u64,
    pub can_retry: bool,
    pub video_title: Option<String>,
}

impl JobSnapshot {
    pub fn new(record: &JobRecord, size: u64) -> Self {
        Self {
            id: record.id.clone(),
            kind: record.kind,
            url: record.url.clone(),
            format: record.format.clone(),
            status: record.status,
            start_time: record.start_time,
            end_time: record.end_time,
            filename: record.filename.clone().unwrap_or_default(),
            error: record.error.clone().unwrap_or_default(),
            progress: record.progress,
            size,
            can_retry: record.can_retry(),
            video_title: record.video_title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: JobKind, download_url: &str) -> JobRecord {
        JobRecord::new(
            NewJob {
                id: "abc123_1700000000".to_string(),
                kind,
                url: "https://youtu.be/abc123".to_string(),
                format: "avi".to_string(),
                download_url: download_url.to_string(),
                video_title: Some("A title".to_string()),
            },
            Utc::now(),
        )
    }

    fn assert_invariants(job: &JobRecord) {
        assert_eq!(
            job.status == JobStatus::Failed,
            job.error.is_some() && job.end_time.is_some()
        );
        assert_eq!(
            job.status == JobStatus::Completed,
            job.filename.is_some() && job.end_time.is_some()
        );
    }

    #[test]
    fn new_jobs_start_in_the_pipeline_entry_state() {
        let conversion = record(JobKind::Conversion, "https://cdn/x");
        assert_eq!(conversion.status, JobStatus::Downloading);
        assert_eq!(conversion.progress, 0.0);

        let direct = record(JobKind::Direct, "https://cdn/x");
        assert_eq!(direct.status, JobStatus::Processing);
        assert_invariants(&direct);
    }

    #[test]
    fn conversion_transitions_keep_invariants_and_monotonic_progress() {
        let mut job = record(JobKind::Conversion, "https://cdn/x");
        job.begin_download();
        assert_eq!(job.progress, 0.25);
        assert_invariants(&job);

        job.begin_converting();
        assert_eq!(job.status, JobStatus::Converting);
        assert_eq!(job.progress, 0.5);
        assert_invariants(&job);

        job.begin_download();
        assert_eq!(job.progress, 0.5, "progress never goes backwards in a run");

        job.complete("A title.avi".to_string(), Utc::now());
        assert_eq!(job.progress, 1.0);
        assert_eq!(job.filename.as_deref(), Some("A title.avi"));
        assert_invariants(&job);
    }

    #[test]
    fn failure_sets_error_and_end_time() {
        let mut job = record(JobKind::Conversion, "https://cdn/x");
        job.begin_download();
        job.fail("Failed to download video: boom", Utc::now());
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.can_retry());
        assert_invariants(&job);
    }

    #[test]
    fn retry_resets_progress_and_clears_terminal_fields() {
        let mut job = record(JobKind::Conversion, "https://cdn/x");
        job.fail("boom", Utc::now());
        let before = job.start_time;

        assert_eq!(job.retry_blocker(), None);
        job.reset_for_retry(before + chrono::Duration::seconds(5));

        assert_eq!(job.status, JobStatus::Downloading);
        assert_eq!(job.progress, 0.25);
        assert!(job.error.is_none());
        assert!(job.end_time.is_none());
        assert!(job.start_time > before);
        assert_invariants(&job);
    }

    #[test]
    fn retry_is_blocked_without_download_url() {
        let mut job = record(JobKind::Direct, "");
        job.fail("boom", Utc::now());
        assert!(!job.can_retry());
        assert_eq!(job.retry_blocker(), Some("no download URL available"));
    }

    #[test]
    fn retry_is_blocked_while_running() {
        let job = record(JobKind::Conversion, "https://cdn/x");
        assert_eq!(job.retry_blocker(), Some("only failed jobs can be retried"));
    }

    #[test]
    fn title_falls_back_to_id() {
        let mut job = record(JobKind::Direct, "https://cdn/x");
        job.video_title = Some("   ".to_string());
        assert_eq!(job.title_or_id(), "abc123_1700000000");
    }

    #[test]
    fn snapshot_serializes_with_client_field_names() {
        let mut job = record(JobKind::Conversion, "https://cdn/x");
        job.fail("boom", Utc::now());
        let value = serde_json::to_value(JobSnapshot::new(&job, 0)).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["canRetry"], true);
        assert_eq!(value["filename"], "");
        assert!(value["endTime"].is_string());
        assert!(value.get("startTime").is_some());
    }

    #[test]
    fn status_round_trips_through_its_column_text() {
        for status in [
            JobStatus::Downloading,
            JobStatus::Converting,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("queued"), None);
    }
}
