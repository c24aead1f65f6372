//! SQLite JobRepository implementation.

use super::pool::SqlitePool;
use crate::domain::jobs::{JobKind, JobRecord, JobStatus};
use crate::error::PersistenceError;
use crate::ports::repository::JobRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    kind: String,
    url: String,
    format: String,
    status: String,
    start_time: String,
    end_time: Option<String>,
    filename: Option<String>,
    error: Option<String>,
    progress: f64,
    download_url: String,
    video_title: Option<String>,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = PersistenceError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| PersistenceError::CorruptRow {
            id: row.id.clone(),
            reason,
        };
        let kind = JobKind::parse(&row.kind).ok_or_else(|| corrupt(format!("kind '{}'", row.kind)))?;
        let status =
            JobStatus::parse(&row.status).ok_or_else(|| corrupt(format!("status '{}'", row.status)))?;
        let start_time = parse_time(&row.start_time).map_err(|e| corrupt(e.to_string()))?;
        let end_time = row
            .end_time
            .as_deref()
            .map(parse_time)
            .transpose()
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(JobRecord {
            id: row.id,
            kind,
            url: row.url,
            format: row.format,
            status,
            start_time,
            end_time,
            filename: row.filename,
            error: row.error,
            progress: row.progress,
            download_url: row.download_url,
            video_title: row.video_title,
        })
    }
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|t| t.with_timezone(&Utc))
}

#[async_trait]
impl JobRepository for SqlitePool {
    async fn upsert(&self, job: &JobRecord) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, kind, url, format, status, start_time, end_time,
                              filename, error, progress, download_url, video_title)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                url = excluded.url,
                format = excluded.format,
                status = excluded.status,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                filename = excluded.filename,
                error = excluded.error,
                progress = excluded.progress,
                download_url = excluded.download_url,
                video_title = excluded.video_title
            "#,
        )
        .bind(&job.id)
        .bind(job.kind.as_str())
        .bind(&job.url)
        .bind(&job.format)
        .bind(job.status.as_str())
        .bind(job.start_time.to_rfc3339())
        .bind(job.end_time.map(|t| t.to_rfc3339()))
        .bind(&job.filename)
        .bind(&job.error)
        .bind(job.progress)
        .bind(&job.download_url)
        .bind(&job.video_title)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<JobRecord>, PersistenceError> {
        let rows = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs")
            .fetch_all(&self.pool)
            .await?;

        let mut jobs = Vec::with_capacity(rows.len());
        for row in rows {
            match JobRecord::try_from(row) {
                Ok(job) => jobs.push(job),
                Err(e) => tracing::warn!("skipping stored job: {}", e),
            }
        }
        Ok(jobs)
    }
}
