use crate::domain::jobs::{JobKind, JobRecord, JobStatus};
use serde::Serialize;

pub mod hub;
pub mod listener;

/// Published after every persisted job transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub progress: f64,
    pub error: Option<String>,
    pub filename: Option<String>,
}

impl From<&JobRecord> for JobEvent {
    fn from(record: &JobRecord) -> Self {
        Self {
            id: record.id.clone(),
            kind: record.kind,
            status: record.status,
            progress: record.progress,
            error: record.error.clone(),
            filename: record.filename.clone(),
        }
    }
}
