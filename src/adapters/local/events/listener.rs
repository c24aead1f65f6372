use super::hub::EventHub;
use crate::domain::jobs::JobStatus;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Logs every job transition until the hub is dropped.
pub fn start(event_hub: Arc<EventHub>) -> JoinHandle<()> {
    let mut rx = event_hub.subscribe();

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.status {
                    JobStatus::Failed => tracing::warn!(
                        job = %event.id,
                        kind = event.kind.as_str(),
                        error = event.error.as_deref().unwrap_or_default(),
                        "job failed"
                    ),
                    JobStatus::Completed => tracing::info!(
                        job = %event.id,
                        kind = event.kind.as_str(),
                        file = event.filename.as_deref().unwrap_or_default(),
                        "job completed"
                    ),
                    status => tracing::debug!(
                        job = %event.id,
                        %status,
                        progress = event.progress,
                        "job progressed"
                    ),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
