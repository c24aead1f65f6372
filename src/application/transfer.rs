//! Transfer Engine: bounded retry around a single-attempt fetcher.

use crate::error::TransferError;
use crate::ports::fetch::Fetcher;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Fixed attempt budget with a linearly growing pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Pause after the given failed attempt (1-based), or `None` once the
    /// budget is spent.
    pub fn backoff_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        Some(self.backoff_step * attempt)
    }
}

#[derive(Clone)]
pub struct TransferEngine {
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
}

impl TransferEngine {
    pub fn new(fetcher: Arc<dyn Fetcher>, policy: RetryPolicy) -> Self {
        Self { fetcher, policy }
    }

    /// Download `url` into `dest`, retrying on any failure. Returns the last
    /// attempt's error when the budget runs out.
    pub async fn fetch(&self, job_id: &str, url: &str, dest: &Path) -> Result<u64, TransferError> {
        let mut attempt = 1;
        loop {
            match self.fetcher.fetch(url, dest).await {
                Ok(bytes) => {
                    tracing::debug!(job = job_id, attempt, bytes, "transfer finished");
                    return Ok(bytes);
                }
                Err(e) => match self.policy.backoff_after(attempt) {
                    Some(pause) => {
                        tracing::warn!(
                            job = job_id,
                            attempt,
                            retry_in = ?pause,
                            "transfer attempt failed: {}",
                            e
                        );
                        tokio::time::sleep(pause).await;
                        attempt += 1;
                    }
                    None => {
                        tracing::warn!(job = job_id, attempt, "last transfer attempt failed: {}", e);
                        return Err(e);
                    }
                },
            }
        }
    }
}
