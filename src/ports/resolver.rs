use crate::error::ResolutionError;
use async_trait::async_trait;

/// Transient source link and metadata for a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVideo {
    pub file_url: String,
    pub title: Option<String>,
    pub size_bytes: Option<u64>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoResolver: Send + Sync {
    /// Resolve a video id. Called at most once per incoming request.
    async fn resolve(&self, video_id: &str) -> Result<ResolvedVideo, ResolutionError>;
}
