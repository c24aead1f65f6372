use crate::domain::profile::TranscodeProfile;
use crate::error::TranscodeError;
use async_trait::async_trait;
use std::path::Path;

/// The external transcode process, treated as a black box.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        profile: &TranscodeProfile,
    ) -> Result<(), TranscodeError>;
}
