use crate::domain::profile::TranscodeProfile;
use crate::error::TranscodeError;
use crate::ports::transcoder::Transcoder;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// How much of ffmpeg's stderr is kept in a job's error message.
const STDERR_TAIL_CHARS: usize = 400;

/// Runs the `ffmpeg` binary with the argument list of a transcode profile.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        profile: &TranscodeProfile,
    ) -> Result<(), TranscodeError> {
        let result = Command::new(&self.binary)
            .args(profile.ffmpeg_args(input, output))
            .stdin(Stdio::null())
            .output()
            .await?;

        if result.status.success() {
            return Ok(());
        }

        Err(TranscodeError::Failed {
            status: result.status,
            stderr: stderr_tail(&result.stderr),
        })
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let skip = text.chars().count().saturating_sub(STDERR_TAIL_CHARS);
    text.chars().skip(skip).collect()
}
