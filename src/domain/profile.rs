//! Transcode argument profiles, selected purely by the requested format.

use std::ffi::OsString;
use std::path::Path;

/// Codec settings handed to the external transcoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeProfile {
    pub video_codec: &'static str,
    pub audio_codec: &'static str,
    pub video_quality: Option<&'static str>,
    pub audio_bitrate: Option<&'static str>,
    /// Extension of the produced artifact, without the dot.
    pub extension: String,
}

impl TranscodeProfile {
    /// Picks the profile for `format`. Unknown formats get the default
    /// H.264/AAC profile; only an empty format changes the extension.
    pub fn for_format(format: &str) -> Self {
        let extension = if format.is_empty() {
            "mp4".to_string()
        } else {
            format.to_string()
        };

        match format {
            "avi" => Self {
                video_codec: "mpeg4",
                audio_codec: "mp3",
                video_quality: None,
                audio_bitrate: None,
                extension,
            },
            "mpg" => Self {
                video_codec: "mpeg2video",
                audio_codec: "mp2",
                video_quality: Some("2"),
                audio_bitrate: Some("192k"),
                extension,
            },
            _ => Self {
                video_codec: "libx264",
                audio_codec: "aac",
                video_quality: None,
                audio_bitrate: None,
                extension,
            },
        }
    }

    /// Full ffmpeg argument list for converting `input` into `output`.
    pub fn ffmpeg_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), input.into()];
        args.push("-c:v".into());
        args.push(self.video_codec.into());
        if let Some(quality) = self.video_quality {
            args.push("-q:v".into());
            args.push(quality.into());
        }
        args.push("-c:a".into());
        args.push(self.audio_codec.into());
        if let Some(bitrate) = self.audio_bitrate {
            args.push("-b:a".into());
            args.push(bitrate.into());
        }
        args.push(output.into());
        args
    }
}

/// Normalizes a user-supplied format. The format ends up as a file
/// extension, so anything but ASCII alphanumerics is rejected.
pub fn normalize_format(format: &str) -> Option<String> {
    let format = format.trim().to_ascii_lowercase();
    if format.chars().all(|c| c.is_ascii_alphanumeric()) && format.len() <= 10 {
        Some(format)
    } else {
        None
    }
}
