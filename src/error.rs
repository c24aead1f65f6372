//! Error types for every collaborator the job pipeline talks to.

use std::process::ExitStatus;

/// Failure to turn a user URL into a transient download link.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("could not extract video ID from URL")]
    InvalidUrl,
    #[error("resolution request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("resolution API returned status {0}")]
    Status(u16),
    #[error("failed to parse API response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no download URL returned from API")]
    MissingFile,
}

/// Failure of a single transfer attempt, or of the whole retry budget.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("download failed with status code: {0}")]
    Status(u16),
    #[error("failed to save video: {0}")]
    Io(#[from] std::io::Error),
    #[error("interrupted before transfer")]
    Interrupted,
}

/// Failure of the external transcode process.
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("failed to start transcoder: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("{status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("failed to store converted file: {0}")]
    Finalize(std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("corrupt job row '{id}': {reason}")]
    CorruptRow { id: String, reason: String },
}

/// Errors surfaced synchronously to callers of the download service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("job '{0}' not found")]
    NotFound(String),
    #[error("cannot retry job '{id}': {reason}")]
    NotRetryable { id: String, reason: String },
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Raised by `AppConfig::from_env` for missing or malformed settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Anything that stops a binary from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
