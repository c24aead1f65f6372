//! Configuration loaded from the environment (and `.env`, when present).

use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: u16,
    /// Key for the video resolution API
    pub rapidapi_key: String,
    /// Host of the video resolution API
    pub rapidapi_host: String,
    /// sqlx connection URL for the job database
    pub database_url: String,
    /// Base directory for `conversions/` and `static/`
    pub exec_dir: PathBuf,
    /// Wait between resolving a link and the first transfer attempt
    pub settle_delay: Duration,
    /// Pipelines allowed to run at once
    pub max_concurrent_jobs: usize,
    /// Transcoder binary
    pub ffmpeg_path: PathBuf,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let max_concurrent_jobs = parse_or(&get, "MAX_CONCURRENT_JOBS", 4usize, "a positive integer")?;
        if max_concurrent_jobs == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_CONCURRENT_JOBS",
                expected: "a positive integer",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            addr: get("ADDR").unwrap_or_else(|| String::from("0.0.0.0")),
            port: parse_or(&get, "PORT", 8080u16, "a port number")?,
            rapidapi_key: required("RAPIDAPI_KEY")?,
            rapidapi_host: required("RAPIDAPI_HOST")?,
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| String::from("sqlite:tubeconv.db?mode=rwc")),
            exec_dir: get("EXEC_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            settle_delay: Duration::from_secs(parse_or(
                &get,
                "SETTLE_DELAY_SECS",
                20u64,
                "a number of seconds",
            )?),
            max_concurrent_jobs,
            ffmpeg_path: get("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }

    pub fn ongoing_dir(&self) -> PathBuf {
        self.exec_dir.join("conversions").join("ongoing")
    }

    pub fn completed_dir(&self) -> PathBuf {
        self.exec_dir.join("conversions").join("completed")
    }

    pub fn static_dir(&self) -> PathBuf {
        self.exec_dir.join("static")
    }
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
    }
}
