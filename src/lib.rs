//! tubeconv - video download and conversion service
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (jobs, filenames, transcode profiles)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations (SQLite, ffmpeg, HTTP in and out)
//! - application/: Job registry, pipelines, runner and request service
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod ports;

// Re-exports for convenience
pub use adapters::local::{events, ArtifactStore};
pub use config::AppConfig;
pub use error::{Error, Result};
