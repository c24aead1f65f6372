//! Application layer - job tracking and the pipelines that drive it.

pub mod conversion;
pub mod direct;
pub mod registry;
pub mod runner;
pub mod service;
pub mod transfer;

pub use registry::{JobHandle, JobRegistry};
pub use runner::JobRunner;
pub use service::{DirectArtifact, DownloadRequest, DownloadService, Submission};
