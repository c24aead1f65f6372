//! Domain layer - Pure business logic.

pub mod filename;
pub mod jobs;
pub mod profile;
pub mod video_id;
