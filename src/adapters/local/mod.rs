//! Local adapters: disk, database, transcoder process, event hub and the
//! inbound HTTP API.

pub mod events;
pub mod ffmpeg;
pub mod fs;
pub mod http;
pub mod memory;
pub mod sqlite;

pub use events::hub::EventHub;
pub use ffmpeg::FfmpegTranscoder;
pub use fs::ArtifactStore;
pub use memory::MemoryRepository;
pub use sqlite::SqlitePool;
