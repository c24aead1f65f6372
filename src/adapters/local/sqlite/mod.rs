//! SQLite adapter for the persistence gateway.
//!
//! One `jobs` table keyed by job id; every pipeline step upserts its row.

mod pool;
mod repository;

pub use pool::SqlitePool;

/// Schema applied on connect.
const CREATE_JOBS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id           TEXT PRIMARY KEY NOT NULL,
    kind         TEXT NOT NULL,
    url          TEXT NOT NULL,
    format       TEXT NOT NULL,
    status       TEXT NOT NULL,
    start_time   TEXT NOT NULL,
    end_time     TEXT,
    filename     TEXT,
    error        TEXT,
    progress     REAL NOT NULL DEFAULT 0,
    download_url TEXT NOT NULL DEFAULT '',
    video_title  TEXT
)
"#;
