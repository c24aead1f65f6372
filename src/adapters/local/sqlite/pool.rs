//! SQLite connection pool.

use super::CREATE_JOBS_TABLE;
use crate::error::PersistenceError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// SQLite-backed job repository.
#[derive(Clone, Debug)]
pub struct SqlitePool {
    pub(super) pool: sqlx::SqlitePool,
}

impl SqlitePool {
    /// Open (creating if needed) the database at `database_url` and make
    /// sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, PersistenceError> {
        let in_memory = database_url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(30));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to ":memory:" is its own database, so keep exactly one.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_JOBS_TABLE).execute(&pool).await?;
        tracing::info!(url = database_url, "job database ready");

        Ok(Self { pool })
    }
}
