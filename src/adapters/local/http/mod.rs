//! HTTP inbound adapter.
//!
//! JSON API under `/api`, artifact downloads as attachments, and the static
//! front-end served from disk for everything else.

mod error;
mod routes;

pub use error::{ApiError, ApiResult};
pub use routes::{router, AppState};
