use crate::error::TransferError;
use async_trait::async_trait;
use std::path::Path;

/// A single attempt at pulling a remote resource onto local disk.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` into `dest`, returning the number of bytes written.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, TransferError>;
}
