use crate::error::TransferError;
use crate::ports::fetch::Fetcher;
use async_trait::async_trait;
use futures::TryStreamExt;
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::{fs::File, io::AsyncWriteExt, io::BufWriter};
use tokio_util::io::StreamReader;

/// Streams a remote resource to disk with reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, TransferError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status(status.as_u16()));
        }

        let body = response
            .bytes_stream()
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err));
        let body_reader = StreamReader::new(body);
        futures::pin_mut!(body_reader);

        let mut file = BufWriter::new(File::create(dest).await?);
        let written = tokio::io::copy(&mut body_reader, &mut file).await?;
        file.flush().await?;

        Ok(written)
    }
}
