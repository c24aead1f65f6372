//! Resolution client for the RapidAPI video download service.

use crate::error::ResolutionError;
use crate::ports::resolver::{ResolvedVideo, VideoResolver};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const API_TIMEOUT: Duration = Duration::from_secs(30);
const TITLE_TIMEOUT: Duration = Duration::from_secs(10);
const OEMBED_URL: &str = "https://www.youtube.com/oembed";

#[derive(Debug, Deserialize)]
struct RapidApiResponse {
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    file: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Clone)]
pub struct RapidApiResolver {
    client: reqwest::Client,
    api_key: String,
    api_host: String,
    api_base: String,
    oembed_url: String,
}

impl RapidApiResolver {
    pub fn new(api_key: impl Into<String>, api_host: impl Into<String>) -> Result<Self, reqwest::Error> {
        let api_host = api_host.into();
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: format!("https://{}", api_host),
            api_host,
            oembed_url: OEMBED_URL.to_string(),
        })
    }

    /// Point both endpoints somewhere else, e.g. a local stub.
    pub fn with_endpoints(mut self, api_base: impl Into<String>, oembed_url: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.oembed_url = oembed_url.into();
        self
    }

    async fn download_link(&self, video_id: &str) -> Result<RapidApiResponse, ResolutionError> {
        let url = format!("{}/download_video/{}", self.api_base, video_id);
        let response = self
            .client
            .get(url)
            .query(&[("quality", "247")])
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.api_host)
            .timeout(API_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let parsed: RapidApiResponse = serde_json::from_slice(&body)?;
        if parsed.file.is_empty() {
            return Err(ResolutionError::MissingFile);
        }
        Ok(parsed)
    }

    async fn oembed_title(&self, video_id: &str) -> Result<String, ResolutionError> {
        let watch_url = format!("https://www.youtube.com/watch?v={}", video_id);
        let response = self
            .client
            .get(&self.oembed_url)
            .query(&[("url", watch_url.as_str()), ("format", "json")])
            .timeout(TITLE_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::Status(status.as_u16()));
        }

        let parsed: OEmbedResponse = serde_json::from_slice(&response.bytes().await?)?;
        Ok(parsed.title)
    }
}

#[async_trait]
impl VideoResolver for RapidApiResolver {
    async fn resolve(&self, video_id: &str) -> Result<ResolvedVideo, ResolutionError> {
        let link = self.download_link(video_id).await?;

        let title = match link.title.filter(|t| !t.trim().is_empty()) {
            Some(title) => Some(title),
            None => match self.oembed_title(video_id).await {
                Ok(title) if !title.trim().is_empty() => Some(title),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(video = video_id, "could not fetch video title: {}", e);
                    None
                }
            },
        };

        Ok(ResolvedVideo {
            file_url: link.file,
            title,
            size_bytes: link.size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::get,
        Json, Router,
    };
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn resolver(base: &str) -> RapidApiResolver {
        RapidApiResolver::new("key", "api.example")
            .unwrap()
            .with_endpoints(base, format!("{}/oembed", base))
    }

    #[tokio::test]
    async fn returns_link_title_and_size() {
        let base = serve(Router::new().route(
            "/download_video/:id",
            get(|Path(id): Path<String>, headers: HeaderMap| async move {
                assert_eq!(headers["x-rapidapi-key"], "key");
                assert_eq!(headers["x-rapidapi-host"], "api.example");
                Json(json!({
                    "file": format!("https://cdn.example/{}.mp4", id),
                    "title": "From API",
                    "size": 1024
                }))
            }),
        ))
        .await;

        let resolved = resolver(&base).resolve("abc123").await.unwrap();
        assert_eq!(resolved.file_url, "https://cdn.example/abc123.mp4");
        assert_eq!(resolved.title.as_deref(), Some("From API"));
        assert_eq!(resolved.size_bytes, Some(1024));
    }

    #[tokio::test]
    async fn falls_back_to_oembed_title() {
        let base = serve(
            Router::new()
                .route(
                    "/download_video/:id",
                    get(|| async { Json(json!({ "file": "https://cdn.example/x.mp4" })) }),
                )
                .route("/oembed", get(|| async { Json(json!({ "title": "From oEmbed" })) })),
        )
        .await;

        let resolved = resolver(&base).resolve("abc123").await.unwrap();
        assert_eq!(resolved.title.as_deref(), Some("From oEmbed"));
    }

    #[tokio::test]
    async fn missing_title_everywhere_is_not_an_error() {
        let base = serve(Router::new().route(
            "/download_video/:id",
            get(|| async { Json(json!({ "file": "https://cdn.example/x.mp4" })) }),
        ))
        .await;

        let resolved = resolver(&base).resolve("abc123").await.unwrap();
        assert_eq!(resolved.title, None);
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let base = serve(Router::new().route(
            "/download_video/:id",
            get(|| async { Json(json!({ "file": "" })) }),
        ))
        .await;

        let result = resolver(&base).resolve("abc123").await;
        assert!(matches!(result, Err(ResolutionError::MissingFile)));
    }

    #[tokio::test]
    async fn upstream_errors_carry_the_status() {
        let base = serve(Router::new().route(
            "/download_video/:id",
            get(|| async { StatusCode::TOO_MANY_REQUESTS }),
        ))
        .await;

        let result = resolver(&base).resolve("abc123").await;
        assert!(matches!(result, Err(ResolutionError::Status(429))));
    }
}
