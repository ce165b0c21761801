//! JSON-over-HTTP provider for reference and asset services.
//!
//! Endpoints, relative to the base URL:
//! - `GET /articles/{id}` -> `ArticleReference`
//! - `GET /images?url={url}` -> `Image`
//! - `GET /videos/{id}` -> `Video`
//!
//! Deadlines are enforced by the engine, not by the HTTP client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;

use super::{AssetProvider, ReferenceProvider};
use crate::domain::{ArticleReference, Image, Video};

/// HTTP client for a reference/asset service
pub struct HttpProvider {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
}

impl HttpProvider {
    /// Create a new provider for `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a provider sharing an existing client
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL extended by `segments`, each one percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Base URL cannot have a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.url(segments)?;

        let response = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("GET {} returned {}: {}", url, status, body.trim());
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to decode response from {}", url))
    }
}

#[async_trait]
impl ReferenceProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_reference(&self, article_id: &str) -> Result<ArticleReference> {
        self.get_json(&["articles", article_id], &[]).await
    }
}

#[async_trait]
impl AssetProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_image(&self, url: &str) -> Result<Image> {
        self.get_json(&["images"], &[("url", url)]).await
    }

    async fn fetch_video(&self, video_id: &str) -> Result<Video> {
        self.get_json(&["videos", video_id], &[]).await
    }
}
