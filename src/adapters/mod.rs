//! Provider interfaces for external systems.
//!
//! Providers perform the actual reference and asset I/O. The engine only
//! bounds and classifies their calls; a provider reports failure through
//! `anyhow::Result` and never needs to know about deadlines.

pub mod fixture;
pub mod http;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{ArticleReference, Image, Video};

// Re-export the concrete providers
pub use fixture::{FixtureCatalog, FixtureProvider};
pub use http::HttpProvider;

/// Source of article references
#[async_trait]
pub trait ReferenceProvider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Look up the reference for an article id
    async fn fetch_reference(&self, article_id: &str) -> Result<ArticleReference>;
}

/// Source of images and videos
#[async_trait]
pub trait AssetProvider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Fetch the image stored under `url`
    async fn fetch_image(&self, url: &str) -> Result<Image>;

    /// Fetch the video with the given id
    async fn fetch_video(&self, video_id: &str) -> Result<Video>;
}
