//! Fixture provider backed by a YAML catalog.
//!
//! Serves references, images and videos from memory, each after an
//! optional simulated delay. Useful for running the engine without any
//! backing services and for reproducing deadline behavior.
//!
//! ```yaml
//! references:
//!   - id: a1
//!     name: Budget day
//!     hero_image_url: https://img/a1.jpg
//!     video_urls: [v1, v2]
//!     delay_ms: 50
//! images:
//!   - id: https://img/a1.jpg
//!     alt_text: Chancellor at the despatch box
//! videos:
//!   - id: v1
//!     caption: Opening statement
//!     delay_ms: 80
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{AssetProvider, ReferenceProvider};
use crate::domain::{ArticleReference, Image, Video};

/// A catalog entry with its simulated response delay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delayed<T> {
    #[serde(flatten)]
    pub value: T,

    /// Milliseconds to wait before answering
    #[serde(default)]
    pub delay_ms: u64,
}

/// Raw catalog file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureCatalog {
    #[serde(default)]
    pub references: Vec<Delayed<ArticleReference>>,
    #[serde(default)]
    pub images: Vec<Delayed<Image>>,
    #[serde(default)]
    pub videos: Vec<Delayed<Video>>,
}

impl FixtureCatalog {
    /// Load a catalog from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file: {}", path.display()))?;

        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse fixture file: {}", path.display()))
    }

    /// Parse a catalog from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse fixture YAML")
    }
}

/// In-memory provider serving a `FixtureCatalog`
pub struct FixtureProvider {
    references: HashMap<String, Delayed<ArticleReference>>,
    images: HashMap<String, Delayed<Image>>,
    videos: HashMap<String, Delayed<Video>>,
}

impl FixtureProvider {
    /// Index a catalog by id. Later duplicates replace earlier ones.
    pub fn new(catalog: FixtureCatalog) -> Self {
        Self {
            references: catalog
                .references
                .into_iter()
                .map(|r| (r.value.id.clone(), r))
                .collect(),
            images: catalog
                .images
                .into_iter()
                .map(|i| (i.value.id.clone(), i))
                .collect(),
            videos: catalog
                .videos
                .into_iter()
                .map(|v| (v.value.id.clone(), v))
                .collect(),
        }
    }

    /// Load and index a catalog file
    pub fn from_file(path: &Path) -> Result<Self> {
        FixtureCatalog::from_file(path).map(Self::new)
    }

    /// Number of references in the catalog
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    async fn answer<T: Clone>(entry: Option<&Delayed<T>>, what: &str, id: &str) -> Result<T> {
        let entry = entry.with_context(|| format!("No fixture for {} '{}'", what, id))?;
        if entry.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(entry.delay_ms)).await;
        }
        Ok(entry.value.clone())
    }
}

#[async_trait]
impl ReferenceProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn fetch_reference(&self, article_id: &str) -> Result<ArticleReference> {
        Self::answer(self.references.get(article_id), "reference", article_id).await
    }
}

#[async_trait]
impl AssetProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn fetch_image(&self, url: &str) -> Result<Image> {
        Self::answer(self.images.get(url), "image", url).await
    }

    async fn fetch_video(&self, video_id: &str) -> Result<Video> {
        Self::answer(self.videos.get(video_id), "video", video_id).await
    }
}
