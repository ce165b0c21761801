//! Article references, assets, and the composed article.
//!
//! References and assets are produced by providers and never mutated
//! afterwards. A `ComposedArticle` is assembled once, at the join point of
//! an enrichment, from values each branch returned on its own.

use serde::{Deserialize, Serialize};

/// Lightweight pointer to an article and its assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleReference {
    /// Article identifier
    pub id: String,

    /// Article title
    pub name: String,

    /// URL of the hero image (also its cache key)
    pub hero_image_url: String,

    /// Video identifiers, in the order the article lists them
    #[serde(default)]
    pub video_urls: Vec<String>,
}

impl ArticleReference {
    /// Create a new reference
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        hero_image_url: impl Into<String>,
        video_urls: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hero_image_url: hero_image_url.into(),
            video_urls,
        }
    }

    /// Number of asset fetches an enrichment of this reference fans out to
    pub fn fan_out(&self) -> usize {
        1 + self.video_urls.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub alt_text: String,
}

impl Image {
    pub fn new(id: impl Into<String>, alt_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alt_text: alt_text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub caption: String,
}

impl Video {
    pub fn new(id: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            caption: caption.into(),
        }
    }
}

/// Fully enriched article
///
/// `videos` is an unordered collection. Compare it as a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedArticle {
    pub id: String,
    pub name: String,
    pub hero_image: Image,
    pub videos: Vec<Video>,
}

impl ComposedArticle {
    /// Assemble the article from its reference and the fetched assets
    pub fn assemble(reference: &ArticleReference, hero_image: Image, videos: Vec<Video>) -> Self {
        Self {
            id: reference.id.clone(),
            name: reference.name.clone(),
            hero_image,
            videos,
        }
    }
}
