//! Domain types for telegraph.
//!
//! This module contains the core data structures:
//! - Article: references, assets and the composed article
//! - Phase: lifecycle of a single enrichment

pub mod article;
pub mod phase;

// Re-export commonly used types
pub use article::{ArticleReference, ComposedArticle, Image, Video};
pub use phase::EnrichPhase;
