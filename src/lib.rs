//! telegraph - Concurrent article enrichment
//!
//! Turns a lightweight article reference into a composed article by
//! fetching its hero image and all of its videos concurrently, each under
//! its own deadline, through a process-wide single-flight cache.
//!
//! # Architecture
//!
//! - The reference is resolved first; nothing else starts until it has
//! - The hero image and every video are then fetched at once
//! - Every failure is classified as either a timeout or a service failure
//! - The article is built once, only after every part has succeeded
//!
//! # Modules
//!
//! - `adapters`: Provider traits and the fixture/HTTP providers
//! - `core`: Enrichment engine (Enricher, AssetCache, ReferenceResolver, errors)
//! - `domain`: Data structures (ArticleReference, Image, Video, ComposedArticle)
//! - `config`: Deadline and fetch-limit settings
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Enrich an article served from a fixture catalog
//! telegraph enrich budget-2026 --fixtures demos/fixtures.yaml
//!
//! # Against a live service, twice, dropping the cache in between
//! telegraph enrich a1 --endpoint http://localhost:8080 --repeat 2 --invalidate-between
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{AssetProvider, ReferenceProvider};
pub use config::{EnricherSettings, Timeouts};
pub use crate::core::{AssetCache, EnrichError, Enricher, ErrorKind, ReferenceResolver};
pub use domain::{ArticleReference, ComposedArticle, EnrichPhase, Image, Video};
