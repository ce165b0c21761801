//! Core enrichment engine.
//!
//! This module contains:
//! - Error: the Timeout/Service failure taxonomy
//! - Resolver: deadline-bounded reference lookup
//! - Cache: single-flight asset cache
//! - Enricher: reference lookup followed by the asset fan-out

pub mod cache;
pub mod enricher;
pub mod error;
pub mod resolver;

// Re-export commonly used types
pub use cache::AssetCache;
pub use enricher::Enricher;
pub use error::{CallSite, EnrichError, EnrichResult, ErrorKind};
pub use resolver::ReferenceResolver;
