//! Article enrichment: reference lookup, then a concurrent asset fan-out.
//!
//! The reference must resolve before any asset is requested. After that
//! the hero image and every video are requested at once through the
//! shared `AssetCache`, and the article is assembled only when all of them
//! have arrived.
//!
//! On the first failing branch the enrichment fails with that branch's
//! error and the waits of the remaining branches are dropped. The fetches
//! behind those waits run on their own tasks, so they still finish and
//! still populate the cache.

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::{try_join, try_join_all};
use tracing::{debug, error, info, instrument};

use crate::adapters::{AssetProvider, ReferenceProvider};
use crate::config::{EnricherSettings, Timeouts};
use crate::domain::{ArticleReference, ComposedArticle, EnrichPhase};

use super::cache::AssetCache;
use super::error::EnrichResult;
use super::resolver::ReferenceResolver;

/// Composes articles from a reference provider and a cached asset provider
pub struct Enricher {
    resolver: ReferenceResolver,
    cache: Arc<AssetCache>,
}

impl Enricher {
    /// Create an enricher with its own, empty asset cache
    pub fn new(
        references: Arc<dyn ReferenceProvider>,
        assets: Arc<dyn AssetProvider>,
        timeouts: Timeouts,
    ) -> Self {
        let cache = AssetCache::new(assets, &timeouts);
        Self::with_cache(
            ReferenceResolver::new(references, timeouts.reference),
            Arc::new(cache),
        )
    }

    /// Create an enricher from resolved settings
    pub fn from_settings(
        references: Arc<dyn ReferenceProvider>,
        assets: Arc<dyn AssetProvider>,
        settings: &EnricherSettings,
    ) -> Self {
        let timeouts = settings.timeouts();
        let mut cache = AssetCache::new(assets, &timeouts);
        if let Some(max) = settings.max_concurrent_fetches {
            cache = cache.with_max_concurrent_fetches(max);
        }

        Self::with_cache(
            ReferenceResolver::new(references, timeouts.reference),
            Arc::new(cache),
        )
    }

    /// Create an enricher that shares an existing cache
    pub fn with_cache(resolver: ReferenceResolver, cache: Arc<AssetCache>) -> Self {
        Self { resolver, cache }
    }

    /// The asset cache this enricher reads through
    pub fn cache(&self) -> &Arc<AssetCache> {
        &self.cache
    }

    /// Drop every cached asset
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    /// Enrich the article with the given id
    ///
    /// Returns the composed article, or the first error observed in the
    /// reference lookup or in any asset branch. Never returns a partial
    /// article.
    #[instrument(skip(self))]
    pub async fn enrich(&self, article_id: &str) -> EnrichResult<ComposedArticle> {
        let started = Instant::now();
        let mut phase = EnrichPhase::Pending.advance();
        debug!(%phase, "Enrichment started");

        let reference = match self.resolver.resolve(article_id).await {
            Ok(reference) => reference,
            Err(e) => {
                phase = phase.fail();
                error!(%phase, kind = %e.kind(), error = %e, "Enrichment failed");
                return Err(e);
            }
        };

        phase = phase.advance();
        debug!(%phase, fan_out = reference.fan_out(), "Fetching assets");

        match self.fetch_assets(&reference).await {
            Ok(article) => {
                phase = phase.advance();
                info!(
                    %phase,
                    videos = article.videos.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Article enriched"
                );
                Ok(article)
            }
            Err(e) => {
                phase = phase.fail();
                error!(%phase, kind = %e.kind(), error = %e, "Enrichment failed");
                Err(e)
            }
        }
    }

    /// Fan out to the hero image and all videos, then assemble
    async fn fetch_assets(&self, reference: &ArticleReference) -> EnrichResult<ComposedArticle> {
        let image = self.cache.get_image(reference);
        let videos = try_join_all(
            reference
                .video_urls
                .iter()
                .map(|video_id| self.cache.get_video(video_id)),
        );

        let (hero_image, videos) = try_join(image, videos).await?;

        Ok(ComposedArticle::assemble(reference, hero_image, videos))
    }
}
