//! Deadline-bounded article reference lookup.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::adapters::ReferenceProvider;
use crate::domain::ArticleReference;

use super::error::{CallSite, EnrichError, EnrichResult};

/// Resolves article ids into references within `reference_timeout`
pub struct ReferenceResolver {
    provider: Arc<dyn ReferenceProvider>,
    reference_timeout: Duration,
}

impl ReferenceResolver {
    pub fn new(provider: Arc<dyn ReferenceProvider>, reference_timeout: Duration) -> Self {
        Self {
            provider,
            reference_timeout,
        }
    }

    /// Configured deadline
    pub fn timeout(&self) -> Duration {
        self.reference_timeout
    }

    /// Fetch the reference for `article_id`
    ///
    /// The provider call runs on its own task. When the deadline passes,
    /// only the wait is abandoned; the call finishes in the background and
    /// its result is dropped.
    #[instrument(skip(self), fields(provider = %self.provider.name()))]
    pub async fn resolve(&self, article_id: &str) -> EnrichResult<ArticleReference> {
        let call = CallSite::Reference {
            article_id: article_id.to_string(),
        };

        if article_id.trim().is_empty() {
            return Err(EnrichError::service(
                call,
                anyhow::anyhow!("Article id cannot be empty"),
            ));
        }

        let provider = Arc::clone(&self.provider);
        let id = article_id.to_string();
        let task = tokio::spawn(async move { provider.fetch_reference(&id).await });

        match timeout(self.reference_timeout, task).await {
            Ok(Ok(Ok(reference))) => {
                debug!(videos = reference.video_urls.len(), "Reference resolved");
                Ok(reference)
            }
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "Reference provider failed");
                Err(EnrichError::service(call, e))
            }
            Ok(Err(join_err)) => Err(EnrichError::task(call, join_err)),
            Err(_) => {
                warn!(
                    timeout_ms = self.reference_timeout.as_millis() as u64,
                    "Reference lookup timed out"
                );
                Err(EnrichError::timeout(call, self.reference_timeout))
            }
        }
    }
}
