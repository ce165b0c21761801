//! Process-wide single-flight cache in front of the asset provider.
//!
//! Images are keyed by their URL, videos by their id. A hit never reaches
//! the provider, however old the entry is. A key has at most one outbound
//! fetch at any time: concurrent misses share it, along with its deadline
//! window and its outcome. Failures are handed to every waiter and are not
//! cached.
//!
//! Each fetch runs on its own task and stays registered until the provider
//! call itself returns. Waiters that time out abandon only their wait. A
//! miss that arrives after every earlier waiter gave up joins the running
//! fetch with a fresh deadline window instead of starting a second call.
//! The task writes its value into the cache when it succeeds, so a fetch
//! started before `invalidate_all()` may repopulate the cache after it
//! (last writer wins).
//!
//! Entries have no TTL and are never evicted: the cache grows with the
//! number of distinct assets until it is invalidated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::adapters::AssetProvider;
use crate::config::Timeouts;
use crate::domain::{ArticleReference, Image, Video};

use super::error::{CallSite, EnrichError, EnrichResult};

/// Outcome of a fetch, shared by all of its waiters
type Outcome<V> = Shared<BoxFuture<'static, EnrichResult<V>>>;

/// An outbound fetch that has not returned yet
struct Flight<V> {
    id: u64,
    /// End of the current deadline window; waiters joining before it share it
    expires_at: Instant,
    outcome: Outcome<V>,
}

/// Cached values and pending fetches for one asset type
struct Slot<V> {
    entries: HashMap<String, V>,
    flights: HashMap<String, Flight<V>>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            flights: HashMap::new(),
        }
    }
}

#[derive(Default)]
struct CacheState {
    images: Slot<Image>,
    videos: Slot<Video>,
    next_flight: u64,
}

/// Asset types the cache stores
trait Asset: Clone + Send + Sync + 'static {
    fn slot(state: &mut CacheState) -> &mut Slot<Self>;
}

impl Asset for Image {
    fn slot(state: &mut CacheState) -> &mut Slot<Self> {
        &mut state.images
    }
}

impl Asset for Video {
    fn slot(state: &mut CacheState) -> &mut Slot<Self> {
        &mut state.videos
    }
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    // Every update is a single insert, remove or clear.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cache-aside access to images and videos
pub struct AssetCache {
    provider: Arc<dyn AssetProvider>,
    image_timeout: Duration,
    video_timeout: Duration,
    state: Arc<Mutex<CacheState>>,
    /// Optional bound on concurrent outbound fetches
    limiter: Option<Arc<Semaphore>>,
}

impl AssetCache {
    /// Create an empty cache. Only the image and video deadlines are used.
    pub fn new(provider: Arc<dyn AssetProvider>, timeouts: &Timeouts) -> Self {
        Self {
            provider,
            image_timeout: timeouts.image,
            video_timeout: timeouts.video,
            state: Arc::new(Mutex::new(CacheState::default())),
            limiter: None,
        }
    }

    /// Allow at most `max` outbound fetches at a time
    ///
    /// Time spent waiting for a slot counts against the fetch deadline. A
    /// fetch whose window closes while it is still queued never reaches the
    /// provider.
    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.limiter = Some(Arc::new(Semaphore::new(max)));
        self
    }

    /// Hero image of `reference`, keyed by its URL
    pub async fn get_image(&self, reference: &ArticleReference) -> EnrichResult<Image> {
        let url = reference.hero_image_url.clone();
        let provider = Arc::clone(&self.provider);
        let fetch_url = url.clone();

        self.get_or_fetch(
            url.clone(),
            CallSite::Image { url },
            self.image_timeout,
            async move { provider.fetch_image(&fetch_url).await }.boxed(),
        )
        .await
    }

    pub async fn get_video(&self, video_id: &str) -> EnrichResult<Video> {
        let provider = Arc::clone(&self.provider);
        let fetch_id = video_id.to_string();

        self.get_or_fetch(
            video_id.to_string(),
            CallSite::Video {
                id: video_id.to_string(),
            },
            self.video_timeout,
            async move { provider.fetch_video(&fetch_id).await }.boxed(),
        )
        .await
    }

    /// Drop every cached image and video in one step
    ///
    /// Fetches already in flight are left alone and will store their
    /// results when they complete.
    pub fn invalidate_all(&self) {
        let mut state = lock(&self.state);
        let images = state.images.entries.len();
        let videos = state.videos.entries.len();
        state.images.entries.clear();
        state.videos.entries.clear();
        drop(state);

        info!(images, videos, "Asset cache invalidated");
    }

    /// Number of cached assets (images and videos)
    pub fn len(&self) -> usize {
        let state = lock(&self.state);
        state.images.entries.len() + state.videos.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_image(&self, url: &str) -> bool {
        lock(&self.state).images.entries.contains_key(url)
    }

    pub fn contains_video(&self, video_id: &str) -> bool {
        lock(&self.state).videos.entries.contains_key(video_id)
    }

    /// Number of outbound fetches that have not returned yet
    pub fn in_flight(&self) -> usize {
        let state = lock(&self.state);
        state.images.flights.len() + state.videos.flights.len()
    }

    async fn get_or_fetch<V: Asset>(
        &self,
        key: String,
        call: CallSite,
        deadline: Duration,
        fetch: BoxFuture<'static, anyhow::Result<V>>,
    ) -> EnrichResult<V> {
        let (outcome, expires_at) = {
            let mut state = lock(&self.state);

            if let Some(value) = V::slot(&mut state).entries.get(&key) {
                debug!(%call, "Cache hit");
                return Ok(value.clone());
            }

            let now = Instant::now();
            let joined = V::slot(&mut state).flights.get_mut(&key).map(|flight| {
                if flight.expires_at <= now {
                    // Earlier waiters gave up; the provider call is still running.
                    debug!(%call, "Rejoining outstanding fetch with a new deadline");
                    flight.expires_at = now + deadline;
                } else {
                    debug!(%call, "Joining in-flight fetch");
                }
                (flight.outcome.clone(), flight.expires_at)
            });

            match joined {
                Some(joined) => joined,
                None => {
                    debug!(%call, "Cache miss, fetching");
                    state.next_flight += 1;
                    let id = state.next_flight;
                    let expires_at = now + deadline;
                    let outcome = self.launch(id, key.clone(), call.clone(), deadline, fetch);
                    V::slot(&mut state).flights.insert(
                        key,
                        Flight {
                            id,
                            expires_at,
                            outcome: outcome.clone(),
                        },
                    );
                    (outcome, expires_at)
                }
            }
        };

        // On expiry only this wait ends; the fetch task keeps running.
        match timeout_at(expires_at, outcome).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    %call,
                    timeout_ms = deadline.as_millis() as u64,
                    "Asset fetch timed out"
                );
                Err(EnrichError::timeout(call, deadline))
            }
        }
    }

    /// Spawn the outbound fetch for one key
    ///
    /// Must be called with the state lock held so the flight is registered
    /// before the task can release it.
    fn launch<V: Asset>(
        &self,
        flight_id: u64,
        key: String,
        call: CallSite,
        deadline: Duration,
        fetch: BoxFuture<'static, anyhow::Result<V>>,
    ) -> Outcome<V> {
        let job = FetchJob {
            state: Arc::clone(&self.state),
            key,
            flight_id,
            call: call.clone(),
            deadline,
        };
        let limiter = self.limiter.clone();
        let task = tokio::spawn(job.run(limiter, fetch));

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_err) => Err(EnrichError::task(call, join_err)),
            }
        }
        .boxed()
        .shared()
    }
}

/// One registered fetch, run on its own task
struct FetchJob {
    state: Arc<Mutex<CacheState>>,
    key: String,
    flight_id: u64,
    call: CallSite,
    deadline: Duration,
}

impl FetchJob {
    async fn run<V: Asset>(
        self,
        limiter: Option<Arc<Semaphore>>,
        fetch: BoxFuture<'static, anyhow::Result<V>>,
    ) -> EnrichResult<V> {
        let acquired = match limiter {
            Some(limiter) => Some(self.acquire::<V>(limiter).await),
            None => None,
        };
        let _permit = match acquired {
            Some(Ok(Some(permit))) => Some(permit),
            Some(Ok(None)) => {
                debug!(call = %self.call, "Deadline passed while queued, fetch skipped");
                return Err(EnrichError::timeout(self.call, self.deadline));
            }
            Some(Err(e)) => {
                self.release::<V>();
                return Err(EnrichError::service(self.call, e));
            }
            None => None,
        };

        let outcome = fetch.await;

        // Release and store under one lock so no miss slips in between.
        let mut guard = lock(&self.state);
        let slot = V::slot(&mut guard);
        if slot.flights.get(&self.key).map(|f| f.id) == Some(self.flight_id) {
            slot.flights.remove(&self.key);
        }

        match outcome {
            Ok(value) => {
                slot.entries.insert(self.key, value.clone());
                Ok(value)
            }
            Err(e) => {
                drop(guard);
                warn!(call = %self.call, error = %e, "Asset fetch failed");
                Err(EnrichError::service(self.call, e))
            }
        }
    }

    /// Wait for a fetch slot while the flight's deadline window is open
    ///
    /// Returns `None` (with the flight released) once the window has closed
    /// and no waiter has reopened it.
    async fn acquire<V: Asset>(
        &self,
        limiter: Arc<Semaphore>,
    ) -> anyhow::Result<Option<OwnedSemaphorePermit>> {
        loop {
            let expires_at = {
                let mut guard = lock(&self.state);
                let flights = &mut V::slot(&mut guard).flights;
                let expires_at = match flights.get(&self.key) {
                    Some(flight) if flight.id == self.flight_id => flight.expires_at,
                    _ => return Ok(None),
                };
                if expires_at <= Instant::now() {
                    flights.remove(&self.key);
                    return Ok(None);
                }
                expires_at
            };

            if let Ok(permit) = timeout_at(expires_at, Arc::clone(&limiter).acquire_owned()).await
            {
                return Ok(Some(permit?));
            }
            // Window closed; a late waiter may have reopened it.
        }
    }

    fn release<V: Asset>(&self) {
        let mut guard = lock(&self.state);
        let flights = &mut V::slot(&mut guard).flights;
        if flights.get(&self.key).map(|f| f.id) == Some(self.flight_id) {
            flights.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FixtureCatalog, FixtureProvider};
    use crate::core::error::ErrorKind;

    fn cache(image_delay_ms: u64, video_delay_ms: u64) -> AssetCache {
        let yaml = format!(
            r#"
images:
  - id: https://img/a1.jpg
    alt_text: Chancellor
    delay_ms: {image_delay_ms}
videos:
  - id: v1
    caption: Opening statement
    delay_ms: {video_delay_ms}
"#
        );
        let provider = FixtureProvider::new(FixtureCatalog::from_yaml(&yaml).unwrap());
        let timeouts = Timeouts::from_millis(100, 100, 100);
        AssetCache::new(Arc::new(provider), &timeouts)
    }

    fn reference() -> ArticleReference {
        ArticleReference::new("a1", "Budget day", "https://img/a1.jpg", vec!["v1".into()])
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_populates_cache() {
        let cache = cache(10, 10);
        assert!(cache.is_empty());

        let image = cache.get_image(&reference()).await.unwrap();
        let video = cache.get_video("v1").await.unwrap();

        assert_eq!(image.alt_text, "Chancellor");
        assert_eq!(video.caption, "Opening statement");
        assert!(cache.contains_image("https://img/a1.jpg"));
        assert!(cache.contains_video("v1"));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_not_cached_until_fetch_lands() {
        let cache = cache(150, 10);

        let err = cache.get_image(&reference()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(!cache.contains_image("https://img/a1.jpg"));
        // Still registered until the provider call returns.
        assert_eq!(cache.in_flight(), 1);

        // The abandoned fetch still completes and fills the cache.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.contains_image("https://img/a1.jpg"));
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_all_clears_both_kinds() {
        let cache = cache(10, 10);
        cache.get_image(&reference()).await.unwrap();
        cache.get_video("v1").await.unwrap();
        assert_eq!(cache.len(), 2);

        cache.invalidate_all();

        assert!(cache.is_empty());
        assert!(!cache.contains_image("https://img/a1.jpg"));
        assert!(!cache.contains_video("v1"));
    }

    #[tokio::test]
    async fn test_unknown_video_is_service_failure() {
        let cache = cache(0, 0);
        let err = cache.get_video("v404").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Service);
        assert_eq!(cache.in_flight(), 0);
        assert!(cache.is_empty());
    }
}
