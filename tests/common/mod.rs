//! Shared test harness: a scripted provider with per-key delays and call
//! counters, plus builders for standard article data.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use telegraph::{
    ArticleReference, AssetProvider, ComposedArticle, Enricher, Image, ReferenceProvider,
    Timeouts, Video,
};

/// Default deadline used by the tests, in milliseconds
pub const TIMEOUT_MS: u64 = 100;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    delay: Duration,
    fail: bool,
}

/// Provider whose answers, delays and failures are scripted per key
#[derive(Default)]
pub struct ScriptedProvider {
    references: Mutex<HashMap<String, Entry<ArticleReference>>>,
    images: Mutex<HashMap<String, Entry<Image>>>,
    videos: Mutex<HashMap<String, Entry<Video>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn given_reference(&self, reference: ArticleReference, delay_ms: u64) {
        Self::script(&self.references, reference.id.clone(), reference, delay_ms, false);
    }

    pub fn given_image(&self, image: Image, delay_ms: u64) {
        Self::script(&self.images, image.id.clone(), image, delay_ms, false);
    }

    pub fn given_video(&self, video: Video, delay_ms: u64) {
        Self::script(&self.videos, video.id.clone(), video, delay_ms, false);
    }

    /// Make the image fail with a provider error after `delay_ms`
    pub fn failing_image(&self, url: &str, delay_ms: u64) {
        Self::script(&self.images, url.to_string(), Image::new(url, ""), delay_ms, true);
    }

    /// Make the video fail with a provider error after `delay_ms`
    pub fn failing_video(&self, video_id: &str, delay_ms: u64) {
        Self::script(
            &self.videos,
            video_id.to_string(),
            Video::new(video_id, ""),
            delay_ms,
            true,
        );
    }

    /// Number of calls made for `key` ("reference:<id>", "image:<url>", "video:<id>")
    pub fn calls(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    fn script<T>(
        map: &Mutex<HashMap<String, Entry<T>>>,
        key: String,
        value: T,
        delay_ms: u64,
        fail: bool,
    ) {
        map.lock().unwrap().insert(
            key,
            Entry {
                value,
                delay: Duration::from_millis(delay_ms),
                fail,
            },
        );
    }

    async fn answer<T: Clone>(
        &self,
        map: &Mutex<HashMap<String, Entry<T>>>,
        kind: &str,
        key: &str,
    ) -> Result<T> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(format!("{}:{}", kind, key))
            .or_insert(0) += 1;

        let entry = map.lock().unwrap().get(key).cloned();
        let entry = match entry {
            Some(entry) => entry,
            None => anyhow::bail!("no scripted {} for '{}'", kind, key),
        };

        tokio::time::sleep(entry.delay).await;

        if entry.fail {
            anyhow::bail!("scripted {} failure for '{}'", kind, key);
        }
        Ok(entry.value)
    }
}

#[async_trait]
impl ReferenceProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_reference(&self, article_id: &str) -> Result<ArticleReference> {
        self.answer(&self.references, "reference", article_id).await
    }
}

#[async_trait]
impl AssetProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_image(&self, url: &str) -> Result<Image> {
        self.answer(&self.images, "image", url).await
    }

    async fn fetch_video(&self, video_id: &str) -> Result<Video> {
        self.answer(&self.videos, "video", video_id).await
    }
}

/// Expected article parts for one reference
pub struct TestData {
    pub reference: ArticleReference,
    pub image: Image,
    pub videos: Vec<Video>,
}

impl TestData {
    /// Reference with a hero image and three videos, all derived from `id`
    pub fn with_id(id: &str) -> Self {
        let video_urls = ["a", "b", "c"]
            .iter()
            .map(|suffix| format!("{}_video_{}", id, suffix))
            .collect();
        Self::from_reference(ArticleReference::new(
            id,
            format!("{}_name", id),
            format!("{}_heroImageUrl", id),
            video_urls,
        ))
    }

    /// Same shape as `with_id`, under a fresh random id
    pub fn random() -> Self {
        Self::with_id(&uuid::Uuid::new_v4().to_string())
    }

    pub fn from_reference(reference: ArticleReference) -> Self {
        let image = Image::new(reference.hero_image_url.clone(), "altText");
        let videos = reference
            .video_urls
            .iter()
            .map(|id| Video::new(id.clone(), format!("c_{}", id)))
            .collect();
        Self {
            reference,
            image,
            videos,
        }
    }

    pub fn id(&self) -> &str {
        &self.reference.id
    }

    /// Script every part with one delay per service
    pub fn given(
        &self,
        provider: &ScriptedProvider,
        reference_ms: u64,
        image_ms: u64,
        video_ms: u64,
    ) {
        let video_delays = vec![video_ms; self.videos.len()];
        self.given_each(provider, reference_ms, image_ms, &video_delays);
    }

    /// Script every part with an individual delay per video
    pub fn given_each(
        &self,
        provider: &ScriptedProvider,
        reference_ms: u64,
        image_ms: u64,
        video_ms: &[u64],
    ) {
        assert!(
            video_ms.len() >= self.videos.len(),
            "Provide a delay value for each video"
        );
        provider.given_reference(self.reference.clone(), reference_ms);
        provider.given_image(self.image.clone(), image_ms);
        for (video, delay) in self.videos.iter().zip(video_ms) {
            provider.given_video(video.clone(), *delay);
        }
    }

    /// Id, name and hero image must match; videos are compared as a set
    pub fn assert_match(&self, article: &ComposedArticle) {
        assert_eq!(article.id, self.reference.id, "id does not match");
        assert_eq!(article.name, self.reference.name, "name does not match");
        assert_eq!(article.hero_image, self.image, "hero image does not match");

        let expected: HashSet<&Video> = self.videos.iter().collect();
        let actual: HashSet<&Video> = article.videos.iter().collect();
        assert_eq!(article.videos.len(), self.videos.len(), "video count differs");
        assert_eq!(actual, expected, "videos do not match");
    }
}

pub fn timeouts() -> Timeouts {
    Timeouts::from_millis(TIMEOUT_MS, TIMEOUT_MS, TIMEOUT_MS)
}

pub fn enricher(provider: &Arc<ScriptedProvider>) -> Enricher {
    Enricher::new(provider.clone(), provider.clone(), timeouts())
}
