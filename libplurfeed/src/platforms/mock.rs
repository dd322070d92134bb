//! Mock adapter implementation for testing
//!
//! This module provides a configurable mock adapter that can simulate various
//! behaviors including successes, failures, panics, and delays. It's designed
//! for use in integration tests to verify aggregation logic without requiring
//! platform credentials or network access.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use uuid::Uuid;

use crate::error::{AdapterError, Result};
use crate::platforms::PlatformAdapter;
use crate::types::{
    CredentialMaterial, InteractionData, PlatformId, UnifiedAuthor, UnifiedMedia, UnifiedPost,
};

/// One interaction the mock received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedInteraction {
    pub platform_post_id: String,
    pub kind: String,
    pub data: InteractionData,
}

/// Configuration for mock adapter behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub platform: PlatformId,

    /// Posts served by `fetch_posts`, truncated to the requested limit
    pub posts: Vec<UnifiedPost>,

    /// Error returned by `fetch_posts` instead of posts
    pub fetch_error: Option<String>,

    /// Result of `create_post` when no error is configured
    pub post_accepted: bool,
    pub post_error: Option<String>,

    /// Result of `authenticate` when no error is configured
    pub auth_accepted: bool,
    pub auth_error: Option<String>,

    /// Interaction kinds answered with `true`; others are `false`
    pub interactions: Vec<String>,
    pub interaction_error: Option<String>,

    /// Panic inside every operation (exercises panic isolation)
    pub panics: bool,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    pub fetch_call_count: Arc<Mutex<usize>>,
    pub post_call_count: Arc<Mutex<usize>>,
    pub auth_call_count: Arc<Mutex<usize>>,

    /// Content that has been posted (for verification)
    pub posted_content: Arc<Mutex<Vec<String>>>,

    /// Interactions that have been performed (for verification)
    pub recorded_interactions: Arc<Mutex<Vec<RecordedInteraction>>>,
}

impl MockConfig {
    pub fn new(platform: PlatformId) -> Self {
        Self {
            platform,
            posts: Vec::new(),
            fetch_error: None,
            post_accepted: true,
            post_error: None,
            auth_accepted: true,
            auth_error: None,
            interactions: vec![
                "like".to_string(),
                "comment".to_string(),
                "share".to_string(),
            ],
            interaction_error: None,
            panics: false,
            delay: Duration::from_millis(0),
            fetch_call_count: Arc::new(Mutex::new(0)),
            post_call_count: Arc::new(Mutex::new(0)),
            auth_call_count: Arc::new(Mutex::new(0)),
            posted_content: Arc::new(Mutex::new(Vec::new())),
            recorded_interactions: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock adapter for testing
pub struct MockAdapter {
    config: MockConfig,
}

impl MockAdapter {
    /// Create a new mock adapter with the given configuration
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Create a mock adapter that succeeds at everything and has no posts
    pub fn success(platform: PlatformId) -> Self {
        Self::new(MockConfig::new(platform))
    }

    /// Create a mock adapter serving the given posts
    pub fn with_posts(platform: PlatformId, posts: Vec<UnifiedPost>) -> Self {
        Self::new(MockConfig {
            posts,
            ..MockConfig::new(platform)
        })
    }

    /// Create a mock adapter whose fetches fail
    pub fn fetch_failure(platform: PlatformId, error: &str) -> Self {
        Self::new(MockConfig {
            fetch_error: Some(error.to_string()),
            ..MockConfig::new(platform)
        })
    }

    /// Create a mock adapter whose posting fails with a transport error
    pub fn post_failure(platform: PlatformId, error: &str) -> Self {
        Self::new(MockConfig {
            post_error: Some(error.to_string()),
            ..MockConfig::new(platform)
        })
    }

    /// Create a mock adapter that answers `false` to posts and credentials
    pub fn rejecting(platform: PlatformId) -> Self {
        Self::new(MockConfig {
            post_accepted: false,
            auth_accepted: false,
            interactions: Vec::new(),
            ..MockConfig::new(platform)
        })
    }

    /// Create a mock adapter whose authentication fails with a transport error
    pub fn auth_failure(platform: PlatformId, error: &str) -> Self {
        Self::new(MockConfig {
            auth_error: Some(error.to_string()),
            ..MockConfig::new(platform)
        })
    }

    /// Create a mock adapter that panics in every operation
    pub fn panicking(platform: PlatformId) -> Self {
        Self::new(MockConfig {
            panics: true,
            ..MockConfig::new(platform)
        })
    }

    /// Create a mock adapter with a delay
    pub fn with_delay(platform: PlatformId, posts: Vec<UnifiedPost>, delay: Duration) -> Self {
        Self::new(MockConfig {
            posts,
            delay,
            ..MockConfig::new(platform)
        })
    }

    pub fn fetch_call_count(&self) -> usize {
        *lock(&self.config.fetch_call_count)
    }

    pub fn post_call_count(&self) -> usize {
        *lock(&self.config.post_call_count)
    }

    pub fn auth_call_count(&self) -> usize {
        *lock(&self.config.auth_call_count)
    }

    pub fn posted_content(&self) -> Vec<String> {
        lock(&self.config.posted_content).clone()
    }

    pub fn interactions(&self) -> Vec<RecordedInteraction> {
        lock(&self.config.recorded_interactions).clone()
    }

    fn simulate(&self, counter: &Arc<Mutex<usize>>) {
        *lock(counter) += 1;

        if self.config.panics {
            panic!("mock adapter for {} panicked", self.config.platform);
        }

        if !self.config.delay.is_zero() {
            std::thread::sleep(self.config.delay);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PlatformAdapter for MockAdapter {
    fn platform(&self) -> PlatformId {
        self.config.platform
    }

    fn fetch_posts(&self, limit: usize) -> Result<Vec<UnifiedPost>> {
        self.simulate(&self.config.fetch_call_count);

        if let Some(error) = &self.config.fetch_error {
            return Err(AdapterError::Fetch(error.clone()).into());
        }

        Ok(self.config.posts.iter().take(limit).cloned().collect())
    }

    fn create_post(&self, content: &str, _media: &[String]) -> Result<bool> {
        self.simulate(&self.config.post_call_count);

        if let Some(error) = &self.config.post_error {
            return Err(AdapterError::Post(error.clone()).into());
        }

        if self.config.post_accepted {
            lock(&self.config.posted_content).push(content.to_string());
        }
        Ok(self.config.post_accepted)
    }

    fn authenticate(&self, _material: &CredentialMaterial) -> Result<bool> {
        self.simulate(&self.config.auth_call_count);

        if let Some(error) = &self.config.auth_error {
            return Err(AdapterError::Auth(error.clone()).into());
        }

        Ok(self.config.auth_accepted)
    }

    fn perform_interaction(
        &self,
        platform_post_id: &str,
        kind: &str,
        data: &InteractionData,
    ) -> Result<bool> {
        if self.config.panics {
            panic!("mock adapter for {} panicked", self.config.platform);
        }

        if let Some(error) = &self.config.interaction_error {
            return Err(AdapterError::Interaction(error.clone()).into());
        }

        lock(&self.config.recorded_interactions).push(RecordedInteraction {
            platform_post_id: platform_post_id.to_string(),
            kind: kind.to_string(),
            data: data.clone(),
        });

        Ok(self.config.interactions.iter().any(|k| k == kind))
    }
}

/// Build `count` posts for `platform`, newest first
///
/// The first post is published at `newest_ms`, each following one
/// `spacing_ms` earlier.
pub fn sample_posts(
    platform: PlatformId,
    count: usize,
    newest_ms: i64,
    spacing_ms: i64,
) -> Vec<UnifiedPost> {
    (0..count)
        .map(|i| {
            let n = i + 1;
            let author = UnifiedAuthor {
                id: format!("author_{}", n),
                platform_user_id: format!("{}_user_{}", platform, n),
                platform,
                handle: format!("{}_user_{}", platform, n),
                display_name: format!("{} User {}", platform, n),
                avatar_url: Some(format!("https://example.com/{}_avatar{}.jpg", platform, n)),
                verified: n % 3 == 0,
            };

            let media = if n % 2 == 0 {
                vec![UnifiedMedia::image(
                    format!("media_{}", n),
                    format!("https://example.com/{}_image{}.jpg", platform, n),
                    1200,
                    800,
                )]
            } else {
                Vec::new()
            };

            UnifiedPost {
                id: format!("{}_{}", platform, Uuid::new_v4()),
                platform_post_id: format!("{}_post_{}", platform, n),
                platform,
                author,
                body: format!("Post #{} from {}", n, platform),
                media,
                published_at: newest_ms - (i as i64) * spacing_ms,
                like_count: (n * 10) as u64,
                comment_count: n as u64,
                share_count: (n / 2) as u64,
                liked_by_viewer: false,
                bookmarked_by_viewer: false,
            }
        })
        .collect()
}
