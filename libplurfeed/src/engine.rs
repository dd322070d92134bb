//! Aggregation engine
//!
//! Fans each operation out to the registered adapters and folds the results
//! back together. Every adapter call is isolated: an error or a panic from
//! one platform is logged, published on the event bus, and turned into an
//! empty contribution or a `false` flag. Nothing an adapter does can fail the
//! operation as a whole.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use libplurfeed::engine::AggregationEngine;
//! use libplurfeed::platforms::mock::{sample_posts, MockAdapter};
//! use libplurfeed::registry::AdapterRegistry;
//! use libplurfeed::types::PlatformId;
//!
//! let registry = Arc::new(AdapterRegistry::new());
//! registry.register_adapter(Arc::new(MockAdapter::with_posts(
//!     PlatformId::Mastodon,
//!     sample_posts(PlatformId::Mastodon, 3, 10_000, 100),
//! ))).unwrap();
//! registry.register_adapter(Arc::new(MockAdapter::fetch_failure(
//!     PlatformId::Bluesky,
//!     "connection refused",
//! ))).unwrap();
//!
//! let engine = AggregationEngine::new(registry);
//! let feed = engine.fetch_aggregated_feed(10);
//! assert_eq!(feed.len(), 3);
//! ```

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{panic_message, EngineError, Result};
use crate::events::{Event, EventBus, EventReceiver, Operation};
use crate::platforms::PlatformAdapter;
use crate::registry::{AdapterRegistry, SharedAdapter};
use crate::types::{CredentialMaterial, InteractionData, PlatformId, UnifiedPost};

/// One platform that did not contribute to an aggregation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformFailure {
    pub platform: PlatformId,
    pub error: String,
}

/// Merged feed plus the per-platform outcome of the pass
#[derive(Debug, Clone, Default)]
pub struct AggregationReport {
    /// Posts from every successful platform, newest first
    pub posts: Vec<UnifiedPost>,
    /// Platforms that answered, in registry order
    pub succeeded: Vec<PlatformId>,
    /// Platforms that failed, in registry order
    pub failures: Vec<PlatformFailure>,
}

impl AggregationReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_platforms(&self) -> Vec<PlatformId> {
        self.failures.iter().map(|f| f.platform).collect()
    }
}

/// Feed size used when the caller does not pick one
pub const DEFAULT_FEED_LIMIT: usize = 20;

pub struct AggregationEngine {
    registry: Arc<AdapterRegistry>,
    events: EventBus,
    parallel_fetch: bool,
    default_limit: usize,
}

impl AggregationEngine {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            events: EventBus::default(),
            parallel_fetch: false,
            default_limit: DEFAULT_FEED_LIMIT,
        }
    }

    /// Publish diagnostics on `events` instead of a private bus
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Fetch from adapters concurrently during aggregation passes
    ///
    /// The merged feed is identical to the sequential pass.
    pub fn with_parallel_fetch(mut self, parallel_fetch: bool) -> Self {
        self.parallel_fetch = parallel_fetch;
        self
    }

    /// Limit used by [`fetch_default_feed`](Self::fetch_default_feed)
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Fetch up to `limit` posts from every registered platform and merge
    /// them newest first
    ///
    /// Failing platforms are left out. Ties on `published_at` keep platform
    /// declaration order, then each adapter's own order.
    pub fn fetch_aggregated_feed(&self, limit: usize) -> Vec<UnifiedPost> {
        self.fetch_aggregated_report(limit).posts
    }

    /// Aggregated feed at the configured default limit
    pub fn fetch_default_feed(&self) -> Vec<UnifiedPost> {
        self.fetch_aggregated_feed(self.default_limit)
    }

    /// Same pass as [`fetch_aggregated_feed`](Self::fetch_aggregated_feed),
    /// also reporting which platforms failed and why
    pub fn fetch_aggregated_report(&self, limit: usize) -> AggregationReport {
        let adapters = self.registry.snapshot();
        let platforms: Vec<PlatformId> = adapters.iter().map(|(p, _)| *p).collect();

        info!(
            "Aggregating feed from {} platforms (limit {})",
            platforms.len(),
            limit
        );
        self.events.emit(Event::AggregationStarted {
            platforms,
            limit,
        });

        // Indexed collect keeps registry order in both modes
        let outcomes: Vec<(PlatformId, std::result::Result<Vec<UnifiedPost>, String>)> =
            if self.parallel_fetch && adapters.len() > 1 {
                adapters
                    .par_iter()
                    .map(|(platform, adapter)| (*platform, self.fetch_one(*platform, adapter, limit)))
                    .collect()
            } else {
                adapters
                    .iter()
                    .map(|(platform, adapter)| (*platform, self.fetch_one(*platform, adapter, limit)))
                    .collect()
            };

        let mut report = AggregationReport::default();
        for (platform, outcome) in outcomes {
            match outcome {
                Ok(posts) => {
                    self.events.emit(Event::PlatformFetched {
                        platform,
                        count: posts.len(),
                    });
                    report.succeeded.push(platform);
                    report.posts.extend(posts);
                }
                Err(error) => {
                    self.report_failure(platform, Operation::Fetch, &error);
                    report.failures.push(PlatformFailure { platform, error });
                }
            }
        }

        // Stable, so equal timestamps keep concatenation order
        report
            .posts
            .sort_by(|a, b| b.published_at.cmp(&a.published_at));

        info!(
            "Aggregated {} posts ({} platforms failed)",
            report.posts.len(),
            report.failures.len()
        );
        self.events.emit(Event::AggregationCompleted {
            total: report.posts.len(),
            failed: report.failed_platforms(),
        });

        report
    }

    /// Fetch up to `limit` posts from one platform
    ///
    /// An unregistered or failing platform yields an empty feed.
    pub fn fetch_platform_feed(&self, platform: PlatformId, limit: usize) -> Vec<UnifiedPost> {
        let Some(adapter) = self.lookup(platform, Operation::Fetch) else {
            return Vec::new();
        };

        match self.fetch_one(platform, &adapter, limit) {
            Ok(posts) => {
                self.events.emit(Event::PlatformFetched {
                    platform,
                    count: posts.len(),
                });
                posts
            }
            Err(error) => {
                self.report_failure(platform, Operation::Fetch, &error);
                Vec::new()
            }
        }
    }

    /// Post `content` to each requested platform independently
    ///
    /// The returned map has one entry per distinct requested platform;
    /// unregistered and failing platforms map to `false`.
    pub fn post_to_multiple_platforms(
        &self,
        content: &str,
        media: &[String],
        platforms: &[PlatformId],
    ) -> BTreeMap<PlatformId, bool> {
        let mut results = BTreeMap::new();

        for &platform in platforms {
            if results.contains_key(&platform) {
                continue;
            }
            let posted = self.delegate(platform, Operation::Post, |adapter| {
                adapter.create_post(content, media)
            });
            results.insert(platform, posted);
        }

        let succeeded = results.values().filter(|ok| **ok).count();
        info!(
            "Posted to {}/{} platforms",
            succeeded,
            results.len()
        );
        results
    }

    /// Hand credential material to one platform's adapter
    pub fn authenticate_platform(
        &self,
        platform: PlatformId,
        material: &CredentialMaterial,
    ) -> bool {
        self.delegate(platform, Operation::Authenticate, |adapter| {
            adapter.authenticate(material)
        })
    }

    /// Perform an interaction on the platform the post came from
    pub fn perform_social_interaction(
        &self,
        post: &UnifiedPost,
        kind: &str,
        data: &InteractionData,
    ) -> bool {
        self.delegate(post.platform, Operation::Interact, |adapter| {
            adapter.perform_interaction(&post.platform_post_id, kind, data)
        })
    }

    fn lookup(&self, platform: PlatformId, operation: Operation) -> Option<SharedAdapter> {
        let adapter = self.registry.lookup(platform);
        if adapter.is_none() {
            let error = EngineError::UnregisteredPlatform(platform).to_string();
            self.report_failure(platform, operation, &error);
        }
        adapter
    }

    /// Run one fetch and enforce the adapter contract on its output
    fn fetch_one(
        &self,
        platform: PlatformId,
        adapter: &SharedAdapter,
        limit: usize,
    ) -> std::result::Result<Vec<UnifiedPost>, String> {
        let mut posts = isolate(|| adapter.fetch_posts(limit))?;

        let before = posts.len();
        posts.retain(|post| post.platform == platform);
        if posts.len() != before {
            warn!(
                "Discarded {} posts from the {} adapter carrying another platform",
                before - posts.len(),
                platform
            );
        }

        posts.retain(|post| match post.validate() {
            Ok(()) => true,
            Err(reason) => {
                warn!("Discarded malformed {} post: {}", platform, reason);
                false
            }
        });

        if posts.len() > limit {
            warn!(
                "{} adapter returned {} posts for limit {}",
                platform,
                posts.len(),
                limit
            );
            posts.truncate(limit);
        }

        debug!("{} contributed {} posts", platform, posts.len());
        Ok(posts)
    }

    /// Single-adapter operation collapsed to a flag
    fn delegate<F>(&self, platform: PlatformId, operation: Operation, call: F) -> bool
    where
        F: FnOnce(&dyn PlatformAdapter) -> Result<bool>,
    {
        let Some(adapter) = self.lookup(platform, operation) else {
            return false;
        };

        match isolate(|| call(adapter.as_ref())) {
            Ok(true) => true,
            Ok(false) => {
                debug!("{} declined {}", platform, operation);
                false
            }
            Err(error) => {
                self.report_failure(platform, operation, &error);
                false
            }
        }
    }

    fn report_failure(&self, platform: PlatformId, operation: Operation, error: &str) {
        warn!("{} failed on {}: {}", operation, platform, error);
        self.events.emit(Event::PlatformFailed {
            platform,
            operation,
            error: error.to_string(),
        });
    }
}

/// Run an adapter call, turning both errors and panics into a message
fn isolate<T, F>(call: F) -> std::result::Result<T, String>
where
    F: FnOnce() -> Result<T>,
{
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(error.to_string()),
        Err(payload) => Err(format!("adapter panicked: {}", panic_message(&*payload))),
    }
}
