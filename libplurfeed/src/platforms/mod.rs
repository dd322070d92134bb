//! Platform abstraction and implementations
//!
//! Every platform is reached through one [`PlatformAdapter`], so the engine
//! never special-cases a platform. Adapters are synchronous and blocking from
//! their own point of view; the dispatch layer is what moves them off the
//! caller's thread.
//!
//! # Examples
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use libplurfeed::credentials::MemoryCredentialStore;
//! use libplurfeed::platforms::{http::HttpAdapter, PlatformAdapter};
//! use libplurfeed::transport::HttpTransport;
//! use libplurfeed::types::PlatformId;
//!
//! # fn example() -> libplurfeed::error::Result<()> {
//! let transport = Arc::new(HttpTransport::new(Default::default())?);
//! let credentials = Arc::new(MemoryCredentialStore::new());
//! let adapter = HttpAdapter::with_default_endpoint(PlatformId::Mastodon, transport, credentials)?;
//!
//! let mut material = HashMap::new();
//! material.insert("token".to_string(), "secret".to_string());
//! if adapter.authenticate(&material)? {
//!     for post in adapter.fetch_posts(20)? {
//!         println!("{}: {}", post.author.handle, post.body);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::types::{CredentialMaterial, InteractionData, PlatformId, UnifiedPost};

pub mod http;
pub mod profile;

// Mock adapter is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Capability contract every platform implements
///
/// Adapters are shared between worker threads, so every operation takes
/// `&self`; adapters that keep state (tokens, counters) use interior
/// mutability or the shared credential store.
pub trait PlatformAdapter: Send + Sync {
    /// The platform this adapter talks to
    fn platform(&self) -> PlatformId;

    /// Fetch up to `limit` posts in the platform's own most-recent-first order
    ///
    /// Returns fewer posts when the platform has fewer; never pads or
    /// duplicates, and never returns posts from another platform.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Fetch` on network or protocol failure.
    fn fetch_posts(&self, limit: usize) -> Result<Vec<UnifiedPost>>;

    /// Publish a post with optional media file references
    ///
    /// A rejected post is `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Post` only for malformed requests or transport
    /// failure.
    fn create_post(&self, content: &str, media: &[String]) -> Result<bool>;

    /// Validate and store credential material for later calls
    ///
    /// Invalid credentials are `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Auth` only on transport failure.
    fn authenticate(&self, material: &CredentialMaterial) -> Result<bool>;

    /// Perform an adapter-defined interaction such as "like" or "comment"
    ///
    /// Unknown or unsupported kinds are `Ok(false)`, never a crash.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Interaction` on transport failure.
    fn perform_interaction(
        &self,
        platform_post_id: &str,
        kind: &str,
        data: &InteractionData,
    ) -> Result<bool>;
}
