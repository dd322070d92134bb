//! Plurfeed - one feed and one set of actions across social platforms
//!
//! Adapters for each platform sit behind a common contract; the aggregation
//! engine fans operations out to them, merges what comes back, and keeps one
//! failing platform from taking the rest down. The dispatcher runs engine
//! operations off the caller's thread.

pub mod builder;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod platforms;
pub mod registry;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use credentials::{CredentialConfig, CredentialStore, StorageBackend};
pub use dispatch::{CompletionQueue, DispatchHandle, Dispatcher};
pub use engine::{AggregationEngine, AggregationReport};
pub use error::{PlurfeedError, Result};
pub use platforms::PlatformAdapter;
pub use registry::AdapterRegistry;
pub use types::{PlatformId, UnifiedAuthor, UnifiedMedia, UnifiedPost};
