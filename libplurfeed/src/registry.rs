//! Adapter registry
//!
//! Maps each platform to at most one adapter. Iteration follows the
//! declaration order of [`PlatformId`], which is what gives the aggregated
//! feed its documented tie order.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::platforms::PlatformAdapter;
use crate::types::PlatformId;

/// Shared adapter handle
pub type SharedAdapter = Arc<dyn PlatformAdapter>;

/// Registry of platform adapters
///
/// Safe to mutate while operations are reading from it: readers take a
/// snapshot of the adapters they need and release the lock before calling
/// into any adapter.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: RwLock<BTreeMap<PlatformId, SharedAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` under `platform`, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PlatformMismatch` if the adapter reports a
    /// different platform than the key it is registered under.
    pub fn register(&self, platform: PlatformId, adapter: SharedAdapter) -> Result<()> {
        let identity = adapter.platform();
        if identity != platform {
            return Err(EngineError::PlatformMismatch {
                key: platform,
                adapter: identity,
            }
            .into());
        }

        if self.write().insert(platform, adapter).is_some() {
            info!("Replaced adapter for {}", platform);
        } else {
            debug!("Registered adapter for {}", platform);
        }
        Ok(())
    }

    /// Register `adapter` under the platform it reports
    pub fn register_adapter(&self, adapter: SharedAdapter) -> Result<()> {
        let platform = adapter.platform();
        self.register(platform, adapter)
    }

    pub fn lookup(&self, platform: PlatformId) -> Option<SharedAdapter> {
        self.read().get(&platform).cloned()
    }

    /// Remove and return the adapter for `platform`
    pub fn unregister(&self, platform: PlatformId) -> Option<SharedAdapter> {
        let removed = self.write().remove(&platform);
        if removed.is_some() {
            debug!("Unregistered adapter for {}", platform);
        }
        removed
    }

    /// Registered platforms in declaration order
    pub fn platforms(&self) -> Vec<PlatformId> {
        self.read().keys().copied().collect()
    }

    /// All registered adapters in declaration order
    pub fn snapshot(&self) -> Vec<(PlatformId, SharedAdapter)> {
        self.read()
            .iter()
            .map(|(platform, adapter)| (*platform, Arc::clone(adapter)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Adapters never run under the lock, so a poisoned lock still holds a
    // consistent map.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<PlatformId, SharedAdapter>> {
        self.adapters.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<PlatformId, SharedAdapter>> {
        self.adapters.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("platforms", &self.platforms())
            .finish()
    }
}
