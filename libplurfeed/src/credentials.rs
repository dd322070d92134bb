//! Credential storage for platform tokens
//!
//! One opaque token per platform, held in a process-wide store whose
//! lifecycle is independent of any request. A missing token is a normal
//! state (unauthenticated), not an error.
//!
//! # Backends
//!
//! - `MemoryCredentialStore`: mutex-guarded map, lives as long as the process
//! - `KeyringCredentialStore`: OS-native secure storage
//!
//! # Example
//!
//! ```
//! use libplurfeed::credentials::{CredentialStore, MemoryCredentialStore};
//! use libplurfeed::types::PlatformId;
//! use secrecy::{ExposeSecret, SecretString};
//!
//! # fn example() -> libplurfeed::error::Result<()> {
//! let store = MemoryCredentialStore::new();
//! store.set(PlatformId::Bluesky, SecretString::from("token".to_string()))?;
//!
//! let token = store.get(PlatformId::Bluesky)?;
//! assert_eq!(token.unwrap().expose_secret(), "token");
//! assert!(store.get(PlatformId::Mastodon)?.is_none());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{CredentialError, Result};
use crate::types::PlatformId;

/// Trait for credential storage backends
pub trait CredentialStore: Send + Sync {
    /// Token for the platform, or `None` when unauthenticated
    ///
    /// # Errors
    ///
    /// Returns an error only when the backend itself cannot be read.
    fn get(&self, platform: PlatformId) -> Result<Option<SecretString>>;

    /// Store (or replace) the token for the platform
    fn set(&self, platform: PlatformId, token: SecretString) -> Result<()>;

    /// Forget the token for the platform; clearing a missing token is fine
    fn clear(&self, platform: PlatformId) -> Result<()>;

    /// Backend name for logging (e.g., "memory", "keyring")
    fn backend_name(&self) -> &str;
}

/// Which backend to create from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Keyring,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialConfig {
    #[serde(default)]
    pub storage: StorageBackend,
}

/// Create the configured credential store
///
/// # Errors
///
/// Returns `CredentialError::KeyringUnavailable` if the keyring backend is
/// requested but the OS keyring cannot be reached.
pub fn create_store(config: &CredentialConfig) -> Result<Arc<dyn CredentialStore>> {
    match config.storage {
        StorageBackend::Memory => Ok(Arc::new(MemoryCredentialStore::new())),
        StorageBackend::Keyring => Ok(Arc::new(KeyringCredentialStore::new()?)),
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}

/// In-process credential store
#[derive(Default)]
pub struct MemoryCredentialStore {
    tokens: Mutex<HashMap<PlatformId, SecretString>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, platform: PlatformId) -> Result<Option<SecretString>> {
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tokens.get(&platform).map(copy_secret))
    }

    fn set(&self, platform: PlatformId, token: SecretString) -> Result<()> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens.insert(platform, token);
        tracing::debug!("Stored credential for {} in memory", platform);
        Ok(())
    }

    fn clear(&self, platform: PlatformId) -> Result<()> {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens.remove(&platform);
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

/// OS keyring credential store
///
/// Tokens live under service `plurfeed.{platform}`, key `access_token`.
pub struct KeyringCredentialStore;

impl KeyringCredentialStore {
    const KEY: &'static str = "access_token";

    /// Create a new KeyringCredentialStore
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::KeyringUnavailable` if the OS keyring
    /// cannot be accessed (e.g., headless Linux without Secret Service).
    pub fn new() -> Result<Self> {
        match keyring::Entry::new("plurfeed.test", "availability_check") {
            Ok(_) => Ok(Self),
            Err(e) => Err(CredentialError::KeyringUnavailable(format!(
                "OS keyring not accessible: {}",
                e
            ))
            .into()),
        }
    }

    fn entry(platform: PlatformId) -> Result<keyring::Entry> {
        let service = format!("plurfeed.{}", platform);
        keyring::Entry::new(&service, Self::KEY)
            .map_err(|e| CredentialError::KeyringUnavailable(e.to_string()).into())
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self, platform: PlatformId) -> Result<Option<SecretString>> {
        match Self::entry(platform)?.get_password() {
            Ok(token) => {
                tracing::debug!("Retrieved credential for {} from OS keyring", platform);
                Ok(Some(SecretString::from(token)))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialError::Backend(e.to_string()).into()),
        }
    }

    fn set(&self, platform: PlatformId, token: SecretString) -> Result<()> {
        Self::entry(platform)?
            .set_password(token.expose_secret())
            .map_err(|e| CredentialError::Backend(e.to_string()))?;

        tracing::debug!("Stored credential for {} in OS keyring", platform);
        Ok(())
    }

    fn clear(&self, platform: PlatformId) -> Result<()> {
        match Self::entry(platform)?.delete_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CredentialError::Backend(e.to_string()).into()),
        }
    }

    fn backend_name(&self) -> &str {
        "keyring"
    }
}
