//! Configuration management for Plurfeed

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

use crate::credentials::CredentialConfig;
use crate::error::{ConfigError, Result};
use crate::engine::DEFAULT_FEED_LIMIT;
use crate::platforms::profile::profile;
use crate::types::PlatformId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub credentials: CredentialConfig,
    /// Keyed by platform name (e.g. `[platforms.mastodon]`)
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Size of the worker pool
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Fetch from adapters in parallel instead of one after another
    #[serde(default)]
    pub parallel_fetch: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            parallel_fetch: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_timeout_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// API root; defaults to the platform's public instance
    pub base_url: Option<String>,
    /// Hosts the platform's credential may be sent to; defaults to the
    /// platform's canonical hosts plus the host of `base_url`
    pub hosts: Option<Vec<String>>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            hosts: None,
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_limit() -> usize {
    DEFAULT_FEED_LIMIT
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_enabled() -> bool {
    true
}

impl PlatformConfig {
    /// Parsed API root for `platform`
    pub fn resolve_base_url(&self, platform: PlatformId) -> Result<Url> {
        let raw = self
            .base_url
            .as_deref()
            .unwrap_or(profile(platform).default_base_url);

        Url::parse(raw).map_err(|e| {
            ConfigError::Invalid {
                field: format!("platforms.{}.base_url", platform),
                reason: format!("'{}' is not a valid URL: {}", raw, e),
            }
            .into()
        })
    }

    /// Hosts allowed to receive the credential for `platform`
    pub fn resolve_hosts(&self, platform: PlatformId) -> Result<Vec<String>> {
        if let Some(hosts) = &self.hosts {
            return Ok(hosts.clone());
        }

        let mut hosts = profile(platform).credential_hosts();

        if let Some(host) = self.resolve_base_url(platform)?.host_str() {
            if !hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) {
                hosts.push(host.to_string());
            }
        }

        Ok(hosts)
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// All five platforms enabled against their public instances
    pub fn default_config() -> Self {
        let platforms = PlatformId::ALL
            .into_iter()
            .map(|p| (p.as_str().to_string(), PlatformConfig::default()))
            .collect();

        Self {
            platforms,
            ..Default::default()
        }
    }

    /// Check value ranges and platform entries
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "dispatch.workers".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        if self.aggregation.default_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "aggregation.default_limit".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        for (name, platform_config) in &self.platforms {
            let platform: PlatformId = name.parse().map_err(|reason| ConfigError::Invalid {
                field: format!("platforms.{}", name),
                reason,
            })?;
            platform_config.resolve_base_url(platform)?;
        }

        Ok(())
    }

    /// Enabled platforms with their settings, in platform order
    pub fn enabled_platforms(&self) -> Result<Vec<(PlatformId, &PlatformConfig)>> {
        let mut enabled = Vec::new();
        for (name, platform_config) in &self.platforms {
            if !platform_config.enabled {
                continue;
            }
            let platform: PlatformId = name.parse().map_err(|reason| ConfigError::Invalid {
                field: format!("platforms.{}", name),
                reason,
            })?;
            enabled.push((platform, platform_config));
        }
        enabled.sort_by_key(|(platform, _)| *platform);
        Ok(enabled)
    }
}

/// Resolve the configuration file path following XDG conventions
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("PLURFEED_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("plurfeed").join("config.toml"))
}
