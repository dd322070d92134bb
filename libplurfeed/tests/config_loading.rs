//! Loading configuration from disk and building an engine from it

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use libplurfeed::builder::build_engine_with;
use libplurfeed::config::{resolve_config_path, Config};
use libplurfeed::credentials::MemoryCredentialStore;
use libplurfeed::error::{ConfigError, PlurfeedError};
use libplurfeed::transport::RecordingTransport;
use libplurfeed::types::PlatformId;
use serial_test::serial;
use tempfile::TempDir;

const SAMPLE_CONFIG: &str = r#"
[dispatch]
workers = 2

[aggregation]
default_limit = 15
parallel_fetch = true

[platforms.bluesky]

[platforms.mastodon]
base_url = "https://hachyderm.io/api/v1/"

[platforms.youtube]
enabled = false
"#;

fn write_config(dir: &TempDir, content: &str) -> Result<std::path::PathBuf> {
    let path = dir.path().join("config.toml");
    fs::write(&path, content)?;
    Ok(path)
}

#[test]
fn test_load_from_path_and_build() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_config(&dir, SAMPLE_CONFIG)?;

    let config = Config::load_from_path(&path)?;
    assert_eq!(config.dispatch.workers, 2);
    assert_eq!(config.aggregation.default_limit, 15);

    let transport = Arc::new(RecordingTransport::new());
    let engine = build_engine_with(
        &config,
        transport.clone(),
        Arc::new(MemoryCredentialStore::new()),
    )?;

    assert_eq!(
        engine.registry().platforms(),
        vec![PlatformId::Bluesky, PlatformId::Mastodon]
    );

    engine.fetch_aggregated_feed(config.aggregation.default_limit);
    let custom = transport.requests_to("hachyderm.io");
    assert_eq!(custom.len(), 1);
    assert_eq!(custom[0].url.query(), Some("limit=15"));
    assert!(transport.requests_to("mastodon.social").is_empty());
    Ok(())
}

#[test]
fn test_invalid_file_is_parse_error() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_config(&dir, "[dispatch\nworkers = ")?;

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(matches!(err, PlurfeedError::Config(ConfigError::ParseError(_))));
    Ok(())
}

#[test]
fn test_unknown_platform_table_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_config(&dir, "[platforms.myspace]\nenabled = true\n")?;

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("Unknown platform: 'myspace'"));
    Ok(())
}

#[test]
fn test_missing_file_is_read_error() {
    let err = Config::load_from_path(std::path::Path::new("/nonexistent/plurfeed.toml"))
        .unwrap_err();
    assert!(matches!(err, PlurfeedError::Config(ConfigError::ReadError(_))));
}

#[test]
#[serial]
fn test_config_path_from_environment() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_config(&dir, SAMPLE_CONFIG)?;

    std::env::set_var("PLURFEED_CONFIG", &path);
    let resolved = resolve_config_path();
    let loaded = Config::load();
    std::env::remove_var("PLURFEED_CONFIG");

    assert_eq!(resolved?, path);
    assert_eq!(loaded?.dispatch.workers, 2);
    Ok(())
}

#[test]
#[serial]
fn test_config_path_expands_tilde() -> Result<()> {
    std::env::set_var("PLURFEED_CONFIG", "~/plurfeed-test.toml");
    let resolved = resolve_config_path();
    std::env::remove_var("PLURFEED_CONFIG");

    let resolved = resolved?;
    assert!(!resolved.to_string_lossy().starts_with('~'));
    assert!(resolved.ends_with("plurfeed-test.toml"));
    Ok(())
}
