//! Wire adapters, engine and dispatcher together from configuration

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::credentials::{create_store, CredentialStore};
use crate::dispatch::Dispatcher;
use crate::engine::AggregationEngine;
use crate::error::Result;
use crate::events::EventBus;
use crate::platforms::http::HttpAdapter;
use crate::registry::AdapterRegistry;
use crate::transport::{HttpTransport, Transport};

/// Create one HTTP adapter per enabled platform
///
/// Every adapter shares `transport` and `credentials`, but each one only
/// attaches its own platform's credential, and only to its own hosts.
pub fn build_registry(
    config: &Config,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
) -> Result<AdapterRegistry> {
    build_registry_with_events(config, transport, credentials, &EventBus::default())
}

/// Like [`build_registry`], reporting credential-store failures on `events`
pub fn build_registry_with_events(
    config: &Config,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    events: &EventBus,
) -> Result<AdapterRegistry> {
    let registry = AdapterRegistry::new();

    for (platform, platform_config) in config.enabled_platforms()? {
        let base_url = platform_config.resolve_base_url(platform)?;
        let hosts = platform_config.resolve_hosts(platform)?;
        debug!("Configuring {} at {} (hosts: {:?})", platform, base_url, hosts);

        let adapter = HttpAdapter::new(
            platform,
            base_url,
            hosts,
            Arc::clone(&transport),
            Arc::clone(&credentials),
        )
        .with_events(events.clone());

        registry.register(platform, Arc::new(adapter))?;
    }

    info!(
        "Registered {} platforms with {} credential storage",
        registry.len(),
        credentials.backend_name()
    );
    Ok(registry)
}

/// Build an engine over the given transport and credential store
pub fn build_engine_with(
    config: &Config,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
) -> Result<AggregationEngine> {
    config.validate()?;

    let events = EventBus::default();
    let registry = build_registry_with_events(config, transport, credentials, &events)?;

    Ok(AggregationEngine::new(Arc::new(registry))
        .with_events(events)
        .with_parallel_fetch(config.aggregation.parallel_fetch)
        .with_default_limit(config.aggregation.default_limit))
}

/// Build an engine that talks to the network
///
/// Creates the blocking HTTP client, so call this outside async code (or
/// from `spawn_blocking`).
pub fn build_engine(config: &Config) -> Result<AggregationEngine> {
    let transport = HttpTransport::new(config.http.clone())?;
    let credentials = create_store(&config.credentials)?;
    build_engine_with(config, Arc::new(transport), credentials)
}

/// Put a dispatcher sized from configuration in front of `engine`
///
/// Must be called from within a tokio runtime.
pub fn build_dispatcher(config: &Config, engine: Arc<AggregationEngine>) -> Result<Dispatcher> {
    Ok(Dispatcher::new(engine, config.dispatch.workers)?)
}
