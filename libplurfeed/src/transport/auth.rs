//! Credential injection for outbound requests

use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing::{debug, warn};

use super::{host_matches, OutboundRequest, Transport, TransportResponse, TransportResult};
use crate::credentials::CredentialStore;
use crate::events::{Event, EventBus};
use crate::types::PlatformId;

/// Transport decorator that attaches one platform's credential
///
/// Each adapter owns one of these, bound to its own platform. For every
/// request it checks that the destination host belongs to that platform,
/// looks up the held token, and sends `Authorization: Bearer <token>` when
/// one exists. Requests to foreign hosts, requests that already carry an
/// `Authorization` header, and requests made while unauthenticated go out
/// untouched. A failing credential store is reported, never fatal.
pub struct AuthenticatingTransport {
    platform: PlatformId,
    hosts: Vec<String>,
    inner: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    events: EventBus,
}

impl AuthenticatingTransport {
    pub fn new(
        platform: PlatformId,
        hosts: Vec<String>,
        inner: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            platform,
            hosts,
            inner,
            credentials,
            events: EventBus::default(),
        }
    }

    /// Report credential-store failures on this bus
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn platform(&self) -> PlatformId {
        self.platform
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    fn owns_destination(&self, request: &OutboundRequest) -> bool {
        request
            .url
            .host_str()
            .is_some_and(|host| self.hosts.iter().any(|known| host_matches(host, known)))
    }

    fn authorize(&self, request: OutboundRequest) -> (OutboundRequest, bool) {
        if request.header("Authorization").is_some() || !self.owns_destination(&request) {
            return (request, false);
        }

        match self.credentials.get(self.platform) {
            Ok(Some(token)) => {
                let value = format!("Bearer {}", token.expose_secret());
                (request.with_header("Authorization", value), true)
            }
            Ok(None) => (request, false),
            Err(e) => {
                warn!(
                    "Credential lookup for {} failed, sending unauthenticated: {}",
                    self.platform, e
                );
                self.events.emit(Event::CredentialUnavailable {
                    platform: self.platform,
                    error: e.to_string(),
                });
                (request, false)
            }
        }
    }
}

impl Transport for AuthenticatingTransport {
    fn send(&self, request: OutboundRequest) -> TransportResult<TransportResponse> {
        let (request, authenticated) = self.authorize(request);

        debug!(
            platform = %self.platform,
            method = %request.method,
            host = request.url.host_str().unwrap_or(""),
            authenticated,
            "Sending request"
        );

        self.inner.send(request)
    }
}
