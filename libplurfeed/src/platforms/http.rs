//! Generic HTTP adapter
//!
//! One adapter type serves every platform: the platform's profile decides
//! which interactions and post shapes are accepted, and all traffic goes
//! through an [`AuthenticatingTransport`] bound to the adapter's own
//! platform, so the adapter only ever sends its own credential to its own
//! hosts.
//!
//! Endpoints, relative to the configured base URL:
//!
//! | Operation | Request |
//! |---|---|
//! | fetch | `GET feed?limit=N` |
//! | create | `POST posts` with `{"content", "media"}` |
//! | authenticate | `GET verify_credentials` with the candidate token |
//! | interact | `POST posts/{id}/{kind}` with the interaction data |
//!
//! Response bodies use the unified JSON model; translating native platform
//! payloads is the job of whatever serves these endpoints.

use std::collections::HashSet;
use std::sync::Arc;

use secrecy::SecretString;
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::credentials::CredentialStore;
use crate::error::{AdapterError, PlurfeedError, Result};
use crate::events::EventBus;
use crate::platforms::profile::{profile, PlatformProfile};
use crate::platforms::PlatformAdapter;
use crate::transport::{AuthenticatingTransport, OutboundRequest, Transport, TransportResponse};
use crate::types::{CredentialMaterial, InteractionData, InteractionKind, PlatformId, UnifiedPost};

pub struct HttpAdapter {
    platform: PlatformId,
    profile: &'static PlatformProfile,
    base_url: Url,
    transport: AuthenticatingTransport,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpAdapter {
    /// Create an adapter for `platform` rooted at `base_url`
    ///
    /// `hosts` lists the destinations allowed to receive this platform's
    /// credential.
    pub fn new(
        platform: PlatformId,
        base_url: Url,
        hosts: Vec<String>,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let transport =
            AuthenticatingTransport::new(platform, hosts, transport, Arc::clone(&credentials));

        Self {
            platform,
            profile: profile(platform),
            base_url,
            transport,
            credentials,
        }
    }

    /// Create an adapter against the platform's public instance
    pub fn with_default_endpoint(
        platform: PlatformId,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let profile = profile(platform);
        let base_url = Url::parse(profile.default_base_url)
            .map_err(|e| PlurfeedError::InvalidInput(format!("{}: {}", platform, e)))?;
        let hosts = profile.credential_hosts();

        Ok(Self::new(platform, base_url, hosts, transport, credentials))
    }

    /// Report credential-store failures on this bus
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.transport = self.transport.with_events(events);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> std::result::Result<Url, String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| format!("base URL {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Map a response to the contract: 2xx is success, 4xx is a normal
    /// rejection, anything else is a protocol failure.
    fn classify(
        &self,
        response: TransportResponse,
        action: &str,
        error: fn(String) -> AdapterError,
    ) -> Result<bool> {
        if response.is_success() {
            Ok(true)
        } else if response.is_client_error() {
            debug!(
                "{} rejected {} with HTTP {}",
                self.platform, action, response.status
            );
            Ok(false)
        } else {
            Err(error(format!(
                "{} {} failed with HTTP {}",
                self.platform, action, response.status
            ))
            .into())
        }
    }

    /// Enforce the fetch contract on whatever the endpoint returned
    fn normalize(&self, wire: Vec<UnifiedPost>, limit: usize) -> Vec<UnifiedPost> {
        let mut seen = HashSet::new();
        let mut posts = Vec::with_capacity(wire.len().min(limit));

        for mut post in wire {
            if posts.len() == limit {
                break;
            }

            if post.platform != self.platform {
                warn!(
                    "Dropping post {} from {}: response came from the {} adapter",
                    post.platform_post_id, post.platform, self.platform
                );
                continue;
            }

            if let Err(reason) = post.validate() {
                warn!("Dropping malformed {} post: {}", self.platform, reason);
                continue;
            }

            if !seen.insert(post.platform_post_id.clone()) {
                debug!(
                    "Dropping duplicate {} post {}",
                    self.platform, post.platform_post_id
                );
                continue;
            }

            post.id = format!("{}_{}", self.platform, Uuid::new_v4());
            posts.push(post);
        }

        posts
    }
}

impl PlatformAdapter for HttpAdapter {
    fn platform(&self) -> PlatformId {
        self.platform
    }

    fn fetch_posts(&self, limit: usize) -> Result<Vec<UnifiedPost>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut url = self.endpoint(&["feed"]).map_err(AdapterError::Fetch)?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());

        let response = self
            .transport
            .send(OutboundRequest::get(url))
            .map_err(|e| AdapterError::Fetch(format!("{} feed request: {}", self.platform, e)))?;

        if !response.is_success() {
            return Err(AdapterError::Fetch(format!(
                "{} feed request failed with HTTP {}",
                self.platform, response.status
            ))
            .into());
        }

        let wire: Vec<UnifiedPost> = serde_json::from_str(&response.body).map_err(|e| {
            AdapterError::Fetch(format!("{} feed response is not valid: {}", self.platform, e))
        })?;

        let posts = self.normalize(wire, limit);
        debug!("Fetched {} posts from {}", posts.len(), self.platform);
        Ok(posts)
    }

    fn create_post(&self, content: &str, media: &[String]) -> Result<bool> {
        if !self.profile.accepts_text_posts {
            debug!("{} does not accept text posts", self.platform);
            return Ok(false);
        }

        if self.profile.requires_media && media.is_empty() {
            debug!("{} requires at least one media file to post", self.platform);
            return Ok(false);
        }

        let url = self.endpoint(&["posts"]).map_err(AdapterError::Post)?;
        let body = json!({ "content": content, "media": media }).to_string();

        let response = self
            .transport
            .send(OutboundRequest::post_json(url, body))
            .map_err(|e| AdapterError::Post(format!("{} post request: {}", self.platform, e)))?;

        self.classify(response, "post", AdapterError::Post)
    }

    fn authenticate(&self, material: &CredentialMaterial) -> Result<bool> {
        let token = material
            .get("token")
            .or_else(|| material.get("access_token"))
            .map(|t| t.trim())
            .filter(|t| !t.is_empty());

        let Some(token) = token else {
            debug!("No token supplied for {}", self.platform);
            return Ok(false);
        };

        let url = self
            .endpoint(&["verify_credentials"])
            .map_err(AdapterError::Auth)?;
        let request =
            OutboundRequest::get(url).with_header("Authorization", format!("Bearer {}", token));

        let response = self.transport.send(request).map_err(|e| {
            AdapterError::Auth(format!("{} credential check: {}", self.platform, e))
        })?;

        if !self.classify(response, "credentials", AdapterError::Auth)? {
            return Ok(false);
        }

        self.credentials
            .set(self.platform, SecretString::from(token.to_string()))
            .map_err(|e| {
                AdapterError::Auth(format!(
                    "{} credential accepted but could not be stored: {}",
                    self.platform, e
                ))
            })?;

        info!("Authenticated with {}", self.platform);
        Ok(true)
    }

    fn perform_interaction(
        &self,
        platform_post_id: &str,
        kind: &str,
        data: &InteractionData,
    ) -> Result<bool> {
        let Some(parsed) = InteractionKind::parse(kind) else {
            debug!("Unknown interaction '{}' for {}", kind, self.platform);
            return Ok(false);
        };

        if !self.profile.supports(parsed) {
            debug!("{} does not support {}", self.platform, parsed);
            return Ok(false);
        }

        // `.` and `..` would be collapsed out of the URL path
        if matches!(platform_post_id, "" | "." | "..") {
            debug!("Invalid post id '{}' for {}", platform_post_id, self.platform);
            return Ok(false);
        }

        if parsed == InteractionKind::Comment
            && data.get("text").map_or(true, |text| text.trim().is_empty())
        {
            debug!("Comment on {} has no text", self.platform);
            return Ok(false);
        }

        let url = self
            .endpoint(&["posts", platform_post_id, parsed.as_str()])
            .map_err(AdapterError::Interaction)?;
        let body = serde_json::to_string(data).map_err(|e| {
            AdapterError::Interaction(format!("{} interaction body: {}", self.platform, e))
        })?;

        let response = self
            .transport
            .send(OutboundRequest::post_json(url, body))
            .map_err(|e| {
                AdapterError::Interaction(format!("{} {} request: {}", self.platform, parsed, e))
            })?;

        self.classify(response, parsed.as_str(), AdapterError::Interaction)
    }
}
