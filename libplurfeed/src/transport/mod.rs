//! Outbound request plumbing shared by all adapters
//!
//! Adapters describe each network call as an [`OutboundRequest`] and hand it
//! to a [`Transport`]. The [`AuthenticatingTransport`] decorator sits in front
//! of the real transport and attaches the adapter's credential, so credential
//! injection is applied uniformly regardless of which operation is in flight.

use url::Url;

use crate::error::TransportError;
use crate::platforms::profile::profile;
use crate::types::PlatformId;

pub mod auth;
pub mod http;

// Recording transport is available for all builds (not just tests) to support integration tests
pub mod recording;

pub use auth::AuthenticatingTransport;
pub use http::HttpTransport;
pub use recording::RecordingTransport;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// A transport-independent description of one network call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl OutboundRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// A POST carrying a JSON body
    pub fn post_json(url: Url, body: String) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body),
        }
    }

    pub fn with_header(mut self, name: &str, value: String) -> Self {
        self.headers.push((name.to_string(), value));
        self
    }

    /// Header lookup, case-insensitive on the name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// Sends one request and returns the raw response
///
/// Implementations block the calling thread until the response arrives.
pub trait Transport: Send + Sync {
    fn send(&self, request: OutboundRequest) -> TransportResult<TransportResponse>;
}

/// Whether `host` is `known` or a subdomain of it
///
/// Matching is on whole DNS labels: `api.bsky.social` matches `bsky.social`,
/// `evilbsky.social` and `bsky.social.example.com` do not.
pub fn host_matches(host: &str, known: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let known = known.trim_end_matches('.').to_ascii_lowercase();

    host == known
        || host
            .strip_suffix(known.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Derive the platform that owns a request destination
///
/// Pure function of the URL against each platform's canonical hosts. A host
/// shared with other services (`www.googleapis.com`) only counts below the
/// platform's path prefix.
pub fn platform_for_url(url: &Url) -> Option<PlatformId> {
    PlatformId::ALL
        .into_iter()
        .find(|platform| profile(*platform).owns(url))
}
