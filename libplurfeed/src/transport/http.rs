//! Blocking HTTP transport on reqwest
//!
//! Adapters run on dispatch workers (blocking threads), so the blocking
//! client is the right fit. Do not construct or drop an `HttpTransport`
//! from inside an async task; reqwest's blocking client owns a runtime of
//! its own.

use std::time::Duration;

use reqwest::blocking::Client;

use super::{HttpMethod, OutboundRequest, Transport, TransportResponse, TransportResult};
use crate::config::HttpConfig;
use crate::error::{Result, TransportError};

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a client with the configured timeouts
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Connect` if the TLS backend cannot be
    /// initialised.
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("plurfeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Connect(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_decode() || error.is_body() {
        TransportError::Decode(error.to_string())
    } else {
        TransportError::Connect(error.to_string())
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: OutboundRequest) -> TransportResult<TransportResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(map_reqwest_error)?;

        Ok(TransportResponse { status, body })
    }
}
