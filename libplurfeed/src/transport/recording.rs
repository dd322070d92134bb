//! In-memory transport for tests
//!
//! Records every request it is given and answers from a responder closure,
//! so adapter behaviour can be checked without network access.

use std::sync::{Mutex, PoisonError};

use super::{OutboundRequest, Transport, TransportResponse, TransportResult};

type Responder = Box<dyn Fn(&OutboundRequest) -> TransportResult<TransportResponse> + Send + Sync>;

pub struct RecordingTransport {
    requests: Mutex<Vec<OutboundRequest>>,
    responder: Responder,
}

impl RecordingTransport {
    /// Answers every request with `200 []`
    pub fn new() -> Self {
        Self::with_responder(|_| Ok(TransportResponse::new(200, "[]")))
    }

    /// Answers every request with the result of `responder`
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&OutboundRequest) -> TransportResult<TransportResponse> + Send + Sync + 'static,
    {
        Self {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    /// Every request sent so far, in order
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests whose destination host equals `host`
    pub fn requests_to(&self, host: &str) -> Vec<OutboundRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.host_str() == Some(host))
            .collect()
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: OutboundRequest) -> TransportResult<TransportResponse> {
        let response = (self.responder)(&request);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        response
    }
}
