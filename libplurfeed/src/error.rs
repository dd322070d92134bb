//! Error types for Plurfeed

use std::any::Any;

use thiserror::Error;

use crate::types::PlatformId;

pub type Result<T> = std::result::Result<T, PlurfeedError>;

#[derive(Error, Debug)]
pub enum PlurfeedError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Adapter-local transport or protocol failures
///
/// Invalid credentials, rejected posts and unsupported interactions are not
/// errors; adapters report those as a `false` result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Posting failed: {0}")]
    Post(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Interaction failed: {0}")]
    Interaction(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No adapter is registered for the platform. Engine operations report
    /// this through the diagnostic channel; it never crosses the engine
    /// boundary as a returned error.
    #[error("No adapter registered for platform {0}")]
    UnregisteredPlatform(PlatformId),

    #[error("Adapter for {adapter} cannot be registered under {key}")]
    PlatformMismatch { key: PlatformId, adapter: PlatformId },
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential not found: {0}")]
    NotFound(String),

    #[error("Credential backend error: {0}")]
    Backend(String),

    #[error("OS keyring unavailable: {0}")]
    KeyringUnavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Unexpected HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Failures of the dispatch mechanism itself
///
/// These are distinct from operation-level failures, which engine
/// operations fold into their ordinary return values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("No async runtime available to run the worker pool")]
    NoRuntime,

    #[error("Worker pool is closed")]
    PoolClosed,

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Result was dropped before delivery")]
    ResultDropped,

    #[error("Completion queue is gone; callback could not be delivered")]
    CallbackUndeliverable,
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_formatting_adapter() {
        let error = PlurfeedError::Adapter(AdapterError::Fetch("connection reset".to_string()));
        assert_eq!(
            format!("{}", error),
            "Adapter error: Fetch failed: connection reset"
        );
    }

    #[test]
    fn test_adapter_error_variants() {
        let fetch = AdapterError::Fetch("a".to_string());
        assert_eq!(format!("{}", fetch), "Fetch failed: a");

        let post = AdapterError::Post("b".to_string());
        assert_eq!(format!("{}", post), "Posting failed: b");

        let auth = AdapterError::Auth("c".to_string());
        assert_eq!(format!("{}", auth), "Authentication failed: c");

        let interaction = AdapterError::Interaction("d".to_string());
        assert_eq!(format!("{}", interaction), "Interaction failed: d");
    }

    #[test]
    fn test_unregistered_platform_names_the_platform() {
        let error = EngineError::UnregisteredPlatform(PlatformId::Bluesky);
        assert_eq!(
            format!("{}", error),
            "No adapter registered for platform bluesky"
        );
    }

    #[test]
    fn test_error_conversion_from_adapter_error() {
        let error: PlurfeedError = AdapterError::Post("test".to_string()).into();
        assert!(matches!(error, PlurfeedError::Adapter(AdapterError::Post(_))));
    }

    #[test]
    fn test_error_conversion_from_dispatch_error() {
        let error: PlurfeedError = DispatchError::PoolClosed.into();
        assert_eq!(format!("{}", error), "Dispatch error: Worker pool is closed");
    }

    #[test]
    fn test_config_error_invalid_formatting() {
        let error = ConfigError::Invalid {
            field: "dispatch.workers".to_string(),
            reason: "must be at least 1".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Invalid value for dispatch.workers: must be at least 1"
        );
    }

    #[test]
    fn test_transport_status_formatting() {
        let error = TransportError::Status {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Unexpected HTTP status 503: Service Unavailable"
        );
    }

    #[test]
    fn test_panic_message_extracts_str_and_string() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(boxed.as_ref()), "static message");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(boxed.as_ref()), "owned message");

        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }
}
