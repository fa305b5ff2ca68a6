//! Error Types and Handling
//!
//! Defines the error types used throughout the bridge. Protocol and upstream
//! failures are non-fatal by design: handlers translate them into typed DTC
//! reject messages, periodic loops log and restart.

use thiserror::Error;

/// Main error type for the bridge library
///
/// Carries enough structure for callers to distinguish exchange-reported
/// errors (which become reject texts on the wire) from transport failures
/// (which trigger reconnects or connection teardown).
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Malformed DTC frame: bad length field or truncated header
    #[error("Codec error: {0}")]
    Codec(String),

    /// Well-formed frame whose payload does not decode as the claimed type
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Error message reported by the Bittrex API itself
    #[error("Bittrex error: {0}")]
    Exchange(String),

    /// Transport-level failure talking to the REST API
    #[error("REST transport error: {0}")]
    Rest(String),

    /// Upstream WebSocket failure (triggers supervisor reconnect)
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Historical tick store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Socket-level I/O failure on a client connection
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BridgeError::Rest("request timed out".to_string())
        } else if err.is_connect() {
            BridgeError::Rest("failed to connect to Bittrex API".to_string())
        } else if let Some(status) = err.status() {
            BridgeError::Rest(format!("HTTP {}", status.as_u16()))
        } else {
            BridgeError::Rest(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Protocol(format!("JSON decode failed: {}", err))
    }
}

impl From<prost::DecodeError> for BridgeError {
    fn from(err: prost::DecodeError) -> Self {
        BridgeError::Protocol(format!("protobuf decode failed: {}", err))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BridgeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        BridgeError::WebSocket(err.to_string())
    }
}
