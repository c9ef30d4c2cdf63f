// src/core/errors.rs

//! Defines the primary error type for the client.

use std::sync::Arc;
use thiserror::Error;

/// Failures that can surface from the send path and the transport driver.
///
/// Malformed or unexpected *inbound* messages never produce an error; they are
/// dropped and logged. Only outbound and connection-level problems end up here.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("Transport is closed")]
    TransportClosed,
}

// Manual implementation of Clone because `std::io::Error` is not cloneable.
impl Clone for ClientError {
    fn clone(&self) -> Self {
        match self {
            ClientError::Io(e) => ClientError::Io(Arc::clone(e)),
            ClientError::WebSocket(s) => ClientError::WebSocket(s.clone()),
            ClientError::InvalidEndpoint(s) => ClientError::InvalidEndpoint(s.clone()),
            ClientError::InvalidConfig(s) => ClientError::InvalidConfig(s.clone()),
            ClientError::ConnectTimeout(s) => ClientError::ConnectTimeout(s.clone()),
            ClientError::TransportClosed => ClientError::TransportClosed,
        }
    }
}

impl PartialEq for ClientError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ClientError::Io(a), ClientError::Io(b)) => a.kind() == b.kind(),
            (ClientError::WebSocket(a), ClientError::WebSocket(b)) => a == b,
            (ClientError::InvalidEndpoint(a), ClientError::InvalidEndpoint(b)) => a == b,
            (ClientError::InvalidConfig(a), ClientError::InvalidConfig(b)) => a == b,
            (ClientError::ConnectTimeout(a), ClientError::ConnectTimeout(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Io(Arc::new(e))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match e {
            WsError::Io(io) => ClientError::Io(Arc::new(io)),
            WsError::ConnectionClosed | WsError::AlreadyClosed => ClientError::TransportClosed,
            WsError::Url(url_err) => ClientError::InvalidEndpoint(url_err.to_string()),
            other => ClientError::WebSocket(other.to_string()),
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        ClientError::InvalidEndpoint(e.to_string())
    }
}
