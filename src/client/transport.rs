// src/client/transport.rs

//! The seam between the correlation engine and whatever carries the bytes.

use crate::core::ClientError;

/// Outbound half of a connection.
///
/// Implementations must not block: `send_text` queues the frame and returns.
/// Inbound traffic flows the other way, through the `Client` callbacks
/// (`on_session_established`, `on_message_received`, `on_error`, `on_closed`).
pub trait Transport: Send + Sync {
    /// Queues one complete text frame for delivery.
    fn send_text(&self, frame: String) -> Result<(), ClientError>;

    /// Whether the underlying connection can still accept frames.
    fn is_open(&self) -> bool;
}
