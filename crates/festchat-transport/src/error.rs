//! Transport errors.

use thiserror::Error;

/// Errors surfaced by the chat transport.
///
/// None of these are fatal to the host application: by the time an error
/// is returned, the in-progress message has already been finalized.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connect, status, or body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// No done/error signal arrived before the stream deadline.
    #[error("Stream timed out")]
    Timeout,

    /// Outgoing message was empty after trimming.
    #[error("Message is empty")]
    EmptyMessage,

    /// Payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
