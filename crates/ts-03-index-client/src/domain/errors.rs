//! # Client Errors
//!
//! Every index and scheduler call returns a `ClientError`. Callers decide
//! whether to retry with [`ClientError::is_transient`].

use thiserror::Error;
use ts_02_messages::MessageError;

/// Errors raised by the index client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, DNS or TLS failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http {
        /// Status code
        status: u16,
        /// Response body, lossily decoded
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// File upload failed
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Zero or several records matched a single-hash lookup
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// The index refused a broadcast
    #[error("Broadcast rejected: {0}")]
    BroadcastRejected(String),

    /// Building or signing the outgoing message failed
    #[error(transparent)]
    Message(#[from] MessageError),
}

impl ClientError {
    /// Whether repeating the same request may succeed.
    ///
    /// Transport failures, timeouts, 5xx and 429 are transient. Other 4xx,
    /// malformed bodies and rejections are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Whether the error means the looked-up message does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::MessageNotFound(_))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidResponse(e.to_string())
    }
}
