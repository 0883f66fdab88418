//! # Message Errors
//!
//! Error types for building, hashing and signing messages.

use thiserror::Error;

/// Errors raised by the message model.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The identity could not produce a signature
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Payload could not be serialized or parsed
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Signature is not 65 bytes of `0x` hex
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Recovery byte is not 0, 1, 27 or 28
    #[error("Invalid recovery ID: {0}")]
    InvalidRecoveryId(u8),

    /// Public key recovery failed
    #[error("Failed to recover public key")]
    RecoveryFailed,

    /// Recovered signer does not match the declared sender
    #[error("Signer mismatch: expected {expected}, got {actual}")]
    SignerMismatch {
        /// Declared sender
        expected: String,
        /// Recovered address
        actual: String,
    },

    /// `item_hash` is not the SHA-256 of `item_content`
    #[error("Item hash mismatch: declared {declared}, computed {computed}")]
    ItemHashMismatch {
        /// Hash carried by the envelope
        declared: String,
        /// Hash of the carried content
        computed: String,
    },

    /// Envelope has no inline content
    #[error("Message has no inline item content")]
    MissingItemContent,
}
