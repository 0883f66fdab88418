//! # Identity Errors
//!
//! Error types for identity derivation.

use thiserror::Error;

/// Errors that can occur while deriving a signing identity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The private key is not hex, or not a valid secp256k1 scalar
    #[error("Invalid private key format: {0}")]
    InvalidKeyFormat(String),

    /// The mnemonic has an unknown word or fails its checksum
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Neither a private key nor a mnemonic was supplied
    #[error("No private key or mnemonic provided")]
    MissingSecret,

    /// The derivation path does not parse as `m/a'/b/...`
    #[error("Invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    /// A child key fell outside the curve order (BIP-32: skip to next index)
    #[error("Key derivation failed at index {0}")]
    DerivationFailed(u32),
}
