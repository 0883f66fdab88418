//! # Identity (TS-01)
//!
//! Derives the signing identity used to author every message broadcast to the
//! twentysix index.
//!
//! ## Architecture
//!
//! Pure domain crate, no I/O:
//! - **`domain::keys`**: private key parsing, Ethereum-style address derivation
//! - **`domain::hdwallet`**: BIP-39 mnemonic to seed, BIP-32 child derivation
//! - **`domain::entities`**: `Identity`, account argument/state records
//!
//! ## Security Notes
//!
//! - Secret bytes live in zeroize-on-drop buffers
//! - `Debug` output never contains the private key
//! - Derivation is deterministic: the same secret always yields the same address

pub mod domain;

pub use domain::entities::{AccountArgs, AccountState, DerivationPath, Identity};
pub use domain::errors::IdentityError;
pub use domain::keys::{checksum_address, keccak256};

/// Default BIP-44 path for the first Ethereum account.
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

/// Derive an identity from either a hex private key or a mnemonic.
///
/// The private key takes precedence when both are supplied. When a mnemonic is
/// used, `derivation_path` defaults to [`DEFAULT_DERIVATION_PATH`].
pub fn derive_identity(args: &AccountArgs) -> Result<Identity, IdentityError> {
    if let Some(key) = args.private_key.as_deref().filter(|k| !k.trim().is_empty()) {
        return Identity::from_private_key_hex(key);
    }

    if let Some(phrase) = args.mnemonic.as_deref().filter(|m| !m.trim().is_empty()) {
        let path = match args.derivation_path.as_deref() {
            Some(p) if !p.trim().is_empty() => p.parse::<DerivationPath>()?,
            _ => DerivationPath::default(),
        };
        return Identity::from_mnemonic(phrase, &path);
    }

    Err(IdentityError::MissingSecret)
}
