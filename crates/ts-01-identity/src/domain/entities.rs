//! # Domain Entities
//!
//! The signing identity and the account records exchanged with the
//! lifecycle host.

use super::errors::IdentityError;
use super::hdwallet::{derive_signing_key, seed_from_mnemonic, HARDENED_OFFSET};
use super::keys::{address_from_pubkey, checksum_address, parse_private_key, public_key_hex, AddressBytes};
use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

// =============================================================================
// Derivation Path
// =============================================================================

/// A BIP-32 derivation path such as `m/44'/60'/0'/0/0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivationPath {
    indices: Vec<u32>,
}

impl DerivationPath {
    /// Child indices, hardened ones already offset by 2^31.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

impl Default for DerivationPath {
    fn default() -> Self {
        Self {
            indices: vec![
                44 + HARDENED_OFFSET,
                60 + HARDENED_OFFSET,
                HARDENED_OFFSET,
                0,
                0,
            ],
        }
    }
}

impl FromStr for DerivationPath {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IdentityError::InvalidDerivationPath(s.to_string());

        let mut segments = s.trim().split('/');
        if segments.next() != Some("m") {
            return Err(invalid());
        }

        let mut indices = Vec::new();
        for segment in segments {
            let (digits, hardened) = match segment
                .strip_suffix('\'')
                .or_else(|| segment.strip_suffix('h'))
            {
                Some(d) => (d, true),
                None => (segment, false),
            };

            let index: u32 = digits.parse().map_err(|_| invalid())?;
            if index >= HARDENED_OFFSET {
                return Err(invalid());
            }
            indices.push(if hardened { index + HARDENED_OFFSET } else { index });
        }

        Ok(Self { indices })
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for &index in &self.indices {
            if index >= HARDENED_OFFSET {
                write!(f, "/{}'", index - HARDENED_OFFSET)?;
            } else {
                write!(f, "/{}", index)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Identity
// =============================================================================

/// A derived signing identity.
///
/// Immutable once built. The private key is only reachable through
/// [`Identity::signing_key`] and [`Identity::private_key_hex`].
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
    address: String,
    public_key: String,
}

impl Identity {
    /// Build an identity around an existing signing key.
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        let address = checksum_address(&address_from_pubkey(verifying_key));
        let public_key = public_key_hex(verifying_key);

        Self {
            signing_key,
            address,
            public_key,
        }
    }

    /// Parse a hex private key (optional `0x` prefix).
    pub fn from_private_key_hex(private_key: &str) -> Result<Self, IdentityError> {
        parse_private_key(private_key).map(Self::from_signing_key)
    }

    /// Derive from a BIP-39 mnemonic along `path`.
    pub fn from_mnemonic(phrase: &str, path: &DerivationPath) -> Result<Self, IdentityError> {
        let seed = seed_from_mnemonic(phrase)?;
        derive_signing_key(&seed[..], path).map(Self::from_signing_key)
    }

    /// EIP-55 checksummed address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Raw address bytes.
    pub fn address_bytes(&self) -> AddressBytes {
        address_from_pubkey(self.signing_key.verifying_key())
    }

    /// `0x04`-prefixed uncompressed public key.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// The secp256k1 signing key.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// `0x`-prefixed private key, wiped when dropped.
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.signing_key.to_bytes())))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Account Records
// =============================================================================

/// Account arguments supplied by the lifecycle host.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountArgs {
    /// Hex private key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// BIP-39 mnemonic phrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    /// BIP-32 path used with `mnemonic`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation_path: Option<String>,
}

impl AccountArgs {
    /// Arguments carrying only a private key.
    pub fn from_private_key(private_key: &str) -> Self {
        Self {
            private_key: Some(private_key.to_string()),
            ..Default::default()
        }
    }

    /// Arguments carrying a mnemonic and an optional path.
    pub fn from_mnemonic(mnemonic: &str, derivation_path: Option<&str>) -> Self {
        Self {
            private_key: None,
            mnemonic: Some(mnemonic.to_string()),
            derivation_path: derivation_path.map(str::to_string),
        }
    }
}

impl fmt::Debug for AccountArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountArgs")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .field("derivation_path", &self.derivation_path)
            .finish()
    }
}

/// Account state returned to the lifecycle host after `Create`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountState {
    /// The arguments, with `private_key` filled in when derived from a mnemonic
    /// and `derivation_path` defaulted.
    #[serde(flatten)]
    pub args: AccountArgs,
    /// Checksummed address.
    pub address: String,
    /// Uncompressed public key.
    pub public_key: String,
}

impl AccountState {
    /// Record the outputs of a derived identity alongside its arguments.
    pub fn new(mut args: AccountArgs, identity: &Identity) -> Self {
        if args.mnemonic.is_some() && args.private_key.is_none() {
            args.private_key = Some(identity.private_key_hex().to_string());
            if args.derivation_path.as_deref().map_or(true, |p| p.trim().is_empty()) {
                args.derivation_path = Some(crate::DEFAULT_DERIVATION_PATH.to_string());
            }
        }

        Self {
            args,
            address: identity.address().to_string(),
            public_key: identity.public_key().to_string(),
        }
    }

    /// Rebuild the signing identity from the recorded secret.
    pub fn identity(&self) -> Result<Identity, IdentityError> {
        crate::derive_identity(&self.args)
    }
}

impl fmt::Debug for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountState")
            .field("args", &self.args)
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .finish()
    }
}
