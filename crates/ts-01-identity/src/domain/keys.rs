//! # Key Handling (secp256k1)
//!
//! Private key parsing and Ethereum-style address derivation.
//!
//! ## Notes
//!
//! - Address = last 20 bytes of keccak256(uncompressed pubkey without 0x04)
//! - Addresses are rendered with the EIP-55 mixed-case checksum
//! - Uses k256 for all curve operations

use super::errors::IdentityError;
use k256::ecdsa::{SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use zeroize::Zeroizing;

/// Raw 20-byte account address.
pub type AddressBytes = [u8; 20];

/// Keccak256 hash function.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Parse a hex private key, with or without `0x` prefix.
///
/// Fails with `InvalidKeyFormat` when the input is not 32 bytes of hex or is
/// not a valid scalar (zero, or >= curve order).
pub fn parse_private_key(input: &str) -> Result<SigningKey, IdentityError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let bytes = Zeroizing::new(
        hex::decode(digits).map_err(|e| IdentityError::InvalidKeyFormat(e.to_string()))?,
    );

    if bytes.len() != 32 {
        return Err(IdentityError::InvalidKeyFormat(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }

    SigningKey::from_slice(&bytes)
        .map_err(|_| IdentityError::InvalidKeyFormat("not a valid secp256k1 scalar".into()))
}

/// Derive the raw address from a public key.
pub fn address_from_pubkey(public_key: &VerifyingKey) -> AddressBytes {
    let encoded = public_key.to_encoded_point(false);

    // Skip the 0x04 prefix
    let hash = keccak256(&encoded.as_bytes()[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Render an address with the EIP-55 checksum casing.
pub fn checksum_address(address: &AddressBytes) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `0x04`-prefixed uncompressed SEC1 public key, hex encoded.
pub fn public_key_hex(public_key: &VerifyingKey) -> String {
    format!("0x{}", hex::encode(public_key.to_encoded_point(false).as_bytes()))
}
