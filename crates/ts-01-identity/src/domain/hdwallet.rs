//! # HD Wallet Derivation
//!
//! BIP-39 mnemonic validation and seed generation, followed by BIP-32
//! private child key derivation along a `DerivationPath`.

use super::entities::DerivationPath;
use super::errors::IdentityError;
use bip39::{Language, Mnemonic};
use hmac::{Hmac, Mac};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, Scalar};
use sha2::Sha512;
use zeroize::Zeroizing;

type HmacSha512 = Hmac<Sha512>;

/// Hardened index offset (2^31).
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Extended private key: signing key plus chain code.
struct ExtendedKey {
    key: SigningKey,
    chain_code: Zeroizing<[u8; 32]>,
}

/// Validate a mnemonic and turn it into a 64-byte seed (empty passphrase).
pub fn seed_from_mnemonic(phrase: &str) -> Result<Zeroizing<[u8; 64]>, IdentityError> {
    let normalized = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|e| IdentityError::InvalidMnemonic(e.to_string()))?;
    Ok(Zeroizing::new(mnemonic.to_seed("")))
}

/// Derive the signing key at `path` from a BIP-39 seed.
pub fn derive_signing_key(seed: &[u8], path: &DerivationPath) -> Result<SigningKey, IdentityError> {
    let mut node = master_key(seed)?;
    for &index in path.indices() {
        node = derive_child(&node, index)?;
    }
    Ok(node.key)
}

fn master_key(seed: &[u8]) -> Result<ExtendedKey, IdentityError> {
    let digest = hmac_sha512(b"Bitcoin seed", &[seed])?;
    split_digest(&digest, None, 0)
}

fn derive_child(parent: &ExtendedKey, index: u32) -> Result<ExtendedKey, IdentityError> {
    let index_bytes = index.to_be_bytes();

    let digest = if index >= HARDENED_OFFSET {
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&parent.key.to_bytes());
        hmac_sha512(
            &parent.chain_code[..],
            &[&[0u8][..], &secret[..], &index_bytes[..]],
        )?
    } else {
        let public = parent.key.verifying_key().to_encoded_point(true);
        hmac_sha512(&parent.chain_code[..], &[public.as_bytes(), &index_bytes[..]])?
    };

    split_digest(&digest, Some(&parent.key), index)
}

/// Split an HMAC-SHA512 digest into (IL, IR). IL is added to the parent
/// scalar when one is given, per BIP-32 CKDpriv.
fn split_digest(
    digest: &[u8; 64],
    parent: Option<&SigningKey>,
    index: u32,
) -> Result<ExtendedKey, IdentityError> {
    let il = FieldBytes::clone_from_slice(&digest[..32]);
    let tweak: Option<Scalar> = Scalar::from_repr(il).into();
    let tweak = tweak.ok_or(IdentityError::DerivationFailed(index))?;

    let scalar = match parent {
        Some(key) => tweak + **key.as_nonzero_scalar(),
        None => tweak,
    };

    let key = SigningKey::from_bytes(&scalar.to_repr())
        .map_err(|_| IdentityError::DerivationFailed(index))?;

    let mut chain_code = Zeroizing::new([0u8; 32]);
    chain_code.copy_from_slice(&digest[32..]);

    Ok(ExtendedKey { key, chain_code })
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> Result<Zeroizing<[u8; 64]>, IdentityError> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| IdentityError::InvalidKeyFormat(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}
