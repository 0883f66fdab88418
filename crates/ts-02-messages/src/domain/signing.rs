//! # Message Signing (secp256k1, Ethereum text hash)
//!
//! The signed payload is `chain \n sender \n type \n item_hash`, hashed as
//! an Ethereum personal message:
//!
//! ```text
//! keccak256("\x19Ethereum Signed Message:\n" || len(payload) || payload)
//! ```
//!
//! The signature is `r || s || v` (65 bytes) with `v = recovery_id + 27`,
//! rendered as `0x`-prefixed hex.

use super::entities::Message;
use super::errors::MessageError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use ts_01_identity::domain::keys::address_from_pubkey;
use ts_01_identity::{checksum_address, keccak256};

/// Length of a recoverable signature: r (32) || s (32) || v (1).
pub const SIGNATURE_LEN: usize = 65;

/// Offset added to the recovery id.
pub const RECOVERY_ID_OFFSET: u8 = 27;

const TEXT_HASH_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// The bytes covered by a message signature.
pub fn verification_payload(message: &Message) -> Vec<u8> {
    format!(
        "{}\n{}\n{}\n{}",
        message.chain, message.sender, message.message_type, message.item_hash
    )
    .into_bytes()
}

/// Ethereum personal-message hash of `payload`.
pub fn eth_text_hash(payload: &[u8]) -> [u8; 32] {
    let mut data = Vec::with_capacity(TEXT_HASH_PREFIX.len() + 20 + payload.len());
    data.extend_from_slice(TEXT_HASH_PREFIX.as_bytes());
    data.extend_from_slice(payload.len().to_string().as_bytes());
    data.extend_from_slice(payload);
    keccak256(&data)
}

/// Sign `message` and return the `0x`-prefixed 65-byte signature.
pub fn sign_message(message: &Message, key: &SigningKey) -> Result<String, MessageError> {
    let digest = eth_text_hash(&verification_payload(message));

    let (mut signature, mut recovery_id) = key
        .sign_prehash_recoverable(&digest)
        .map_err(|e| MessageError::Signing(e.to_string()))?;

    // Low-S form, flipping the y parity to match
    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let mut bytes = [0u8; SIGNATURE_LEN];
    bytes[..64].copy_from_slice(&signature.to_bytes());
    bytes[64] = recovery_id.to_byte() + RECOVERY_ID_OFFSET;

    Ok(format!("0x{}", hex::encode(bytes)))
}

/// Recover the checksummed address that produced `message.signature`.
pub fn recover_signer(message: &Message) -> Result<String, MessageError> {
    let digits = message
        .signature
        .strip_prefix("0x")
        .unwrap_or(&message.signature);
    let bytes = hex::decode(digits).map_err(|_| MessageError::InvalidSignatureFormat)?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(MessageError::InvalidSignatureFormat);
    }

    let recovery_id = parse_recovery_id(bytes[64])?;
    let signature =
        Signature::from_slice(&bytes[..64]).map_err(|_| MessageError::InvalidSignatureFormat)?;

    let digest = eth_text_hash(&verification_payload(message));
    let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|_| MessageError::RecoveryFailed)?;

    Ok(checksum_address(&address_from_pubkey(&key)))
}

/// Check that the signature was produced by `message.sender`.
pub fn verify_signature(message: &Message) -> Result<(), MessageError> {
    let actual = recover_signer(message)?;
    if !actual.eq_ignore_ascii_case(&message.sender) {
        return Err(MessageError::SignerMismatch {
            expected: message.sender.clone(),
            actual,
        });
    }
    Ok(())
}

/// Valid v values: 0, 1, 27, 28
fn parse_recovery_id(v: u8) -> Result<RecoveryId, MessageError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(MessageError::InvalidRecoveryId(v)),
    };
    RecoveryId::try_from(id).map_err(|_| MessageError::InvalidRecoveryId(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Chain, ItemType, MessageType};
    use ts_01_identity::Identity;

    const HARDHAT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn unsigned(sender: &str) -> Message {
        Message {
            message_type: MessageType::Store,
            chain: Chain::Ethereum,
            sender: sender.to_string(),
            time: 1700000000.123,
            channel: "TEST".into(),
            signature: String::new(),
            item_hash: "ab".repeat(32),
            item_type: ItemType::Inline,
            item_content: Some("{}".into()),
            confirmations: None,
            confirmed: None,
        }
    }

    #[test]
    fn test_verification_payload_layout() {
        let message = unsigned("0xabc");
        let payload = String::from_utf8(verification_payload(&message)).unwrap();
        assert_eq!(payload, format!("ETH\n0xabc\nSTORE\n{}", "ab".repeat(32)));
    }

    #[test]
    fn test_text_hash_known_vector() {
        // personal_sign("hello")
        assert_eq!(
            hex::encode(eth_text_hash(b"hello")),
            "50b2c43fd39106bafbba0da34fc430e1f91e3c96ea2acee2bc34119f92b37750"
        );
    }

    #[test]
    fn test_signature_shape() {
        let identity = Identity::from_private_key_hex(HARDHAT_KEY).unwrap();
        let message = unsigned(identity.address());
        let signature = sign_message(&message, identity.signing_key()).unwrap();

        assert!(signature.starts_with("0x"));
        assert_eq!(signature.len(), 2 + SIGNATURE_LEN * 2);
        let v = u8::from_str_radix(&signature[signature.len() - 2..], 16).unwrap();
        assert!(v == 27 || v == 28);
    }

    #[test]
    fn test_sign_then_verify() {
        let identity = Identity::from_private_key_hex(HARDHAT_KEY).unwrap();
        let mut message = unsigned(identity.address());
        message.signature = sign_message(&message, identity.signing_key()).unwrap();

        assert_eq!(recover_signer(&message).unwrap(), identity.address());
        verify_signature(&message).unwrap();

        // Lowercase sender still verifies
        message.sender = message.sender.to_lowercase();
        verify_signature(&message).unwrap();
    }

    #[test]
    fn test_tampered_hash_fails_verification() {
        let identity = Identity::from_private_key_hex(HARDHAT_KEY).unwrap();
        let mut message = unsigned(identity.address());
        message.signature = sign_message(&message, identity.signing_key()).unwrap();
        message.item_hash = "cd".repeat(32);

        assert!(matches!(
            verify_signature(&message),
            Err(MessageError::SignerMismatch { .. }) | Err(MessageError::RecoveryFailed)
        ));
    }

    #[test]
    fn test_malformed_signatures() {
        let mut message = unsigned("0xabc");
        message.signature = "0x1234".into();
        assert!(matches!(
            recover_signer(&message),
            Err(MessageError::InvalidSignatureFormat)
        ));

        message.signature = format!("0x{}{}", "11".repeat(64), "05");
        assert!(matches!(
            recover_signer(&message),
            Err(MessageError::InvalidRecoveryId(5))
        ));
    }
}
