//! # Messages (TS-02)
//!
//! The signed, content-addressed message that represents every resource on
//! the twentysix index.
//!
//! ## Architecture
//!
//! - **`domain::entities`**: envelope and shared enumerations
//! - **`domain::content`**: per-kind payloads (store, forget, instance, program)
//! - **`domain::hashing`**: canonical bytes and SHA-256 item hashes
//! - **`domain::signing`**: Ethereum text-hash signatures with `v + 27`
//! - **`service`**: `MessageSender`, payload to signed envelope
//!
//! ## Invariants
//!
//! - `item_hash == hex(sha256(item_content))`
//! - Signatures are 65 bytes and their last byte is 27 or 28

pub mod domain;
pub mod service;

pub use domain::content::*;
pub use domain::entities::{
    Chain, ItemType, Message, MessageConfirmation, MessageStatus, MessageType,
};
pub use domain::errors::MessageError;
pub use domain::hashing::{build_content_hash, content_hash, is_item_hash, now_seconds};
pub use domain::signing::{recover_signer, sign_message, verify_signature};
pub use service::MessageSender;

#[cfg(test)]
mod tests {
    use super::*;
    use ts_01_identity::Identity;

    const HARDHAT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_reparsed_message_rehashes_identically() {
        let sender = MessageSender::new(Identity::from_private_key_hex(HARDHAT_KEY).unwrap(), "TEST");
        let message = sender.forget(vec!["ab".repeat(32)], Some("cleanup".into())).unwrap();

        let wire = serde_json::to_string(&message).unwrap();
        let parsed: Message = serde_json::from_str(&wire).unwrap();

        assert_eq!(parsed, message);
        parsed.verify_item_hash().unwrap();
        verify_signature(&parsed).unwrap();
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeMap;

        proptest! {
            #[test]
            fn item_hash_is_stable_across_reserialization(
                vars in proptest::collection::btree_map("[A-Z_]{1,8}", "[ -~]{0,16}", 0..6),
                millis in 0u64..4_000_000_000_000u64,
            ) {
                let time = millis as f64 / 1000.0;
                let payload: BTreeMap<String, String> = vars;

                let first = build_content_hash(&(time, &payload)).unwrap();
                let bytes = serde_json::to_vec(&(time, &payload)).unwrap();
                let reparsed: (f64, BTreeMap<String, String>) = serde_json::from_slice(&bytes).unwrap();
                let second = build_content_hash(&reparsed).unwrap();

                prop_assert_eq!(&first, &second);
                prop_assert!(is_item_hash(&first));
            }
        }
    }
}
