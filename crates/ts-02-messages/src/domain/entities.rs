//! # Domain Entities
//!
//! The message envelope and the enumerations shared by every payload.

use super::errors::MessageError;
use super::hashing::content_hash;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    /// Content storage reference.
    Store,
    /// Tombstone for earlier messages.
    Forget,
    /// Persistent virtual machine.
    Instance,
    /// Serverless function.
    Program,
    /// Key/value aggregate.
    Aggregate,
    /// Free-form post.
    Post,
}

impl MessageType {
    /// Wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "STORE",
            Self::Forget => "FORGET",
            Self::Instance => "INSTANCE",
            Self::Program => "PROGRAM",
            Self::Aggregate => "AGGREGATE",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the message payload lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Carried in `item_content`.
    #[default]
    Inline,
    /// Native storage engine.
    Storage,
    /// IPFS.
    Ipfs,
}

/// Processing status reported by the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Accepted, not yet processed.
    Pending,
    /// Processed and visible.
    Processed,
    /// Refused by the index.
    Rejected,
    /// Tombstoned by a FORGET message.
    Forgotten,
    /// Any status this client does not model.
    #[serde(other)]
    Unknown,
}

/// Signing chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chain {
    /// Ethereum-style secp256k1 signatures.
    #[default]
    #[serde(rename = "ETH")]
    Ethereum,
    /// A chain this client cannot sign for.
    #[serde(other)]
    Other,
}

impl Chain {
    /// Wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ethereum => "ETH",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-chain attestation attached to a message by the index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageConfirmation {
    /// Chain the message was anchored on.
    pub chain: Chain,
    /// Anchoring transaction hash.
    pub hash: String,
    /// Block height.
    pub height: u64,
}

/// The signed message envelope.
///
/// Field order is the order of the broadcast JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message kind.
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Signing chain.
    pub chain: Chain,
    /// Author address.
    pub sender: String,
    /// Seconds since epoch.
    pub time: f64,
    /// Logical namespace.
    pub channel: String,
    /// `0x`-prefixed 65-byte recoverable signature.
    pub signature: String,
    /// SHA-256 of `item_content`, lowercase hex.
    pub item_hash: String,
    /// Payload location.
    pub item_type: ItemType,
    /// Serialized payload for inline messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_content: Option<String>,
    /// Confirmations, only present on records read back from the index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<Vec<MessageConfirmation>>,
    /// Confirmation flag, only present on records read back from the index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<bool>,
}

impl Message {
    /// Whether the index reports this message as confirmed.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed.unwrap_or(false)
    }

    /// Check that `item_hash` is the hash of `item_content`.
    pub fn verify_item_hash(&self) -> Result<(), MessageError> {
        let content = self
            .item_content
            .as_deref()
            .ok_or(MessageError::MissingItemContent)?;

        let computed = content_hash(content.as_bytes());
        if computed != self.item_hash {
            return Err(MessageError::ItemHashMismatch {
                declared: self.item_hash.clone(),
                computed,
            });
        }
        Ok(())
    }

    /// Parse the inline payload.
    pub fn content<T: DeserializeOwned>(&self) -> Result<T, MessageError> {
        let content = self
            .item_content
            .as_deref()
            .ok_or(MessageError::MissingItemContent)?;
        Ok(serde_json::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_spellings() {
        assert_eq!(serde_json::to_string(&MessageType::Program).unwrap(), "\"PROGRAM\"");
        assert_eq!(serde_json::to_string(&ItemType::Storage).unwrap(), "\"storage\"");
        assert_eq!(serde_json::to_string(&Chain::Ethereum).unwrap(), "\"ETH\"");
        assert_eq!(
            serde_json::from_str::<MessageStatus>("\"forgotten\"").unwrap(),
            MessageStatus::Forgotten
        );
    }

    #[test]
    fn test_unknown_values_do_not_break_parsing() {
        assert_eq!(
            serde_json::from_str::<MessageStatus>("\"removing\"").unwrap(),
            MessageStatus::Unknown
        );
        assert_eq!(serde_json::from_str::<Chain>("\"SOL\"").unwrap(), Chain::Other);
    }

    #[test]
    fn test_index_record_parses_with_extra_fields() {
        let raw = r#"{
            "type": "STORE",
            "chain": "ETH",
            "sender": "0xabc",
            "time": 1700000000.25,
            "channel": "TEST",
            "signature": "0x00",
            "item_hash": "aa",
            "item_type": "inline",
            "item_content": "{}",
            "confirmations": [{"chain": "ETH", "hash": "0xdead", "height": 42}],
            "confirmed": true,
            "size": 2,
            "content": {}
        }"#;

        let message: Message = serde_json::from_str(raw).unwrap();
        assert!(message.is_confirmed());
        assert_eq!(message.confirmations.unwrap()[0].height, 42);
    }

    #[test]
    fn test_broadcast_form_omits_index_fields() {
        let message = Message {
            message_type: MessageType::Forget,
            chain: Chain::Ethereum,
            sender: "0xabc".into(),
            time: 1.5,
            channel: "TEST".into(),
            signature: "0x00".into(),
            item_hash: "aa".into(),
            item_type: ItemType::Inline,
            item_content: Some("{}".into()),
            confirmations: None,
            confirmed: None,
        };

        let json = serde_json::to_string(&message).unwrap();
        assert!(json.starts_with(r#"{"type":"FORGET","chain":"ETH","sender":"0xabc""#));
        assert!(!json.contains("confirm"));
    }

    #[test]
    fn test_missing_content() {
        let message: Message = serde_json::from_str(
            r#"{"type":"STORE","chain":"ETH","sender":"s","time":1,"channel":"c",
                "signature":"0x","item_hash":"h","item_type":"storage"}"#,
        )
        .unwrap();
        assert!(matches!(
            message.verify_item_hash(),
            Err(MessageError::MissingItemContent)
        ));
    }
}
