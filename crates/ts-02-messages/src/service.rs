//! # Message Sender
//!
//! Turns payloads into signed envelopes for one identity on one channel.

use crate::domain::content::{ForgetContent, StoreContent};
use crate::domain::entities::{Chain, ItemType, Message, MessageType};
use crate::domain::errors::MessageError;
use crate::domain::hashing::{canonical_bytes, content_hash, now_seconds};
use crate::domain::signing::sign_message;
use serde::Serialize;
use tracing::debug;
use ts_01_identity::Identity;

/// Builds signed messages authored by `identity`.
#[derive(Clone, Debug)]
pub struct MessageSender {
    identity: Identity,
    chain: Chain,
    channel: String,
}

impl MessageSender {
    /// Sender on the Ethereum chain.
    pub fn new(identity: Identity, channel: impl Into<String>) -> Self {
        Self {
            identity,
            chain: Chain::Ethereum,
            channel: channel.into(),
        }
    }

    /// Address every message is sent from.
    pub fn address(&self) -> &str {
        self.identity.address()
    }

    /// Channel every message is posted on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Chain whose signature scheme signs the messages.
    pub fn chain(&self) -> Chain {
        self.chain
    }

    /// Serialize `payload`, hash it, stamp the envelope with `time` and sign.
    ///
    /// `time` should be the same value the payload carries.
    pub fn build<T: Serialize>(
        &self,
        message_type: MessageType,
        payload: &T,
        time: f64,
    ) -> Result<Message, MessageError> {
        let bytes = canonical_bytes(payload)?;
        let item_hash = content_hash(&bytes);
        let item_content = String::from_utf8(bytes)
            .map_err(|e| MessageError::Signing(format!("payload is not UTF-8: {e}")))?;

        let mut message = Message {
            message_type,
            chain: self.chain,
            sender: self.identity.address().to_string(),
            time,
            channel: self.channel.clone(),
            signature: String::new(),
            item_hash,
            item_type: ItemType::Inline,
            item_content: Some(item_content),
            confirmations: None,
            confirmed: None,
        };
        message.signature = sign_message(&message, self.identity.signing_key())?;

        debug!(
            message_type = %message.message_type,
            item_hash = %message.item_hash,
            channel = %message.channel,
            "Signed message"
        );

        Ok(message)
    }

    /// STORE message describing uploaded bytes whose hash is `file_hash`.
    pub fn store(&self, file_hash: &str, item_type: ItemType) -> Result<Message, MessageError> {
        let time = now_seconds();
        let content = StoreContent {
            address: self.address().to_string(),
            time,
            item_type,
            item_hash: file_hash.to_string(),
            reference: None,
        };
        self.build(MessageType::Store, &content, time)
    }

    /// FORGET message tombstoning `hashes`.
    pub fn forget(
        &self,
        hashes: Vec<String>,
        reason: Option<String>,
    ) -> Result<Message, MessageError> {
        let time = now_seconds();
        let content = ForgetContent {
            address: self.address().to_string(),
            time,
            hashes,
            reason,
        };
        self.build(MessageType::Forget, &content, time)
    }
}
