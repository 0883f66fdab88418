//! # Domain Entities
//!
//! Request and response records exchanged with the index and the scheduler.

use super::errors::ClientError;
use serde::{Deserialize, Serialize};
use ts_02_messages::{Message, MessageStatus, MessageType};

// =============================================================================
// Queries
// =============================================================================

/// Filters for `GET /api/v0/messages.json`. Empty lists are not sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageFilter {
    pub hashes: Vec<String>,
    pub addresses: Vec<String>,
    pub channels: Vec<String>,
    pub message_types: Vec<MessageType>,
}

impl MessageFilter {
    /// Filter on a single item hash.
    pub fn by_hash(hash: &str) -> Self {
        Self {
            hashes: vec![hash.to_string()],
            ..Default::default()
        }
    }

    /// Filter on messages of `message_type` sent by `address` on `channel`.
    pub fn by_sender(address: &str, channel: &str, message_type: MessageType) -> Self {
        Self {
            addresses: vec![address.to_string()],
            channels: vec![channel.to_string()],
            message_types: vec![message_type],
            ..Default::default()
        }
    }

    /// Query-string pairs, repeating a key once per value.
    pub fn to_query(&self, page: u64, size: u64) -> Vec<(String, String)> {
        let mut query = vec![
            ("page".to_string(), page.to_string()),
            ("size".to_string(), size.to_string()),
        ];
        query.extend(self.hashes.iter().map(|h| ("hashes".to_string(), h.clone())));
        query.extend(self.addresses.iter().map(|a| ("addresses".to_string(), a.clone())));
        query.extend(self.channels.iter().map(|c| ("channels".to_string(), c.clone())));
        query.extend(
            self.message_types
                .iter()
                .map(|t| ("msgTypes".to_string(), t.as_str().to_string())),
        );
        query
    }
}

/// One page of `messages.json`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub pagination_page: u64,
    #[serde(default)]
    pub pagination_per_page: u64,
    #[serde(default)]
    pub pagination_total: u64,
}

impl MessagePage {
    /// Records left after this page: `max(0, total - page * per_page)`.
    pub fn remaining(&self) -> u64 {
        self.pagination_total
            .saturating_sub(self.pagination_page.saturating_mul(self.pagination_per_page))
    }
}

// =============================================================================
// Broadcast / Upload
// =============================================================================

/// Body of `POST /api/v0/messages` and the `metadata` upload part.
#[derive(Clone, Debug, Serialize)]
pub struct BroadcastRequest<'a> {
    pub message: &'a Message,
    pub sync: bool,
}

/// Publication outcome across the index's peers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub failed: Vec<String>,
}

/// Acknowledgment of a broadcast.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResponse {
    #[serde(default)]
    pub publication_status: PublicationStatus,
    #[serde(default)]
    pub message_status: Option<MessageStatus>,
}

impl BroadcastResponse {
    /// Publication status meaning the message was relayed.
    pub const SUCCESS: &'static str = "success";

    /// Fail with `BroadcastRejected` unless the index accepted the message.
    pub fn ensure_accepted(&self) -> Result<(), ClientError> {
        if self.message_status == Some(MessageStatus::Rejected) {
            return Err(ClientError::BroadcastRejected(
                "message status is rejected".to_string(),
            ));
        }
        if self.publication_status.status != Self::SUCCESS {
            return Err(ClientError::BroadcastRejected(format!(
                "publication status {:?}, failed peers {:?}",
                self.publication_status.status, self.publication_status.failed
            )));
        }
        Ok(())
    }
}

/// Response of `POST /api/v0/storage/add_file`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    /// Content hash of the stored bytes.
    pub hash: String,
    /// Status of the metadata message sent with the file.
    #[serde(default)]
    pub status: Option<MessageStatus>,
    /// File name as stored by the index.
    #[serde(default)]
    pub name: Option<String>,
    /// Stored size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
}

impl UploadResponse {
    /// Fail with `BroadcastRejected` when the index refused the metadata
    /// message, whatever the HTTP status was.
    pub fn ensure_accepted(&self) -> Result<(), ClientError> {
        if self.status == Some(MessageStatus::Rejected) {
            return Err(ClientError::BroadcastRejected(format!(
                "upload of {} rejected",
                self.hash
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Billing window of an allocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationPeriod {
    pub start_timestamp: String,
    pub duration_seconds: f64,
}

/// Compute node hosting an allocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationNode {
    pub node_id: String,
    pub url: String,
    #[serde(default)]
    pub ipv6: Option<String>,
    #[serde(default)]
    pub supports_ipv6: bool,
}

/// Placement of a VM by the scheduler.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerAllocation {
    pub vm_hash: String,
    #[serde(default)]
    pub vm_type: String,
    #[serde(default)]
    pub vm_ipv6: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<AllocationPeriod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<AllocationNode>,
}
