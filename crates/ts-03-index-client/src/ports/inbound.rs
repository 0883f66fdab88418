//! # Inbound Ports
//!
//! API trait defining what the index client can do.

use crate::domain::{
    BroadcastResponse, ClientError, MessageFilter, SchedulerAllocation, UploadResponse,
};
use async_trait::async_trait;
use ts_02_messages::{Message, MessageSender};

/// Message index API - inbound port.
///
/// Every method makes a single attempt. Retrying is the caller's job.
#[async_trait]
pub trait MessageIndexApi: Send + Sync {
    /// Send a signed message. Acceptance is reported, not enforced.
    async fn broadcast(&self, message: &Message) -> Result<BroadcastResponse, ClientError>;

    /// Upload `bytes` along with the signed STORE `metadata` message.
    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        metadata: &Message,
    ) -> Result<UploadResponse, ClientError>;

    /// One page of messages matching `filter`, plus the count left after it.
    async fn query_messages(
        &self,
        filter: &MessageFilter,
        page: u64,
        size: u64,
    ) -> Result<(Vec<Message>, u64), ClientError>;

    /// The single message with `hash`. Zero or several matches is
    /// `MessageNotFound`.
    async fn get_message_by_hash(&self, hash: &str) -> Result<Message, ClientError>;

    /// Scheduler placement of a VM, `None` while not scheduled.
    async fn allocation_state(
        &self,
        vm_hash: &str,
    ) -> Result<Option<SchedulerAllocation>, ClientError>;

    /// Build, sign and broadcast a FORGET for `target_hash`.
    async fn forget_message(
        &self,
        sender: &MessageSender,
        target_hash: &str,
    ) -> Result<BroadcastResponse, ClientError>;

    /// A STORE message sent by `address` on `channel` whose payload
    /// references `file_hash`.
    ///
    /// When several match, the one whose item hash is `preferred` wins over
    /// the others; otherwise the first match is returned.
    async fn find_store_message(
        &self,
        address: &str,
        channel: &str,
        file_hash: &str,
        preferred: &str,
    ) -> Result<Option<Message>, ClientError>;
}
