//! # Outbound Ports
//!
//! The volume packager, plus in-memory doubles for it and for the message
//! index so reconciliation can be exercised without a network.

use crate::domain::{regular_files, ReconcileError};
use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempPath;
use ts_02_messages::{ForgetContent, Message, MessageSender, MessageStatus, MessageType};
use ts_03_index_client::{
    BroadcastResponse, ClientError, MessageFilter, MessageIndexApi, PublicationStatus,
    SchedulerAllocation, UploadResponse,
};

/// A filesystem image built from a source directory.
///
/// The image file is removed when `path` is dropped or closed.
#[derive(Debug)]
pub struct PackagedVolume {
    pub path: TempPath,
    /// Image size in bytes.
    pub size: u64,
}

/// Volume packager - outbound port.
#[async_trait]
pub trait VolumePackager: Send + Sync {
    /// Build an image of everything below `source`.
    async fn package(&self, source: &Path) -> Result<PackagedVolume, ReconcileError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Packager that concatenates the source files in path order.
///
/// The image is as large as the directory contents and changes whenever a
/// file does.
#[derive(Clone, Debug, Default)]
pub struct MockVolumePackager {
    /// Fail every call with `Packaging`.
    pub should_fail: bool,
    pub(crate) packaged: Arc<AtomicUsize>,
}

impl MockVolumePackager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of images built so far.
    pub fn packaged(&self) -> usize {
        self.packaged.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VolumePackager for MockVolumePackager {
    async fn package(&self, source: &Path) -> Result<PackagedVolume, ReconcileError> {
        if self.should_fail {
            return Err(ReconcileError::Packaging("Mock failure".to_string()));
        }

        let mut image = tempfile::NamedTempFile::new()?;
        let mut size = 0u64;
        for (_, path) in regular_files(source)? {
            let bytes = std::fs::read(&path)?;
            image.write_all(&bytes)?;
            size += bytes.len() as u64;
        }
        image.flush()?;

        self.packaged.fetch_add(1, Ordering::SeqCst);
        Ok(PackagedVolume {
            path: image.into_temp_path(),
            size,
        })
    }
}

#[derive(Debug)]
struct IndexState {
    messages: Vec<Message>,
    confirmed: HashSet<String>,
    files: HashMap<String, usize>,
    broadcasts: Vec<Message>,
    uploads: usize,
    rejecting: bool,
    schedule_after: Option<u32>,
    allocation_polls: HashMap<String, u32>,
    failing_reads: u32,
    index_lag: u32,
}

impl Default for IndexState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            confirmed: HashSet::new(),
            files: HashMap::new(),
            broadcasts: Vec::new(),
            uploads: 0,
            rejecting: false,
            schedule_after: Some(0),
            allocation_polls: HashMap::new(),
            failing_reads: 0,
            index_lag: 0,
        }
    }
}

impl IndexState {
    fn take_read_failure(&mut self) -> Result<(), ClientError> {
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(ClientError::Transport("Mock connection reset".to_string()));
        }
        Ok(())
    }

    fn forget(&mut self, hashes: &[String]) {
        self.messages.retain(|m| !hashes.contains(&m.item_hash));
    }

    fn with_confirmation(&self, message: &Message) -> Message {
        let mut message = message.clone();
        message.confirmed = Some(self.confirmed.contains(&message.item_hash));
        message
    }
}

fn matches(filter: &MessageFilter, message: &Message) -> bool {
    (filter.hashes.is_empty() || filter.hashes.contains(&message.item_hash))
        && (filter.addresses.is_empty()
            || filter
                .addresses
                .iter()
                .any(|a| a.eq_ignore_ascii_case(&message.sender)))
        && (filter.channels.is_empty() || filter.channels.contains(&message.channel))
        && (filter.message_types.is_empty() || filter.message_types.contains(&message.message_type))
}

fn accepted(status: MessageStatus) -> BroadcastResponse {
    BroadcastResponse {
        publication_status: PublicationStatus {
            status: BroadcastResponse::SUCCESS.to_string(),
            failed: Vec::new(),
        },
        message_status: Some(status),
    }
}

/// In-memory message index and scheduler.
///
/// Clones share state, so a test can keep a handle while the reconciler
/// owns another. Messages become visible as soon as they are broadcast and
/// FORGET removes its targets. VMs are scheduled on the first allocation
/// poll unless [`MockMessageIndex::schedule_after`] says otherwise.
#[derive(Clone, Debug, Default)]
pub struct MockMessageIndex {
    state: Arc<Mutex<IndexState>>,
}

impl MockMessageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report every broadcast and upload as rejected. Rejected uploads still
    /// answer like a successful HTTP call, with a `rejected` status.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.state.lock().rejecting = rejecting;
    }

    /// Number of allocation polls answered with "not scheduled" before a VM
    /// is placed. `None` never places it.
    pub fn schedule_after(&self, polls: Option<u32>) {
        self.state.lock().schedule_after = polls;
    }

    /// Fail the next `count` reads with a transient transport error.
    pub fn fail_next_reads(&self, count: u32) {
        self.state.lock().failing_reads = count;
    }

    /// Hide STORE messages from the next `lookups` store lookups.
    pub fn set_index_lag(&self, lookups: u32) {
        self.state.lock().index_lag = lookups;
    }

    /// Drop a message as if another client had forgotten it.
    pub fn forget_externally(&self, hash: &str) {
        self.state.lock().forget(&[hash.to_string()]);
    }

    /// Mark a message as confirmed on chain.
    pub fn confirm(&self, hash: &str) {
        self.state.lock().confirmed.insert(hash.to_string());
    }

    /// Add a message without counting it as a broadcast.
    pub fn insert(&self, message: Message) {
        self.state.lock().messages.push(message);
    }

    /// Every message broadcast so far, in order.
    pub fn broadcasts(&self) -> Vec<Message> {
        self.state.lock().broadcasts.clone()
    }

    pub fn broadcast_count(&self) -> usize {
        self.state.lock().broadcasts.len()
    }

    pub fn upload_count(&self) -> usize {
        self.state.lock().uploads
    }

    /// Size of the uploaded file with `hash`, if any.
    pub fn uploaded_size(&self, hash: &str) -> Option<usize> {
        self.state.lock().files.get(hash).copied()
    }

    /// Whether a message with `hash` is currently visible.
    pub fn contains(&self, hash: &str) -> bool {
        self.state
            .lock()
            .messages
            .iter()
            .any(|m| m.item_hash == hash)
    }
}

#[async_trait]
impl MessageIndexApi for MockMessageIndex {
    async fn broadcast(&self, message: &Message) -> Result<BroadcastResponse, ClientError> {
        let mut state = self.state.lock();
        state.broadcasts.push(message.clone());

        if state.rejecting {
            return Ok(accepted(MessageStatus::Rejected));
        }

        if message.message_type == MessageType::Forget {
            let content: ForgetContent = message.content()?;
            state.forget(&content.hashes);
        }
        state.messages.push(message.clone());
        Ok(accepted(MessageStatus::Pending))
    }

    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        metadata: &Message,
    ) -> Result<UploadResponse, ClientError> {
        let mut state = self.state.lock();
        state.uploads += 1;

        let hash = hex::encode(Sha256::digest(&bytes));
        let status = if state.rejecting {
            MessageStatus::Rejected
        } else {
            state.files.insert(hash.clone(), bytes.len());
            state.messages.push(metadata.clone());
            MessageStatus::Pending
        };

        Ok(UploadResponse {
            hash,
            status: Some(status),
            name: Some(filename.to_string()),
            size: Some(bytes.len() as u64),
        })
    }

    async fn query_messages(
        &self,
        filter: &MessageFilter,
        page: u64,
        size: u64,
    ) -> Result<(Vec<Message>, u64), ClientError> {
        let mut state = self.state.lock();
        state.take_read_failure()?;

        let matching: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| matches(filter, m))
            .map(|m| state.with_confirmation(m))
            .collect();

        let total = matching.len() as u64;
        let size = size.max(1);
        let skip = page.saturating_sub(1).saturating_mul(size) as usize;
        let messages = matching.into_iter().skip(skip).take(size as usize).collect();
        Ok((messages, total.saturating_sub(page.saturating_mul(size))))
    }

    async fn get_message_by_hash(&self, hash: &str) -> Result<Message, ClientError> {
        let (mut messages, _) = self
            .query_messages(&MessageFilter::by_hash(hash), 1, 2)
            .await?;
        if messages.len() != 1 {
            return Err(ClientError::MessageNotFound(hash.to_string()));
        }
        Ok(messages.remove(0))
    }

    async fn allocation_state(
        &self,
        vm_hash: &str,
    ) -> Result<Option<SchedulerAllocation>, ClientError> {
        let mut state = self.state.lock();
        state.take_read_failure()?;

        let vm_type = match state.messages.iter().find(|m| m.item_hash == vm_hash) {
            Some(m) if m.message_type == MessageType::Instance => "instance",
            Some(m) if m.message_type == MessageType::Program => "microvm",
            _ => return Ok(None),
        };

        let polls = state.allocation_polls.entry(vm_hash.to_string()).or_insert(0);
        *polls += 1;
        let polls = *polls;

        match state.schedule_after {
            Some(after) if polls > after => Ok(Some(SchedulerAllocation {
                vm_hash: vm_hash.to_string(),
                vm_type: vm_type.to_string(),
                vm_ipv6: "2001:db8::1".to_string(),
                period: None,
                node: None,
            })),
            _ => Ok(None),
        }
    }

    async fn forget_message(
        &self,
        sender: &MessageSender,
        target_hash: &str,
    ) -> Result<BroadcastResponse, ClientError> {
        let message = sender.forget(vec![target_hash.to_string()], None)?;
        self.broadcast(&message).await
    }

    async fn find_store_message(
        &self,
        address: &str,
        channel: &str,
        file_hash: &str,
        preferred: &str,
    ) -> Result<Option<Message>, ClientError> {
        {
            let mut state = self.state.lock();
            state.take_read_failure()?;
            if state.index_lag > 0 {
                state.index_lag -= 1;
                return Ok(None);
            }
        }

        let filter = MessageFilter::by_sender(address, channel, MessageType::Store);
        let (messages, _) = self.query_messages(&filter, 1, u64::MAX).await?;
        let mut matching: Vec<Message> = messages
            .into_iter()
            .filter(|m| {
                m.content::<ts_02_messages::StoreContent>()
                    .map(|c| c.item_hash == file_hash)
                    .unwrap_or(false)
            })
            .collect();
        match matching.iter().position(|m| m.item_hash == preferred) {
            Some(own) => Ok(Some(matching.swap_remove(own))),
            None => Ok(matching.into_iter().next()),
        }
    }
}
