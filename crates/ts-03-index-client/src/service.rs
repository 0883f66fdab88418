//! # Index Client Service
//!
//! Implements `MessageIndexApi` on top of any `HttpRequester`.

use crate::adapters::ReqwestRequester;
use crate::domain::{
    BroadcastRequest, BroadcastResponse, ClientError, IndexConfig, MessageFilter, MessagePage,
    SchedulerAllocation, UploadResponse,
};
use crate::ports::inbound::MessageIndexApi;
use crate::ports::outbound::{HttpRequester, MultipartPart};
use async_trait::async_trait;
use tracing::{debug, info, warn};
use ts_02_messages::{Message, MessageSender, MessageType, StoreContent};

const MESSAGES_PATH: &str = "/api/v0/messages";
const MESSAGES_QUERY_PATH: &str = "/api/v0/messages.json";
const ADD_FILE_PATH: &str = "/api/v0/storage/add_file";
const ALLOCATION_PATH: &str = "/api/v0/allocation";

/// Client for the message index and the scheduler.
///
/// Holds no identity: signing happens in [`MessageSender`]. Safe to share
/// between concurrent resource operations.
pub struct IndexClient<R: HttpRequester> {
    config: IndexConfig,
    http: R,
}

impl IndexClient<ReqwestRequester> {
    /// Client over reqwest.
    pub fn from_config(config: IndexConfig) -> Result<Self, ClientError> {
        let http = ReqwestRequester::new(&config)?;
        Ok(Self::new(config, http))
    }
}

impl<R: HttpRequester> IndexClient<R> {
    pub fn new(config: IndexConfig, http: R) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }

    async fn fetch_page(
        &self,
        filter: &MessageFilter,
        page: u64,
        size: u64,
    ) -> Result<MessagePage, ClientError> {
        let response = self
            .http
            .get(&self.api(MESSAGES_QUERY_PATH), &filter.to_query(page, size))
            .await?
            .error_for_status()?;
        let mut result: MessagePage = response.parse()?;

        // Count from what we asked for; the echoed fields may be missing.
        result.pagination_page = page;
        if result.pagination_per_page == 0 {
            result.pagination_per_page = size.max(1);
        }
        Ok(result)
    }
}

#[async_trait]
impl<R: HttpRequester> MessageIndexApi for IndexClient<R> {
    async fn broadcast(&self, message: &Message) -> Result<BroadcastResponse, ClientError> {
        let request = serde_json::to_value(BroadcastRequest {
            message,
            sync: false,
        })?;

        let response = self
            .http
            .post_json(&self.api(MESSAGES_PATH), &request)
            .await?
            .error_for_status()?;
        let parsed: BroadcastResponse = response.parse()?;

        info!(
            item_hash = %message.item_hash,
            message_type = %message.message_type,
            publication = %parsed.publication_status.status,
            "Broadcast message"
        );
        Ok(parsed)
    }

    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        metadata: &Message,
    ) -> Result<UploadResponse, ClientError> {
        let size = bytes.len();
        let metadata = serde_json::to_string(&BroadcastRequest {
            message: metadata,
            sync: false,
        })?;

        let parts = vec![
            MultipartPart::Text {
                name: "metadata".to_string(),
                value: metadata,
            },
            MultipartPart::File {
                name: "file".to_string(),
                filename: filename.to_string(),
                bytes,
            },
        ];

        let response = self
            .http
            .post_multipart(&self.api(ADD_FILE_PATH), parts)
            .await?;

        if !response.is_success() {
            return Err(ClientError::Upload(format!(
                "HTTP {}: {}",
                response.status,
                response.text()
            )));
        }

        let parsed: UploadResponse = serde_json::from_slice(&response.body)
            .map_err(|e| ClientError::Upload(format!("malformed response: {e}")))?;
        if parsed.hash.is_empty() {
            return Err(ClientError::Upload("response carries no hash".to_string()));
        }
        parsed.ensure_accepted()?;

        info!(file_hash = %parsed.hash, bytes = size, filename, "Uploaded file");
        Ok(parsed)
    }

    async fn query_messages(
        &self,
        filter: &MessageFilter,
        page: u64,
        size: u64,
    ) -> Result<(Vec<Message>, u64), ClientError> {
        let result = self.fetch_page(filter, page, size).await?;
        let remaining = result.remaining();
        debug!(page, size, total = result.pagination_total, remaining, "Queried messages");
        Ok((result.messages, remaining))
    }

    async fn get_message_by_hash(&self, hash: &str) -> Result<Message, ClientError> {
        let result = self
            .fetch_page(&MessageFilter::by_hash(hash), 1, self.config.page_size)
            .await?;

        if result.pagination_total != 1 || result.messages.len() != 1 {
            if result.pagination_total > 1 {
                warn!(item_hash = hash, total = result.pagination_total, "Ambiguous hash lookup");
            }
            return Err(ClientError::MessageNotFound(hash.to_string()));
        }

        result
            .messages
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::MessageNotFound(hash.to_string()))
    }

    async fn allocation_state(
        &self,
        vm_hash: &str,
    ) -> Result<Option<SchedulerAllocation>, ClientError> {
        let url = format!("{}{}/{}", self.config.scheduler_url, ALLOCATION_PATH, vm_hash);
        let response = self.http.get(&url, &[]).await?;

        if response.status == 404 {
            debug!(vm_hash, "No allocation yet");
            return Ok(None);
        }

        let allocation: SchedulerAllocation = response.error_for_status()?.parse()?;
        Ok(Some(allocation))
    }

    async fn forget_message(
        &self,
        sender: &MessageSender,
        target_hash: &str,
    ) -> Result<BroadcastResponse, ClientError> {
        let message = sender.forget(vec![target_hash.to_string()], None)?;
        info!(target = target_hash, item_hash = %message.item_hash, "Forgetting message");
        self.broadcast(&message).await
    }

    async fn find_store_message(
        &self,
        address: &str,
        channel: &str,
        file_hash: &str,
        preferred: &str,
    ) -> Result<Option<Message>, ClientError> {
        let filter = MessageFilter::by_sender(address, channel, MessageType::Store);
        let mut first_match = None;
        let mut page = 1;

        loop {
            let (messages, remaining) = self
                .query_messages(&filter, page, self.config.page_size)
                .await?;
            let exhausted = remaining == 0 || messages.is_empty();

            for message in messages {
                let references = message
                    .content::<StoreContent>()
                    .map(|content| content.item_hash == file_hash)
                    .unwrap_or(false);
                if !references {
                    continue;
                }
                if message.item_hash == preferred {
                    return Ok(Some(message));
                }
                first_match.get_or_insert(message);
            }

            if exhausted {
                return Ok(first_match);
            }
            page += 1;
        }
    }
}
