//! # Index Client (TS-03)
//!
//! Talks to the twentysix message index and to the VM scheduler.
//!
//! ## Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | broadcast | `POST /api/v0/messages` `{message, sync}` |
//! | query | `GET /api/v0/messages.json?hashes=&addresses=&channels=&msgTypes=&page=&size=` |
//! | upload | `POST /api/v0/storage/add_file` multipart `metadata` + `file` |
//! | allocation | `GET {scheduler}/api/v0/allocation/{hash}` |
//!
//! ## Module Structure
//!
//! ```text
//! ts-03-index-client/
//! ├── domain/     # IndexConfig, wire records, ClientError
//! ├── ports/      # MessageIndexApi (inbound), HttpRequester (outbound)
//! ├── adapters/   # ReqwestRequester
//! └── service.rs  # IndexClient
//! ```
//!
//! Calls are single-attempt. [`ClientError::is_transient`] tells callers
//! which failures are worth retrying.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::ReqwestRequester;
pub use domain::{
    AllocationNode, AllocationPeriod, BroadcastRequest, BroadcastResponse, ClientError,
    IndexConfig, MessageFilter, MessagePage, PublicationStatus, SchedulerAllocation,
    UploadResponse, DEFAULT_API_URL, DEFAULT_SCHEDULER_URL,
};
pub use ports::{
    HttpRequester, HttpResponse, MessageIndexApi, MockHttpRequester, MultipartPart,
    RecordedRequest,
};
pub use service::IndexClient;
