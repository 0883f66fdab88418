//! # Reconciliation Errors
//!
//! Lower-layer errors are wrapped with `#[from]` so their kind survives to
//! the lifecycle host.

use super::phase::Phase;
use super::resources::ResourceKind;
use thiserror::Error;
use ts_01_identity::IdentityError;
use ts_02_messages::MessageError;
use ts_03_index_client::ClientError;

/// Errors raised by Create/Diff/Delete.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Account secrets could not produce an identity
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Message could not be built or signed
    #[error(transparent)]
    Message(#[from] MessageError),

    /// Index or scheduler call failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A bounded wait ran out
    #[error("Timed out after {waited_secs}s waiting for {what}")]
    ProvisioningTimeout {
        /// What was awaited
        what: String,
        /// Seconds spent waiting
        waited_secs: u64,
    },

    /// Uploaded volume never showed up on the index
    #[error("Volume not found on the index: {0}")]
    VolumeNotFound(String),

    /// Volume source directory is missing
    #[error("Source folder not found: {0}")]
    SourceNotFound(String),

    /// External packager failed
    #[error("Packaging failed: {0}")]
    Packaging(String),

    /// Local filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// Recorded state and new spec describe different kinds
    #[error("Kind mismatch: state is {state}, spec is {spec}")]
    KindMismatch {
        /// Kind of the recorded state
        state: ResourceKind,
        /// Kind of the new spec
        spec: ResourceKind,
    },

    /// Lifecycle phase moved backwards or out of a terminal phase
    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current phase
        from: Phase,
        /// Requested phase
        to: Phase,
    },
}

impl ReconcileError {
    /// Whether the underlying failure is worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Client(e) => e.is_transient(),
            _ => false,
        }
    }
}
