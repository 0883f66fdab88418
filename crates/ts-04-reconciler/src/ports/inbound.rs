//! # Inbound Ports
//!
//! The lifecycle host drives every resource through these three calls.

use crate::domain::{CreateResponse, DiffResponse, ReconcileError, ResourceSpec, ResourceState};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Resource provider API - inbound port.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Create the remote resource described by `spec`.
    ///
    /// With `preview` set nothing leaves the process and the returned state
    /// carries the inputs only. `cancel` aborts any wait in progress.
    async fn create(
        &self,
        urn: &str,
        spec: &ResourceSpec,
        preview: bool,
        cancel: &CancellationToken,
    ) -> Result<CreateResponse, ReconcileError>;

    /// Decide whether `new_spec` requires touching the resource recorded in
    /// `old_state`.
    async fn diff(
        &self,
        urn: &str,
        old_state: &ResourceState,
        new_spec: &ResourceSpec,
    ) -> Result<DiffResponse, ReconcileError>;

    /// Forget the remote resource. Already-gone resources succeed.
    async fn delete(&self, urn: &str, old_state: &ResourceState) -> Result<(), ReconcileError>;
}
