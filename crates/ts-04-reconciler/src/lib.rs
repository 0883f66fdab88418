//! # Reconciler (TS-04)
//!
//! Create/Diff/Delete for the resources a lifecycle host manages on the
//! twentysix network: accounts, volumes, instances and functions.
//!
//! ## Lifecycle
//!
//! ```text
//! Pending → Broadcasting → Polling → Confirmed
//!                                  ↘ Failed
//! Pending | Broadcasting → Deleted
//! ```
//!
//! | Kind | Create | Diff | Delete |
//! |------|--------|------|--------|
//! | Account | derive identity | secret inputs | no-op |
//! | Volume | package, upload, look up STORE | folder hash + message resolvable | FORGET |
//! | Instance | INSTANCE + wait for allocation | fields + VM live | FORGET |
//! | Function | PROGRAM + wait for allocation | fields + VM live | FORGET |
//!
//! Waits are bounded by [`ReconcilerConfig`] and cancellable through a
//! `CancellationToken`. Delete is idempotent: a message the index no longer
//! knows counts as deleted.
//!
//! ## Module Structure
//!
//! ```text
//! ts-04-reconciler/
//! ├── domain/     # records, diff subsets, phases, waits, dirhash
//! ├── ports/      # ResourceProvider (inbound), VolumePackager (outbound)
//! ├── adapters/   # SquashfsPackager
//! └── service.rs  # Reconciler
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::SquashfsPackager;
pub use domain::{
    hash_directory, poll_until, resource_name, retry_until, CreateResponse, DiffResponse,
    FunctionArgs, FunctionState, InstanceArgs, InstanceState, Phase, PhaseTracker, PollPolicy,
    ReconcileError, ReconcilerConfig, ResourceKind, ResourceSpec, ResourceState, RetryPolicy,
    VolumeArgs, VolumeState,
};
pub use ports::{MockMessageIndex, MockVolumePackager, PackagedVolume, ResourceProvider, VolumePackager};
pub use service::Reconciler;
