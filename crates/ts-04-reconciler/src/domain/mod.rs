//! Domain layer for the reconciler.

pub mod config;
pub mod diff;
pub mod dirhash;
pub mod errors;
pub mod phase;
pub mod resources;
pub mod wait;

pub use config::{PollPolicy, ReconcilerConfig, RetryPolicy};
pub use diff::{account_changed, function_changed, instance_changed, volume_target_changed};
pub use dirhash::{directory_size, hash_directory, regular_files};
pub use errors::ReconcileError;
pub use phase::{Phase, PhaseTracker};
pub use resources::{
    resource_name, CreateResponse, DiffResponse, FunctionArgs, FunctionState, InstanceArgs,
    InstanceState, ResourceKind, ResourceSpec, ResourceState, VolumeArgs, VolumeState,
};
pub use wait::{poll_until, retry_until};
