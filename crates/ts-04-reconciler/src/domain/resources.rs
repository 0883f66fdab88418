//! # Resource Records
//!
//! Typed argument and state records exchanged with the lifecycle host, one
//! pair per resource kind, unified behind [`ResourceSpec`] and
//! [`ResourceState`].
//!
//! Host-facing fields are camelCase. Nested machine payloads reuse the
//! message payload types and keep their wire spelling.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ts_01_identity::{AccountArgs, AccountState};
use ts_02_messages::{
    CodeContent, FunctionEnvironment, FunctionRuntime, FunctionTriggers, HostRequirements,
    MachineResources, MachineVolume, Payment, RootFsVolume,
};
use ts_03_index_client::SchedulerAllocation;

/// Resource kind discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Signing identity derived locally. Never touches the network.
    Account,
    /// Folder published as a squashfs image with a STORE message.
    Volume,
    /// Long-running VM from an INSTANCE message.
    Instance,
    /// On-demand VM from a PROGRAM message.
    Function,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Volume => "volume",
            Self::Instance => "instance",
            Self::Function => "function",
        }
    }

    /// Whether Create waits for the scheduler to place a VM.
    pub fn requires_scheduling(&self) -> bool {
        matches!(self, Self::Instance | Self::Function)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Volume
// =============================================================================

/// A local directory published as an immutable volume.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeArgs {
    pub account: AccountState,
    pub channel: String,
    pub folder_path: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeState {
    #[serde(flatten)]
    pub args: VolumeArgs,
    /// Content hash of the source directory.
    pub folder_hash: String,
    /// Hash of the uploaded image, as reported by the index.
    pub file_hash: String,
    /// Item hash of the STORE message.
    pub message_hash: String,
    /// Packaged image size in bytes.
    #[serde(default)]
    pub size: u64,
}

impl VolumeState {
    /// State with no outputs yet, as returned by a preview.
    pub fn pending(args: VolumeArgs) -> Self {
        Self {
            args,
            ..Default::default()
        }
    }
}

// =============================================================================
// Instance
// =============================================================================

/// A persistent VM.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceArgs {
    pub account: AccountState,
    pub channel: String,
    pub rootfs: RootFsVolume,
    #[serde(default)]
    pub allow_amend: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub authorized_keys: Vec<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub environment: FunctionEnvironment,
    #[serde(default)]
    pub resources: MachineResources,
    pub payment: Payment,
    #[serde(default)]
    pub requirements: HostRequirements,
    #[serde(default)]
    pub volumes: Vec<MachineVolume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceState {
    #[serde(flatten)]
    pub args: InstanceArgs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_allocation: Option<SchedulerAllocation>,
    pub message_hash: String,
}

impl InstanceState {
    pub fn pending(args: InstanceArgs) -> Self {
        Self {
            args,
            ..Default::default()
        }
    }
}

// =============================================================================
// Function
// =============================================================================

/// A serverless program.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionArgs {
    pub account: AccountState,
    pub channel: String,
    pub code: CodeContent,
    pub runtime: FunctionRuntime,
    #[serde(default)]
    pub on: FunctionTriggers,
    #[serde(default)]
    pub allow_amend: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub environment: FunctionEnvironment,
    #[serde(default)]
    pub resources: MachineResources,
    pub payment: Payment,
    #[serde(default)]
    pub requirements: HostRequirements,
    #[serde(default)]
    pub volumes: Vec<MachineVolume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionState {
    #[serde(flatten)]
    pub args: FunctionArgs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_allocation: Option<SchedulerAllocation>,
    pub message_hash: String,
}

impl FunctionState {
    pub fn pending(args: FunctionArgs) -> Self {
        Self {
            args,
            ..Default::default()
        }
    }
}

// =============================================================================
// Unified Records
// =============================================================================

/// Desired spec of any resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceSpec {
    Account(AccountArgs),
    Volume(VolumeArgs),
    Instance(Box<InstanceArgs>),
    Function(Box<FunctionArgs>),
}

impl ResourceSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Account(_) => ResourceKind::Account,
            Self::Volume(_) => ResourceKind::Volume,
            Self::Instance(_) => ResourceKind::Instance,
            Self::Function(_) => ResourceKind::Function,
        }
    }
}

/// Recorded state of any resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceState {
    Account(AccountState),
    Volume(VolumeState),
    Instance(Box<InstanceState>),
    Function(Box<FunctionState>),
}

impl ResourceState {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Account(_) => ResourceKind::Account,
            Self::Volume(_) => ResourceKind::Volume,
            Self::Instance(_) => ResourceKind::Instance,
            Self::Function(_) => ResourceKind::Function,
        }
    }

    /// Item hash of the message backing this resource, if it has one.
    pub fn message_hash(&self) -> Option<&str> {
        let hash = match self {
            Self::Account(_) => return None,
            Self::Volume(state) => &state.message_hash,
            Self::Instance(state) => &state.message_hash,
            Self::Function(state) => &state.message_hash,
        };
        Some(hash.as_str()).filter(|h| !h.is_empty())
    }
}

/// Result of `Create`.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateResponse {
    /// Resource identifier handed back to the host.
    pub id: String,
    /// Outputs the host persists and hands back to Diff and Delete.
    pub state: ResourceState,
}

/// Result of `Diff`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResponse {
    /// The recorded state no longer matches the desired arguments.
    pub has_changes: bool,
    /// The host must delete the old resource before creating its
    /// replacement.
    pub delete_before_replace: bool,
}

impl DiffResponse {
    /// Nothing to do.
    pub const UNCHANGED: Self = Self {
        has_changes: false,
        delete_before_replace: false,
    };

    /// Recreate, keeping the old resource until the new one exists.
    pub const UPDATE: Self = Self {
        has_changes: true,
        delete_before_replace: false,
    };

    /// Delete, then recreate.
    pub const REPLACE: Self = Self {
        has_changes: true,
        delete_before_replace: true,
    };
}

/// Resource name from a URN (`urn:…::type::name`), or the URN itself.
pub fn resource_name(urn: &str) -> &str {
    urn.rsplit("::").next().unwrap_or(urn)
}
