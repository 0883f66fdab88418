//! # Message Payloads
//!
//! Per-kind `item_content` records. Field order here is the serialization
//! order, and every map is a `BTreeMap`, so the same logical payload always
//! produces the same bytes and therefore the same item hash.

use super::entities::{Chain, ItemType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Enumerations
// =============================================================================

/// How a machine is paid for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    /// Tokens held on the sender address.
    #[default]
    Hold,
    /// Pay-as-you-go stream.
    Superfluid,
}

/// Where a writable volume lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumePersistence {
    /// On the host running the VM.
    #[default]
    Host,
    /// Pushed back to the storage network.
    Store,
}

/// Instruction set a host must run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpuArchitecture {
    #[default]
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "arm64")]
    Arm64,
}

/// CPU vendor a host must have, as reported by `cpuid`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpuVendor {
    #[serde(rename = "AuthenticAMD")]
    Amd,
    #[serde(rename = "GenuineIntel")]
    Intel,
}

// =============================================================================
// Store / Forget
// =============================================================================

/// Payload of a STORE message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreContent {
    /// Owner of the stored file.
    pub address: String,
    /// Seconds since the epoch, equal to the envelope time.
    pub time: f64,
    /// Where the stored bytes live.
    pub item_type: ItemType,
    /// Hash of the stored bytes.
    pub item_hash: String,
    /// Earlier STORE this one amends.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Payload of a FORGET message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForgetContent {
    /// Sender of the tombstoned messages.
    pub address: String,
    pub time: f64,
    /// Item hashes to tombstone.
    pub hashes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// =============================================================================
// Machine Building Blocks
// =============================================================================

/// Reference to a parent image or volume.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentVolume {
    /// Item hash of the referenced STORE.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Follow amendments of `reference`.
    #[serde(default)]
    pub use_latest: bool,
}

/// Root filesystem of an instance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootFsVolume {
    /// Base image.
    pub parent: ParentVolume,
    pub persistence: VolumePersistence,
    /// Disk size in MiB.
    pub size_mib: u64,
}

/// Read-only volume backed by a STORE message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmutableVolume {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Mount point inside the VM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount: Option<String>,
    /// Item hash of the STORE holding the image.
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub use_latest: bool,
}

/// Scratch volume discarded with the VM.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralVolume {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount: Option<String>,
    pub ephemeral: bool,
    pub size_mib: u64,
}

/// Named writable volume that outlives the VM.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentVolume {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentVolume>,
    pub persistence: VolumePersistence,
    pub name: String,
    pub size_mib: u64,
}

/// Any volume attachable to a machine.
///
/// Untagged on the wire: the variants are told apart by their fields, so the
/// order below matters (most specific first).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MachineVolume {
    Persistent(PersistentVolume),
    Ephemeral(EphemeralVolume),
    Immutable(ImmutableVolume),
}

/// Sandbox switches of a machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEnvironment {
    pub reproducible: bool,
    /// Outbound network access.
    pub internet: bool,
    /// Access to the index API from inside the VM.
    pub aleph_api: bool,
    pub shared_cache: bool,
}

/// Compute budget of a machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineResources {
    pub vcpus: u64,
    /// MiB.
    pub memory: u64,
    /// Execution time budget.
    pub seconds: u64,
}

impl Default for MachineResources {
    fn default() -> Self {
        Self {
            vcpus: 1,
            memory: 2048,
            seconds: 30,
        }
    }
}

/// CPU constraints of [`HostRequirements`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<CpuArchitecture>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<CpuVendor>,
}

/// Node constraints of [`HostRequirements`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRequirements {
    /// Address operating the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_regex: Option<String>,
}

/// Constraints on the host a machine may be scheduled on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeRequirements>,
}

/// Payment descriptor embedded in machine payloads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub chain: Chain,
    /// Address paid by a stream; unused when holding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
}

// =============================================================================
// Program Building Blocks
// =============================================================================

/// Code bundle of a function.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeContent {
    /// `zip`, `squashfs` or `plain`.
    pub encoding: String,
    /// `module:app` for Python, a file for anything else.
    pub entrypoint: String,
    /// Item hash of the STORE holding the bundle.
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub use_latest: bool,
}

/// Runtime image of a function.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRuntime {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub use_latest: bool,
    #[serde(default)]
    pub comment: String,
}

/// What wakes a function up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionTriggers {
    /// Start on incoming HTTP requests.
    pub http: bool,
    /// Keep running between requests.
    #[serde(default)]
    pub persistent: bool,
}

impl Default for FunctionTriggers {
    fn default() -> Self {
        Self {
            http: true,
            persistent: false,
        }
    }
}

// =============================================================================
// Instance / Program
// =============================================================================

/// Payload of an INSTANCE message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstanceContent {
    /// Owner of the instance.
    pub address: String,
    /// Seconds since the epoch, equal to the envelope time.
    pub time: f64,
    pub rootfs: RootFsVolume,
    /// Whether later messages may amend this one.
    pub allow_amend: bool,
    pub metadata: BTreeMap<String, String>,
    /// SSH public keys installed for the default user.
    pub authorized_keys: Vec<String>,
    /// Environment variables of the VM.
    pub variables: BTreeMap<String, String>,
    pub environment: FunctionEnvironment,
    pub resources: MachineResources,
    pub payment: Payment,
    pub requirements: HostRequirements,
    pub volumes: Vec<MachineVolume>,
    /// Item hash of the machine this one supersedes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<String>,
}

/// Payload of a PROGRAM message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgramContent {
    /// Owner of the function.
    pub address: String,
    /// Seconds since the epoch, equal to the envelope time.
    pub time: f64,
    pub code: CodeContent,
    pub runtime: FunctionRuntime,
    pub on: FunctionTriggers,
    pub allow_amend: bool,
    pub metadata: BTreeMap<String, String>,
    pub variables: BTreeMap<String, String>,
    pub environment: FunctionEnvironment,
    pub resources: MachineResources,
    pub payment: Payment,
    pub requirements: HostRequirements,
    pub volumes: Vec<MachineVolume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<String>,
}
