//! # Drift Detection
//!
//! Explicit field-by-field comparison per resource kind. Only the fields
//! that end up in the broadcast payload, plus the sender and channel, take
//! part. Secrets, timestamps, allocations and output hashes never do.

use super::resources::{FunctionArgs, InstanceArgs, VolumeArgs};
use std::collections::BTreeMap;
use ts_01_identity::{AccountArgs, DEFAULT_DERIVATION_PATH};
use ts_02_messages::{
    CodeContent, FunctionEnvironment, FunctionRuntime, FunctionTriggers, HostRequirements,
    MachineResources, MachineVolume, Payment, RootFsVolume,
};

/// Comparable subset of an instance.
#[derive(Debug, PartialEq, Eq)]
struct InstanceView<'a> {
    sender: String,
    channel: &'a str,
    rootfs: &'a RootFsVolume,
    allow_amend: bool,
    metadata: &'a BTreeMap<String, String>,
    authorized_keys: &'a [String],
    variables: &'a BTreeMap<String, String>,
    environment: &'a FunctionEnvironment,
    resources: &'a MachineResources,
    payment: &'a Payment,
    requirements: &'a HostRequirements,
    volumes: &'a [MachineVolume],
    replaces: Option<&'a str>,
}

impl<'a> From<&'a InstanceArgs> for InstanceView<'a> {
    fn from(args: &'a InstanceArgs) -> Self {
        Self {
            sender: sender_key(&args.account.address),
            channel: &args.channel,
            rootfs: &args.rootfs,
            allow_amend: args.allow_amend,
            metadata: &args.metadata,
            authorized_keys: &args.authorized_keys,
            variables: &args.variables,
            environment: &args.environment,
            resources: &args.resources,
            payment: &args.payment,
            requirements: &args.requirements,
            volumes: &args.volumes,
            replaces: args.replaces.as_deref(),
        }
    }
}

/// Comparable subset of a function.
#[derive(Debug, PartialEq, Eq)]
struct FunctionView<'a> {
    sender: String,
    channel: &'a str,
    code: &'a CodeContent,
    runtime: &'a FunctionRuntime,
    on: &'a FunctionTriggers,
    allow_amend: bool,
    metadata: &'a BTreeMap<String, String>,
    variables: &'a BTreeMap<String, String>,
    environment: &'a FunctionEnvironment,
    resources: &'a MachineResources,
    payment: &'a Payment,
    requirements: &'a HostRequirements,
    volumes: &'a [MachineVolume],
    replaces: Option<&'a str>,
}

impl<'a> From<&'a FunctionArgs> for FunctionView<'a> {
    fn from(args: &'a FunctionArgs) -> Self {
        Self {
            sender: sender_key(&args.account.address),
            channel: &args.channel,
            code: &args.code,
            runtime: &args.runtime,
            on: &args.on,
            allow_amend: args.allow_amend,
            metadata: &args.metadata,
            variables: &args.variables,
            environment: &args.environment,
            resources: &args.resources,
            payment: &args.payment,
            requirements: &args.requirements,
            volumes: &args.volumes,
            replaces: args.replaces.as_deref(),
        }
    }
}

/// Whether the desired instance differs from the recorded one.
pub fn instance_changed(old: &InstanceArgs, new: &InstanceArgs) -> bool {
    InstanceView::from(old) != InstanceView::from(new)
}

/// Whether the desired function differs from the recorded one.
pub fn function_changed(old: &FunctionArgs, new: &FunctionArgs) -> bool {
    FunctionView::from(old) != FunctionView::from(new)
}

/// Whether a volume moved to another sender, channel or folder.
pub fn volume_target_changed(old: &VolumeArgs, new: &VolumeArgs) -> bool {
    sender_key(&old.account.address) != sender_key(&new.account.address)
        || old.channel != new.channel
        || old.folder_path != new.folder_path
}

/// Whether the secret inputs of an account changed.
///
/// A mnemonic-derived account records the derived private key in its
/// state, so for those the mnemonic and the effective path are compared
/// instead.
pub fn account_changed(old: &AccountArgs, new: &AccountArgs) -> bool {
    match non_blank(&new.mnemonic) {
        Some(mnemonic) if non_blank(&new.private_key).is_none() => {
            non_blank(&old.mnemonic).map(normalize_mnemonic) != Some(normalize_mnemonic(mnemonic))
                || effective_path(old) != effective_path(new)
        }
        _ => {
            non_blank(&old.private_key).map(normalize_key)
                != non_blank(&new.private_key).map(normalize_key)
        }
    }
}

/// Addresses compare without their EIP-55 casing.
fn sender_key(address: &str) -> String {
    address.to_ascii_lowercase()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_key(key: &str) -> String {
    let lower = key.to_ascii_lowercase();
    lower.strip_prefix("0x").unwrap_or(&lower).to_string()
}

fn normalize_mnemonic(phrase: &str) -> String {
    phrase.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn effective_path(args: &AccountArgs) -> &str {
    non_blank(&args.derivation_path).unwrap_or(DEFAULT_DERIVATION_PATH)
}
