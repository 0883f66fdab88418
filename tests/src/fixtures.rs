//! Shared fixtures for the integration scenarios.

use anyhow::{bail, Context, Result};
use std::fs;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use ts_01_identity::{derive_identity, AccountArgs, AccountState};
use ts_04_reconciler::{
    InstanceArgs, MockMessageIndex, MockVolumePackager, Reconciler, ReconcilerConfig,
    ResourceProvider, ResourceSpec, ResourceState, VolumeArgs, VolumeState,
};

/// Well-known development key (first Hardhat account).
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Address derived from [`DEV_KEY`].
pub const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

pub const CHANNEL: &str = "TS-TEST";

pub fn urn(name: &str) -> String {
    format!("urn:pulumi:test::provisioner::twentysix:basics:Resource::{name}")
}

/// Account state as the Account resource would have produced it.
pub fn account() -> Result<AccountState> {
    let args = AccountArgs::from_private_key(DEV_KEY);
    let identity = derive_identity(&args)?;
    Ok(AccountState::new(args, &identity))
}

/// A source folder holding `files` (relative path, contents).
pub fn source_folder(files: &[(&str, &[u8])]) -> Result<TempDir> {
    let dir = TempDir::new().context("creating source folder")?;
    for (relative, contents) in files {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents).with_context(|| format!("writing {relative}"))?;
    }
    Ok(dir)
}

pub fn volume_args(dir: &TempDir) -> Result<VolumeArgs> {
    Ok(VolumeArgs {
        account: account()?,
        channel: CHANNEL.to_string(),
        folder_path: dir.path().to_string_lossy().into_owned(),
    })
}

pub fn instance_args() -> Result<InstanceArgs> {
    let mut args = InstanceArgs {
        account: account()?,
        channel: CHANNEL.to_string(),
        ..Default::default()
    };
    args.rootfs.parent.reference = "b6ff5c3a8205d1ca4c7c3369300eeafff498b558f71b851aa2114afd0a532717".into();
    args.rootfs.size_mib = 20_480;
    args.authorized_keys = vec!["ssh-ed25519 AAAAC3Nza test@ts".into()];
    Ok(args)
}

pub type InMemoryReconciler = Reconciler<MockMessageIndex, MockVolumePackager>;

/// Reconciler over the in-memory index, plus a handle on that index.
pub fn in_memory() -> (InMemoryReconciler, MockMessageIndex) {
    ts_telemetry::init_test_logging();
    let index = MockMessageIndex::new();
    let reconciler = Reconciler::new(
        index.clone(),
        MockVolumePackager::new(),
        ReconcilerConfig::default(),
    );
    (reconciler, index)
}

/// Create a volume and unwrap its state.
pub async fn create_volume<P: ResourceProvider>(
    provider: &P,
    name: &str,
    args: VolumeArgs,
) -> Result<VolumeState> {
    let response = provider
        .create(&urn(name), &ResourceSpec::Volume(args), false, &CancellationToken::new())
        .await?;
    match response.state {
        ResourceState::Volume(state) => Ok(state),
        other => bail!("expected a volume state, got {:?}", other.kind()),
    }
}
