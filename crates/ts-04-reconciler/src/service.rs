//! # Reconciler Service
//!
//! Implements `ResourceProvider` over a message index and a volume packager.
//! Holds no mutable state, so one instance can serve concurrent operations
//! on independent resources.

use crate::domain::{
    account_changed, function_changed, hash_directory, instance_changed, poll_until,
    resource_name, retry_until, volume_target_changed, CreateResponse, DiffResponse,
    FunctionArgs, FunctionState, InstanceArgs, InstanceState, Phase, PhaseTracker, PollPolicy,
    ReconcileError, ReconcilerConfig, ResourceKind, ResourceSpec, ResourceState, VolumeArgs,
    VolumeState,
};
use crate::ports::inbound::ResourceProvider;
use crate::ports::outbound::{PackagedVolume, VolumePackager};
use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ts_01_identity::{derive_identity, AccountArgs, AccountState};
use ts_02_messages::{
    now_seconds, InstanceContent, ItemType, Message, MessageSender, MessageType, ProgramContent,
};
use ts_03_index_client::{ClientError, MessageIndexApi, SchedulerAllocation};

/// Hashes known once an image is uploaded.
struct UploadedImage {
    file_hash: String,
    /// Item hash of the STORE message sent with the file.
    item_hash: String,
}

/// Reconciliation engine.
pub struct Reconciler<I, P> {
    index: I,
    packager: P,
    config: ReconcilerConfig,
}

impl<I: MessageIndexApi, P: VolumePackager> Reconciler<I, P> {
    pub fn new(index: I, packager: P, config: ReconcilerConfig) -> Self {
        Self {
            index,
            packager,
            config,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    /// Poll the index until the message with `hash` is confirmed.
    ///
    /// Lookups that find nothing yet or fail transiently are retried until
    /// `policy.timeout`.
    pub async fn wait_for_confirmation(
        &self,
        hash: &str,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<Message, ReconcileError> {
        poll_until(policy, cancel, "confirmation", |attempt| async move {
            match self.index.get_message_by_hash(hash).await {
                Ok(message) if message.is_confirmed() => Ok(Some(message)),
                Ok(_) => Ok(None),
                Err(e) if e.is_not_found() || e.is_transient() => {
                    debug!(item_hash = hash, attempt, error = %e, "Confirmation lookup failed");
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    // -------------------------------------------------------------------------
    // Account
    // -------------------------------------------------------------------------

    fn create_account(&self, urn: &str, args: &AccountArgs) -> Result<AccountState, ReconcileError> {
        let identity = derive_identity(args)?;
        info!(urn, address = identity.address(), "Account derived");
        Ok(AccountState::new(args.clone(), &identity))
    }

    // -------------------------------------------------------------------------
    // Volume
    // -------------------------------------------------------------------------

    async fn create_volume(
        &self,
        urn: &str,
        args: &VolumeArgs,
        cancel: &CancellationToken,
    ) -> Result<VolumeState, ReconcileError> {
        let mut tracker = PhaseTracker::new(urn, ResourceKind::Volume);
        self.provision_volume(urn, args, &mut tracker, cancel)
            .await
            .map_err(|e| tracker.fail(e))
    }

    async fn provision_volume(
        &self,
        urn: &str,
        args: &VolumeArgs,
        tracker: &mut PhaseTracker,
        cancel: &CancellationToken,
    ) -> Result<VolumeState, ReconcileError> {
        let source = existing_folder(&args.folder_path).await?;
        let sender = sender_for(&args.account, &args.channel)?;
        let folder_hash = hash_folder(source.clone()).await?;

        tracker.transition_to(Phase::Broadcasting)?;
        let PackagedVolume { path, size } = self.packager.package(&source).await?;
        let filename = format!("{}.squashfs", resource_name(urn));
        let uploaded = self.upload_image(&sender, &path, &filename).await;
        if let Err(e) = path.close() {
            warn!(urn, error = %e, "Failed to remove packaged image");
        }
        let metadata = uploaded?;
        let file_hash = metadata.file_hash;

        tracker.transition_to(Phase::Polling)?;
        let message = self
            .lookup_store(&sender, &file_hash, &metadata.item_hash, cancel)
            .await?;
        if let Some(policy) = &self.config.confirmation {
            self.wait_for_confirmation(&message.item_hash, policy, cancel)
                .await?;
        }
        tracker.transition_to(Phase::Confirmed)?;

        info!(urn, file_hash = %file_hash, item_hash = %message.item_hash, size, "Volume stored");
        Ok(VolumeState {
            args: args.clone(),
            folder_hash,
            file_hash,
            message_hash: message.item_hash,
            size,
        })
    }

    /// Upload the image with a STORE message referencing its hash.
    async fn upload_image(
        &self,
        sender: &MessageSender,
        image: &Path,
        filename: &str,
    ) -> Result<UploadedImage, ReconcileError> {
        let bytes = tokio::fs::read(image).await?;
        let file_hash = hex::encode(Sha256::digest(&bytes));
        let metadata = sender.store(&file_hash, ItemType::Storage)?;

        let response = self.index.upload_file(bytes, filename, &metadata).await?;
        response.ensure_accepted()?;
        if response.hash != file_hash {
            return Err(ClientError::Upload(format!(
                "index stored {} but the image hashes to {file_hash}",
                response.hash
            ))
            .into());
        }

        Ok(UploadedImage {
            file_hash,
            item_hash: metadata.item_hash,
        })
    }

    /// Wait for the STORE message signed for this upload to become visible.
    ///
    /// Another STORE of the same file by the same sender is only taken once
    /// the attempts run out without ours showing up.
    async fn lookup_store(
        &self,
        sender: &MessageSender,
        file_hash: &str,
        item_hash: &str,
        cancel: &CancellationToken,
    ) -> Result<Message, ReconcileError> {
        let address = sender.address();
        let channel = sender.channel();
        let fallback: Mutex<Option<Message>> = Mutex::new(None);
        let fallback_ref = &fallback;

        let found = retry_until(&self.config.index_lookup, cancel, "store message", |attempt| async move {
            match self
                .index
                .find_store_message(address, channel, file_hash, item_hash)
                .await
            {
                Ok(Some(message)) if message.item_hash == item_hash => Ok(Some(message)),
                Ok(other) => {
                    if other.is_some() {
                        *fallback_ref.lock() = other;
                    }
                    Ok(None)
                }
                Err(e) if e.is_transient() => {
                    warn!(file_hash, attempt, error = %e, "Store lookup failed");
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await?;

        if let Some(message) = found {
            return Ok(message);
        }
        match fallback.into_inner() {
            Some(message) => {
                warn!(file_hash, expected = item_hash, found = %message.item_hash, "Using another STORE of the same file");
                Ok(message)
            }
            None => Err(ReconcileError::VolumeNotFound(file_hash.to_string())),
        }
    }

    async fn diff_volume(
        &self,
        old: &VolumeState,
        new: &VolumeArgs,
    ) -> Result<DiffResponse, ReconcileError> {
        let source = existing_folder(&new.folder_path).await?;
        let folder_hash = hash_folder(source).await?;
        let resolvable = self.resolvable(&old.message_hash).await?;
        let content_matches =
            folder_hash == old.folder_hash && !volume_target_changed(&old.args, new);

        debug!(content_matches, resolvable, "Volume compared");
        Ok(match (content_matches, resolvable) {
            (true, true) => DiffResponse::UNCHANGED,
            (_, false) => DiffResponse::REPLACE,
            (false, true) => DiffResponse::UPDATE,
        })
    }

    /// Whether `hash` still resolves to exactly one message.
    async fn resolvable(&self, hash: &str) -> Result<bool, ReconcileError> {
        if hash.is_empty() {
            return Ok(false);
        }
        match self.index.get_message_by_hash(hash).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // -------------------------------------------------------------------------
    // Instance / Function
    // -------------------------------------------------------------------------

    async fn create_instance(
        &self,
        urn: &str,
        args: &InstanceArgs,
        cancel: &CancellationToken,
    ) -> Result<InstanceState, ReconcileError> {
        let sender = sender_for(&args.account, &args.channel)?;
        let time = now_seconds();
        let content = InstanceContent {
            address: sender.address().to_string(),
            time,
            rootfs: args.rootfs.clone(),
            allow_amend: args.allow_amend,
            metadata: args.metadata.clone(),
            authorized_keys: args.authorized_keys.clone(),
            variables: args.variables.clone(),
            environment: args.environment,
            resources: args.resources,
            payment: args.payment.clone(),
            requirements: args.requirements.clone(),
            volumes: args.volumes.clone(),
            replaces: args.replaces.clone(),
        };
        let message = sender.build(MessageType::Instance, &content, time)?;
        let allocation = self
            .schedule(urn, ResourceKind::Instance, &message, cancel)
            .await?;

        Ok(InstanceState {
            args: args.clone(),
            scheduler_allocation: Some(allocation),
            message_hash: message.item_hash,
        })
    }

    async fn create_function(
        &self,
        urn: &str,
        args: &FunctionArgs,
        cancel: &CancellationToken,
    ) -> Result<FunctionState, ReconcileError> {
        let sender = sender_for(&args.account, &args.channel)?;
        let time = now_seconds();
        let content = ProgramContent {
            address: sender.address().to_string(),
            time,
            code: args.code.clone(),
            runtime: args.runtime.clone(),
            on: args.on,
            allow_amend: args.allow_amend,
            metadata: args.metadata.clone(),
            variables: args.variables.clone(),
            environment: args.environment,
            resources: args.resources,
            payment: args.payment.clone(),
            requirements: args.requirements.clone(),
            volumes: args.volumes.clone(),
            replaces: args.replaces.clone(),
        };
        let message = sender.build(MessageType::Program, &content, time)?;
        let allocation = self
            .schedule(urn, ResourceKind::Function, &message, cancel)
            .await?;

        Ok(FunctionState {
            args: args.clone(),
            scheduler_allocation: Some(allocation),
            message_hash: message.item_hash,
        })
    }

    /// Broadcast a machine message and wait for the scheduler to place it.
    async fn schedule(
        &self,
        urn: &str,
        kind: ResourceKind,
        message: &Message,
        cancel: &CancellationToken,
    ) -> Result<SchedulerAllocation, ReconcileError> {
        let mut tracker = PhaseTracker::new(urn, kind);
        let result: Result<SchedulerAllocation, ReconcileError> = async {
            tracker.transition_to(Phase::Broadcasting)?;
            self.index.broadcast(message).await?.ensure_accepted()?;

            tracker.transition_to(Phase::Polling)?;
            let allocation = self.wait_for_allocation(&message.item_hash, cancel).await?;
            tracker.transition_to(Phase::Confirmed)?;
            Ok(allocation)
        }
        .await;

        let allocation = result.map_err(|e| tracker.fail(e))?;
        info!(urn, kind = %kind, vm_hash = %allocation.vm_hash, vm_type = %allocation.vm_type, "VM scheduled");
        Ok(allocation)
    }

    async fn wait_for_allocation(
        &self,
        vm_hash: &str,
        cancel: &CancellationToken,
    ) -> Result<SchedulerAllocation, ReconcileError> {
        poll_until(&self.config.allocation_poll, cancel, "allocation", |attempt| async move {
            match self.index.allocation_state(vm_hash).await {
                Ok(Some(allocation)) => Ok(Some(allocation)),
                Ok(None) => {
                    debug!(vm_hash, attempt, "Not scheduled yet");
                    Ok(None)
                }
                Err(e) if e.is_transient() => {
                    warn!(vm_hash, attempt, error = %e, "Allocation lookup failed");
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Replace when the comparable fields changed or the VM is gone.
    async fn diff_machine(
        &self,
        changed: bool,
        allocation: Option<&SchedulerAllocation>,
        message_hash: &str,
    ) -> Result<DiffResponse, ReconcileError> {
        let vm_hash = allocation
            .map(|a| a.vm_hash.as_str())
            .filter(|h| !h.is_empty())
            .unwrap_or(message_hash);

        let live = if vm_hash.is_empty() {
            false
        } else {
            self.index.allocation_state(vm_hash).await?.is_some()
        };

        debug!(changed, live, vm_hash, "Machine compared");
        Ok(if changed || !live {
            DiffResponse::REPLACE
        } else {
            DiffResponse::UNCHANGED
        })
    }

    // -------------------------------------------------------------------------
    // Delete
    // -------------------------------------------------------------------------

    async fn forget(
        &self,
        urn: &str,
        account: &AccountState,
        channel: &str,
        hash: &str,
        tracker: &mut PhaseTracker,
    ) -> Result<(), ReconcileError> {
        let message = match self.index.get_message_by_hash(hash).await {
            Ok(message) => message,
            Err(e) if e.is_not_found() => {
                info!(urn, item_hash = hash, "Message already gone");
                return tracker.transition_to(Phase::Deleted);
            }
            Err(e) => return Err(e.into()),
        };

        let sender = sender_for(account, channel)?;
        tracker.transition_to(Phase::Broadcasting)?;
        self.index
            .forget_message(&sender, &message.item_hash)
            .await?
            .ensure_accepted()?;
        tracker.transition_to(Phase::Deleted)?;

        info!(urn, item_hash = hash, "Message forgotten");
        Ok(())
    }
}

#[async_trait]
impl<I: MessageIndexApi, P: VolumePackager> ResourceProvider for Reconciler<I, P> {
    async fn create(
        &self,
        urn: &str,
        spec: &ResourceSpec,
        preview: bool,
        cancel: &CancellationToken,
    ) -> Result<CreateResponse, ReconcileError> {
        let id = resource_name(urn).to_string();

        if preview {
            let state = match spec {
                ResourceSpec::Account(args) => ResourceState::Account(AccountState {
                    args: args.clone(),
                    ..Default::default()
                }),
                ResourceSpec::Volume(args) => ResourceState::Volume(VolumeState::pending(args.clone())),
                ResourceSpec::Instance(args) => {
                    ResourceState::Instance(Box::new(InstanceState::pending((**args).clone())))
                }
                ResourceSpec::Function(args) => {
                    ResourceState::Function(Box::new(FunctionState::pending((**args).clone())))
                }
            };
            return Ok(CreateResponse { id, state });
        }

        info!(urn, kind = %spec.kind(), "Creating resource");
        let state = match spec {
            ResourceSpec::Account(args) => ResourceState::Account(self.create_account(urn, args)?),
            ResourceSpec::Volume(args) => {
                ResourceState::Volume(self.create_volume(urn, args, cancel).await?)
            }
            ResourceSpec::Instance(args) => {
                ResourceState::Instance(Box::new(self.create_instance(urn, args, cancel).await?))
            }
            ResourceSpec::Function(args) => {
                ResourceState::Function(Box::new(self.create_function(urn, args, cancel).await?))
            }
        };

        Ok(CreateResponse { id, state })
    }

    async fn diff(
        &self,
        urn: &str,
        old_state: &ResourceState,
        new_spec: &ResourceSpec,
    ) -> Result<DiffResponse, ReconcileError> {
        let response = match (old_state, new_spec) {
            (ResourceState::Account(old), ResourceSpec::Account(new)) => {
                if account_changed(&old.args, new) {
                    DiffResponse::UPDATE
                } else {
                    DiffResponse::UNCHANGED
                }
            }
            (ResourceState::Volume(old), ResourceSpec::Volume(new)) => {
                self.diff_volume(old, new).await?
            }
            (ResourceState::Instance(old), ResourceSpec::Instance(new)) => {
                let changed = instance_changed(&old.args, new);
                self.diff_machine(changed, old.scheduler_allocation.as_ref(), &old.message_hash)
                    .await?
            }
            (ResourceState::Function(old), ResourceSpec::Function(new)) => {
                let changed = function_changed(&old.args, new);
                self.diff_machine(changed, old.scheduler_allocation.as_ref(), &old.message_hash)
                    .await?
            }
            (old, new) => {
                return Err(ReconcileError::KindMismatch {
                    state: old.kind(),
                    spec: new.kind(),
                })
            }
        };

        info!(
            urn,
            kind = %new_spec.kind(),
            has_changes = response.has_changes,
            delete_before_replace = response.delete_before_replace,
            "Diff computed"
        );
        Ok(response)
    }

    async fn delete(&self, urn: &str, old_state: &ResourceState) -> Result<(), ReconcileError> {
        let (account, channel) = match old_state {
            ResourceState::Account(_) => {
                debug!(urn, "Accounts have nothing to forget");
                return Ok(());
            }
            ResourceState::Volume(state) => (&state.args.account, &state.args.channel),
            ResourceState::Instance(state) => (&state.args.account, &state.args.channel),
            ResourceState::Function(state) => (&state.args.account, &state.args.channel),
        };

        let mut tracker = PhaseTracker::new(urn, old_state.kind());
        let Some(hash) = old_state.message_hash() else {
            info!(urn, "No message recorded, nothing to forget");
            return tracker.transition_to(Phase::Deleted);
        };

        self.forget(urn, account, channel, hash, &mut tracker)
            .await
            .map_err(|e| tracker.fail(e))
    }
}

fn sender_for(account: &AccountState, channel: &str) -> Result<MessageSender, ReconcileError> {
    Ok(MessageSender::new(account.identity()?, channel))
}

async fn existing_folder(folder: &str) -> Result<PathBuf, ReconcileError> {
    let path = PathBuf::from(folder);
    let is_dir = !folder.trim().is_empty()
        && tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);

    if !is_dir {
        return Err(ReconcileError::SourceNotFound(folder.to_string()));
    }
    Ok(path)
}

async fn hash_folder(path: PathBuf) -> Result<String, ReconcileError> {
    let hash = tokio::task::spawn_blocking(move || hash_directory(&path))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
    Ok(hash)
}
