//! # Instance Lifecycle
//!
//! Broadcast, scheduler wait, drift detection and forget for a persistent
//! VM, against the in-memory index.

#[cfg(test)]
mod tests {
    use crate::fixtures::{in_memory, instance_args, urn};
    use anyhow::{bail, Result};
    use std::time::Duration;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;
    use ts_02_messages::{InstanceContent, MessageType};
    use ts_04_reconciler::{
        DiffResponse, ReconcileError, ResourceProvider, ResourceSpec, ResourceState,
    };

    #[tokio::test(start_paused = true)]
    async fn test_never_scheduled_times_out_at_the_bound() -> Result<()> {
        let (reconciler, index) = in_memory();
        index.schedule_after(None);
        let spec = ResourceSpec::Instance(Box::new(instance_args()?));

        let started = Instant::now();
        let err = reconciler
            .create(&urn("vm"), &spec, false, &CancellationToken::new())
            .await
            .expect_err("an unscheduled VM must not be reported as created");

        assert!(matches!(err, ReconcileError::ProvisioningTimeout { .. }));
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(1800), "gave up early: {waited:?}");
        assert!(waited < Duration::from_secs(1810), "overran the bound: {waited:?}");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_deadline_shorter_than_bound() -> Result<()> {
        let (reconciler, index) = in_memory();
        index.schedule_after(None);
        let spec = ResourceSpec::Instance(Box::new(instance_args()?));
        let cancel = CancellationToken::new();

        let outer = tokio::time::timeout(
            Duration::from_secs(300),
            reconciler.create(&urn("vm"), &spec, false, &cancel),
        )
        .await;

        assert!(outer.is_err(), "host deadline should fire first");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_diff_delete() -> Result<()> {
        let (reconciler, index) = in_memory();
        index.schedule_after(Some(5));
        let args = instance_args()?;

        let created = reconciler
            .create(
                &urn("vm"),
                &ResourceSpec::Instance(Box::new(args.clone())),
                false,
                &CancellationToken::new(),
            )
            .await?;
        assert_eq!(created.id, "vm");

        let state = match &created.state {
            ResourceState::Instance(state) => state,
            other => bail!("expected an instance, got {:?}", other.kind()),
        };
        let broadcast = &index.broadcasts()[0];
        assert_eq!(broadcast.message_type, MessageType::Instance);
        assert_eq!(broadcast.item_hash, state.message_hash);
        let content: InstanceContent = broadcast.content()?;
        assert_eq!(content.authorized_keys, args.authorized_keys);
        assert_eq!(content.rootfs.size_mib, 20_480);

        let same = ResourceSpec::Instance(Box::new(args.clone()));
        assert_eq!(
            reconciler.diff(&urn("vm"), &created.state, &same).await?,
            DiffResponse::UNCHANGED
        );

        let mut more_memory = args.clone();
        more_memory.resources.memory *= 2;
        let changed = ResourceSpec::Instance(Box::new(more_memory));
        assert_eq!(
            reconciler.diff(&urn("vm"), &created.state, &changed).await?,
            DiffResponse::REPLACE
        );

        reconciler.delete(&urn("vm"), &created.state).await?;
        assert_eq!(index.broadcasts()[1].message_type, MessageType::Forget);
        assert_eq!(
            reconciler.diff(&urn("vm"), &created.state, &same).await?,
            DiffResponse::REPLACE
        );

        reconciler.delete(&urn("vm"), &created.state).await?;
        assert_eq!(index.broadcast_count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_state_round_trips_through_host_json() -> Result<()> {
        let (reconciler, _) = in_memory();
        let preview = reconciler
            .create(
                &urn("vm"),
                &ResourceSpec::Instance(Box::new(instance_args()?)),
                true,
                &CancellationToken::new(),
            )
            .await?;

        let json = serde_json::to_value(&preview.state)?;
        assert_eq!(json["kind"], "instance");
        assert_eq!(json["channel"], "TS-TEST");

        let back: ResourceState = serde_json::from_value(json)?;
        assert_eq!(back, preview.state);
        Ok(())
    }
}
