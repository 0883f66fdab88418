//! # Volume Lifecycle
//!
//! Create → Diff → Delete for a folder published as a volume, against the
//! in-memory index.

#[cfg(test)]
mod tests {
    use crate::fixtures::{create_volume, in_memory, source_folder, urn, volume_args, DEV_ADDRESS};
    use anyhow::Result;
    use std::fs;
    use std::time::Duration;
    use tokio::time::Instant;
    use ts_02_messages::{
        is_item_hash, recover_signer, verify_signature, MessageType, StoreContent,
    };
    use ts_03_index_client::MessageIndexApi;
    use ts_04_reconciler::{DiffResponse, ResourceProvider, ResourceSpec, ResourceState};

    const FILES: &[(&str, &[u8])] = &[
        ("index.html", b"<html><body>twentysix</body></html>"),
        ("assets/app.js", b"console.log('ready')"),
        ("assets/img/logo.svg", b"<svg/>"),
    ];

    fn total_size() -> u64 {
        FILES.iter().map(|(_, bytes)| bytes.len() as u64).sum()
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_then_diff_unchanged() -> Result<()> {
        let (reconciler, index) = in_memory();
        let dir = source_folder(FILES)?;

        let state = create_volume(&reconciler, "site", volume_args(&dir)?).await?;

        assert!(is_item_hash(&state.file_hash));
        assert!(is_item_hash(&state.message_hash));
        assert_eq!(state.size, total_size());

        let store = index.get_message_by_hash(&state.message_hash).await?;
        assert_eq!(store.message_type, MessageType::Store);
        assert_eq!(store.sender, DEV_ADDRESS);
        verify_signature(&store)?;
        assert!(recover_signer(&store)?.eq_ignore_ascii_case(DEV_ADDRESS));
        let content: StoreContent = store.content()?;
        assert_eq!(content.item_hash, state.file_hash);

        let diff = reconciler
            .diff(
                &urn("site"),
                &ResourceState::Volume(state),
                &ResourceSpec::Volume(volume_args(&dir)?),
            )
            .await?;
        assert_eq!(diff, DiffResponse::UNCHANGED);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_diff_flips_on_either_condition() -> Result<()> {
        let dir = source_folder(FILES)?;

        // Local content changed, remote intact.
        {
            let (reconciler, _) = in_memory();
            let state = create_volume(&reconciler, "site", volume_args(&dir)?).await?;
            fs::write(dir.path().join("index.html"), b"<html>v2</html>")?;

            let diff = reconciler
                .diff(
                    &urn("site"),
                    &ResourceState::Volume(state),
                    &ResourceSpec::Volume(volume_args(&dir)?),
                )
                .await?;
            assert!(diff.has_changes);
            assert!(!diff.delete_before_replace);
        }

        // Local content intact, remote forgotten.
        {
            let (reconciler, index) = in_memory();
            let state = create_volume(&reconciler, "site", volume_args(&dir)?).await?;
            index.forget_externally(&state.message_hash);

            let diff = reconciler
                .diff(
                    &urn("site"),
                    &ResourceState::Volume(state),
                    &ResourceSpec::Volume(volume_args(&dir)?),
                )
                .await?;
            assert_eq!(diff, DiffResponse::REPLACE);
        }
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_twice_broadcasts_once() -> Result<()> {
        let (reconciler, index) = in_memory();
        let dir = source_folder(FILES)?;
        let state = ResourceState::Volume(create_volume(&reconciler, "site", volume_args(&dir)?).await?);

        reconciler.delete(&urn("site"), &state).await?;
        let after_first = index.broadcast_count();
        assert_eq!(after_first, 1);
        assert_eq!(index.broadcasts()[0].message_type, MessageType::Forget);

        reconciler.delete(&urn("site"), &state).await?;
        assert_eq!(index.broadcast_count(), after_first);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_folder_gives_same_hashes() -> Result<()> {
        let (reconciler, _) = in_memory();
        let first = source_folder(FILES)?;
        let second = source_folder(FILES)?;

        let a = create_volume(&reconciler, "a", volume_args(&first)?).await?;
        let b = create_volume(&reconciler, "b", volume_args(&second)?).await?;

        assert_eq!(a.folder_hash, b.folder_hash);
        assert_eq!(a.file_hash, b.file_hash);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_volumes_keep_their_own_messages() -> Result<()> {
        let (reconciler, index) = in_memory();
        let first = source_folder(FILES)?;
        let second = source_folder(FILES)?;

        let a = create_volume(&reconciler, "a", volume_args(&first)?).await?;
        // STORE payloads carry a millisecond timestamp.
        std::thread::sleep(Duration::from_millis(5));
        let b = create_volume(&reconciler, "b", volume_args(&second)?).await?;

        assert_eq!(a.file_hash, b.file_hash);
        assert_ne!(a.message_hash, b.message_hash);

        reconciler.delete(&urn("b"), &ResourceState::Volume(b)).await?;
        assert!(index.contains(&a.message_hash));

        let diff = reconciler
            .diff(
                &urn("a"),
                &ResourceState::Volume(a),
                &ResourceSpec::Volume(volume_args(&first)?),
            )
            .await?;
        assert_eq!(diff, DiffResponse::UNCHANGED);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_lagging_index_is_waited_out() -> Result<()> {
        let (reconciler, index) = in_memory();
        index.set_index_lag(3);
        let dir = source_folder(FILES)?;

        let started = Instant::now();
        let state = create_volume(&reconciler, "site", volume_args(&dir)?).await?;

        assert!(index.contains(&state.message_hash));
        assert_eq!(started.elapsed(), Duration::from_secs(20));
        Ok(())
    }
}
