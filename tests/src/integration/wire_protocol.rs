//! # Wire Protocol
//!
//! The reconciler over the real HTTP client, against a mock index server.

#[cfg(test)]
mod tests {
    use crate::fixtures::{account, instance_args, source_folder, urn, volume_args, CHANNEL};
    use anyhow::Result;
    use serde_json::{json, Value};
    use tokio_util::sync::CancellationToken;
    use ts_01_identity::derive_identity;
    use ts_02_messages::{ItemType, Message, MessageSender};
    use ts_03_index_client::{
        ClientError, IndexClient, IndexConfig, MessageIndexApi, ReqwestRequester,
    };
    use ts_04_reconciler::{
        DiffResponse, InstanceState, MockVolumePackager, ReconcileError, Reconciler,
        ReconcilerConfig, ResourceProvider, ResourceSpec, ResourceState, VolumeArgs,
        VolumeState,
    };
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    type HttpReconciler = Reconciler<IndexClient<ReqwestRequester>, MockVolumePackager>;

    fn client(server: &MockServer) -> Result<IndexClient<ReqwestRequester>> {
        let config = IndexConfig::with_urls(&server.uri(), &server.uri());
        Ok(IndexClient::from_config(config)?)
    }

    fn reconciler(server: &MockServer) -> Result<HttpReconciler> {
        ts_telemetry::init_test_logging();
        Ok(Reconciler::new(
            client(server)?,
            MockVolumePackager::new(),
            ReconcilerConfig::default(),
        ))
    }

    fn stored_message() -> Result<Message> {
        let sender = MessageSender::new(derive_identity(&account()?.args)?, CHANNEL);
        Ok(sender.store(&"5e".repeat(32), ItemType::Storage)?)
    }

    fn page(messages: &[&Message]) -> Result<Value> {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| serde_json::to_value(m))
            .collect::<Result<_, _>>()?;
        Ok(json!({
            "messages": messages,
            "pagination_page": 1,
            "pagination_per_page": 20,
            "pagination_total": messages.len(),
        }))
    }

    fn accepted() -> Value {
        json!({
            "publication_status": {"status": "success", "failed": []},
            "message_status": "pending"
        })
    }

    fn volume_state(message_hash: &str) -> Result<ResourceState> {
        Ok(ResourceState::Volume(VolumeState {
            args: VolumeArgs {
                account: account()?,
                channel: CHANNEL.to_string(),
                folder_path: "/srv/site".to_string(),
            },
            folder_hash: "ab".repeat(32),
            file_hash: "5e".repeat(32),
            message_hash: message_hash.to_string(),
            size: 4096,
        }))
    }

    #[tokio::test]
    async fn test_ambiguous_lookup_is_not_found() -> Result<()> {
        let server = MockServer::start().await;
        let message = stored_message()?;
        Mock::given(method("GET"))
            .and(path("/api/v0/messages.json"))
            .and(query_param("hashes", message.item_hash.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&[&message, &message])?))
            .mount(&server)
            .await;

        let err = client(&server)?
            .get_message_by_hash(&message.item_hash)
            .await
            .expect_err("two matches must not resolve");
        assert!(matches!(err, ClientError::MessageNotFound(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_upload_stops_before_lookup() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v0/storage/add_file"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"hash": "2d".repeat(32), "status": "rejected"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&[])?))
            .expect(0)
            .mount(&server)
            .await;
        let dir = source_folder(&[("index.html", &b"<h1>rejected</h1>"[..])])?;

        let err = reconciler(&server)?
            .create(
                &urn("site"),
                &ResourceSpec::Volume(volume_args(&dir)?),
                false,
                &CancellationToken::new(),
            )
            .await
            .expect_err("a rejected upload must fail the create");
        assert!(matches!(
            err,
            ReconcileError::Client(ClientError::BroadcastRejected(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_mismatched_upload_hash_fails_create() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v0/storage/add_file"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"hash": "2d".repeat(32), "status": "success"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&[])?))
            .expect(0)
            .mount(&server)
            .await;
        let dir = source_folder(&[("index.html", &b"<h1>mismatch</h1>"[..])])?;

        let err = reconciler(&server)?
            .create(
                &urn("site"),
                &ResourceSpec::Volume(volume_args(&dir)?),
                false,
                &CancellationToken::new(),
            )
            .await
            .expect_err("the index stored different bytes");
        assert!(matches!(err, ReconcileError::Client(ClientError::Upload(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_message_sends_nothing() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v0/messages.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&[])?))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(accepted()))
            .expect(0)
            .mount(&server)
            .await;

        reconciler(&server)?
            .delete(&urn("site"), &volume_state(&"77".repeat(32))?)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_existing_message_forgets_it() -> Result<()> {
        let server = MockServer::start().await;
        let message = stored_message()?;
        Mock::given(method("GET"))
            .and(path("/api/v0/messages.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&[&message])?))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v0/messages"))
            .and(body_partial_json(json!({
                "sync": false,
                "message": {"type": "FORGET", "channel": CHANNEL}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(accepted()))
            .expect(1)
            .mount(&server)
            .await;

        reconciler(&server)?
            .delete(&urn("site"), &volume_state(&message.item_hash)?)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_server_error_surfaces() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = reconciler(&server)?
            .delete(&urn("site"), &volume_state(&"77".repeat(32))?)
            .await
            .expect_err("a 502 is not proof of absence");
        assert!(err.is_transient());
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_instance_fails_before_polling() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v0/messages"))
            .and(body_partial_json(json!({"message": {"type": "INSTANCE"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "publication_status": {"status": "success", "failed": []},
                "message_status": "rejected"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(0)
            .mount(&server)
            .await;

        let err = reconciler(&server)?
            .create(
                &urn("vm"),
                &ResourceSpec::Instance(Box::new(instance_args()?)),
                false,
                &CancellationToken::new(),
            )
            .await
            .expect_err("rejection is fatal");
        assert!(matches!(err, ReconcileError::Client(ClientError::BroadcastRejected(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_instance_diff_follows_scheduler() -> Result<()> {
        let server = MockServer::start().await;
        let live = "aa".repeat(32);
        let gone = "bb".repeat(32);
        Mock::given(method("GET"))
            .and(path(format!("/api/v0/allocation/{live}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "vm_hash": live,
                "vm_type": "instance",
                "vm_ipv6": "2001:db8::1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/api/v0/allocation/{gone}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let reconciler = reconciler(&server)?;
        let args = instance_args()?;
        let spec = ResourceSpec::Instance(Box::new(args.clone()));
        let state = |hash: &str| {
            ResourceState::Instance(Box::new(InstanceState {
                args: args.clone(),
                scheduler_allocation: None,
                message_hash: hash.to_string(),
            }))
        };

        assert_eq!(
            reconciler.diff(&urn("vm"), &state(&live), &spec).await?,
            DiffResponse::UNCHANGED
        );
        assert_eq!(
            reconciler.diff(&urn("vm"), &state(&gone), &spec).await?,
            DiffResponse::REPLACE
        );
        Ok(())
    }
}
