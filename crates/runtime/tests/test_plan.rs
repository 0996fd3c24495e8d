use std::time::Duration;

use anyhow::Result;
use classroom_chats::SyncPhase;
use classroom_config::{AppConfig, ViewerConfig};
use classroom_runtime::{viewer_from_config, ClientServices};
use httpmock::prelude::*;
use serde_json::json;
use tokio::time::timeout;

fn build_config(base_url: String) -> AppConfig {
    let mut config = AppConfig::default();
    config.api.base_url = base_url;
    config.api.request_timeout_seconds = 2;
    config.realtime.url = "ws://127.0.0.1:9/realtime".to_string();
    config.chat.page_size = 20;
    config.viewer = ViewerConfig {
        user_id: Some("u1".to_string()),
        username: Some("ada".to_string()),
    };
    config
}

#[test]
fn initialise_resolves_viewer_and_page_size() -> Result<()> {
    let services = ClientServices::initialise(&build_config("http://127.0.0.1:3000/api/trpc".into()))?;

    assert_eq!(services.viewer().map(|viewer| viewer.user_id.as_str()), Some("u1"));
    assert_eq!(services.options.page_size, 20);
    Ok(())
}

#[test]
fn initialise_reports_invalid_api_url() {
    let error = match ClientServices::initialise(&build_config("not a url".into())) {
        Ok(_) => panic!("expected an invalid base url to be rejected"),
        Err(error) => error,
    };
    let message = format!("{error:?}");
    assert!(
        message.contains("failed to build rpc client"),
        "expected rpc client context, got {message}"
    );
}

#[test]
fn blank_viewer_id_means_no_viewer() {
    let config = ViewerConfig {
        user_id: Some("   ".to_string()),
        username: Some("ghost".to_string()),
    };
    assert!(viewer_from_config(&config).is_none());
    assert!(viewer_from_config(&ViewerConfig::default()).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn session_loads_conversations_without_realtime() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/trpc/chat.getConversations");
            then.status(200).json_body(json!({
                "result": {"data": [{"id": "c1", "type": "DM", "members": []}]}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/trpc/chat.getConversation");
            then.status(200)
                .json_body(json!({"result": {"data": {"id": "c1", "type": "DM", "members": []}}}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/trpc/chat.getMessages");
            then.status(200)
                .json_body(json!({"result": {"data": {"messages": [], "nextCursor": null}}}));
        })
        .await;

    let services = ClientServices::initialise(&build_config(server.url("/api/trpc")))?;
    let (handle, task) = services.start_session();

    let snapshot = timeout(
        Duration::from_secs(5),
        handle.wait_until(|snapshot| snapshot.conversations.len() == 1),
    )
    .await??;
    assert_eq!(snapshot.conversations[0].id, "c1");

    handle.select_conversation("c1")?;
    timeout(
        Duration::from_secs(5),
        handle.wait_until(|snapshot| snapshot.phase == SyncPhase::Ready),
    )
    .await??;

    handle.shutdown()?;
    task.await?;
    Ok(())
}
