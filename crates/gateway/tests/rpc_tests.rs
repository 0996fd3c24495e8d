//! tRPC client against a mocked classroom API.

use classroom_chats::{
    ChatApi, ChatError, CreateConversationRequest, ListMessagesRequest, SendMessageRequest,
};
use classroom_config::ApiConfig;
use classroom_gateway::{GatewayError, RpcClient};
use httpmock::prelude::*;
use serde_json::json;

fn client(server: &MockServer, token: Option<&str>) -> RpcClient {
    RpcClient::new(&ApiConfig {
        base_url: server.url("/api/trpc/"),
        token: token.map(str::to_string),
        request_timeout_seconds: 5,
    })
    .expect("client builds")
}

fn message_json(id: &str, content: &str, client_id: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "content": content,
        "sender": {"userId": "u1", "username": "ada", "profile": {"displayName": "Ada"}},
        "conversationId": "c1",
        "createdAt": "2024-03-01T10:00:00Z",
        "attachments": [],
        "mentionedUserIds": [],
        "clientId": client_id
    })
}

#[tokio::test]
async fn list_conversations_unwraps_result_envelope() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/trpc/chat.getConversations")
                .header("authorization", "Bearer secret");
            then.status(200).json_body(json!({
                "result": {"data": [{
                    "id": "c1",
                    "type": "GROUP",
                    "name": "Biology 101",
                    "members": [{"userId": "u1", "username": "ada"}],
                    "unreadCount": 3,
                    "mentionCount": 1
                }]}
            }));
        })
        .await;

    let conversations = client(&server, Some("secret"))
        .list_conversations()
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].name.as_deref(), Some("Biology 101"));
    assert_eq!(conversations[0].unread_count, 3);
}

#[tokio::test]
async fn list_messages_sends_input_as_query_parameter() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/trpc/chat.getMessages")
                .query_param("input", r#"{"conversationId":"c1","cursor":"50","limit":50}"#);
            then.status(200).json_body(json!({
                "result": {"data": {
                    "messages": [message_json("m1", "hello", None)],
                    "nextCursor": null
                }}
            }));
        })
        .await;

    let page = client(&server, None)
        .list_messages(&ListMessagesRequest {
            conversation_id: "c1".to_string(),
            cursor: Some("50".to_string()),
            limit: 50,
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(page.messages[0].id, "m1");
    assert_eq!(page.messages[0].sender.display_name(), "Ada");
    assert!(!page.has_more());
}

#[tokio::test]
async fn send_message_posts_json_body() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/trpc/chat.sendMessage")
                .json_body(json!({
                    "conversationId": "c1",
                    "content": "hello",
                    "mentionedUserIds": ["u2"],
                    "clientId": "abc"
                }));
            then.status(200).json_body(json!({
                "result": {"data": message_json("m9", "hello", Some("abc"))}
            }));
        })
        .await;

    let message = client(&server, None)
        .send_message(&SendMessageRequest {
            conversation_id: "c1".to_string(),
            content: "hello".to_string(),
            mentioned_user_ids: vec!["u2".to_string()],
            client_id: Some("abc".to_string()),
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(message.id, "m9");
    assert_eq!(message.client_id.as_deref(), Some("abc"));
}

#[tokio::test]
async fn delete_message_ignores_output() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/trpc/chat.deleteMessage")
                .json_body(json!({"messageId": "m1"}));
            then.status(200)
                .json_body(json!({"result": {"data": {"success": true}}}));
        })
        .await;

    client(&server, None).delete_message("m1").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn mark_read_mutations_use_conversation_ref() {
    let server = MockServer::start_async().await;
    let conversation = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/trpc/chat.markConversationAsRead")
                .json_body(json!({"conversationId": "c1"}));
            then.status(200).json_body(json!({"result": {}}));
        })
        .await;
    let mentions = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/trpc/chat.markMentionsAsRead")
                .json_body(json!({"conversationId": "c1"}));
            then.status(200).json_body(json!({"result": {"data": null}}));
        })
        .await;

    let client = client(&server, None);
    client.mark_conversation_read("c1").await.unwrap();
    client.mark_mentions_read("c1").await.unwrap();

    conversation.assert_async().await;
    mentions.assert_async().await;
}

#[tokio::test]
async fn create_conversation_serialises_type() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/trpc/chat.createConversation")
                .json_body(json!({"type": "DM", "memberIds": ["u2"]}));
            then.status(200).json_body(json!({
                "result": {"data": {"id": "c7", "type": "DM", "members": []}}
            }));
        })
        .await;

    let conversation = client(&server, None)
        .create_conversation(&CreateConversationRequest::direct("u2"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(conversation.id, "c7");
    assert!(!conversation.is_group());
}

#[tokio::test]
async fn error_envelope_maps_to_rpc_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/trpc/chat.getConversation");
            then.status(404).json_body(json!({
                "error": {
                    "message": "Conversation not found",
                    "code": -32004,
                    "data": {"code": "NOT_FOUND", "httpStatus": 404}
                }
            }));
        })
        .await;

    let err = client(&server, None)
        .get_conversation("missing")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ChatError::rpc("NOT_FOUND", Some(404), "Conversation not found")
    );
}

#[tokio::test]
async fn unauthorized_maps_to_unauthenticated() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/trpc/chat.sendMessage");
            then.status(401).json_body(json!({
                "error": {
                    "message": "Not signed in",
                    "code": -32001,
                    "data": {"code": "UNAUTHORIZED", "httpStatus": 401}
                }
            }));
        })
        .await;

    let err = client(&server, None)
        .send_message(&SendMessageRequest {
            conversation_id: "c1".to_string(),
            content: "hi".to_string(),
            mentioned_user_ids: vec![],
            client_id: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err, ChatError::Unauthenticated);
}

#[tokio::test]
async fn non_json_failure_keeps_http_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/trpc/chat.getConversations");
            then.status(502).body("<html>Bad gateway</html>");
        })
        .await;

    let err = client(&server, None).list_conversations().await.unwrap_err();
    assert!(matches!(err, ChatError::Rpc { status: Some(502), .. }));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let client = RpcClient::new(&ApiConfig {
        base_url: "http://127.0.0.1:9/api/trpc".to_string(),
        token: None,
        request_timeout_seconds: 2,
    })
    .unwrap();

    let err = client.list_conversations().await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {err:?}");
}

#[test]
fn rejects_non_http_base_url() {
    let result = RpcClient::new(&ApiConfig {
        base_url: "ftp://example.com".to_string(),
        token: None,
        request_timeout_seconds: 5,
    });
    assert!(matches!(result, Err(GatewayError::InvalidEndpoint(_))));
}
