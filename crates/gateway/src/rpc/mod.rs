//! tRPC client for the chat router.
//!
//! Queries are sent as `GET {base}/{procedure}?input=<json>`, mutations as
//! `POST {base}/{procedure}` with a JSON body.

mod envelope;

use std::time::Duration;

use async_trait::async_trait;
use classroom_chats::types::{ConversationRef, DeleteMessageRequest};
use classroom_chats::{
    ChatApi, ChatResult, Conversation, CreateConversationRequest, ListMessagesRequest, Message,
    MessagePage, SendMessageRequest, UpdateMessageRequest,
};
use classroom_config::ApiConfig;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};

/// HTTP client bound to one tRPC endpoint
#[derive(Clone)]
pub struct RpcClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl RpcClient {
    pub fn new(config: &ApiConfig) -> GatewayResult<Self> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(GatewayError::InvalidEndpoint(config.base_url.clone()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, procedure: &str) -> String {
        format!("{}/{}", self.base_url, procedure)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Run a query procedure
    pub async fn query<I, O>(&self, procedure: &str, input: Option<&I>) -> GatewayResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let mut request = self.client.get(self.endpoint(procedure));
        if let Some(input) = input {
            request = request.query(&[("input", serde_json::to_string(input)?)]);
        }

        debug!(procedure, "rpc query");
        let response = self.authorize(request).send().await?;
        read_response(procedure, response).await
    }

    /// Run a mutation procedure
    pub async fn mutation<I, O>(&self, procedure: &str, input: &I) -> GatewayResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let request = self.client.post(self.endpoint(procedure)).json(input);

        debug!(procedure, "rpc mutation");
        let response = self.authorize(request).send().await?;
        read_response(procedure, response).await
    }
}

async fn read_response<O: DeserializeOwned>(procedure: &str, response: Response) -> GatewayResult<O> {
    let status = response.status();
    let text = response.text().await?;

    let body: Value = match serde_json::from_str(&text) {
        Ok(body) => body,
        Err(_) if !status.is_success() => {
            return Err(GatewayError::UnexpectedResponse {
                procedure: procedure.to_string(),
                status: status.as_u16(),
            });
        }
        Err(error) => return Err(error.into()),
    };

    envelope::decode(procedure, status.as_u16(), body)
}

#[async_trait]
impl ChatApi for RpcClient {
    async fn list_conversations(&self) -> ChatResult<Vec<Conversation>> {
        Ok(self.query::<(), _>("chat.getConversations", None).await?)
    }

    async fn get_conversation(&self, conversation_id: &str) -> ChatResult<Conversation> {
        let input = ConversationRef::new(conversation_id);
        Ok(self.query("chat.getConversation", Some(&input)).await?)
    }

    async fn list_messages(&self, request: &ListMessagesRequest) -> ChatResult<MessagePage> {
        Ok(self.query("chat.getMessages", Some(request)).await?)
    }

    async fn send_message(&self, request: &SendMessageRequest) -> ChatResult<Message> {
        Ok(self.mutation("chat.sendMessage", request).await?)
    }

    async fn update_message(&self, request: &UpdateMessageRequest) -> ChatResult<Message> {
        Ok(self.mutation("chat.updateMessage", request).await?)
    }

    async fn delete_message(&self, message_id: &str) -> ChatResult<()> {
        let input = DeleteMessageRequest {
            message_id: message_id.to_string(),
        };
        self.mutation::<_, IgnoredAny>("chat.deleteMessage", &input)
            .await?;
        Ok(())
    }

    async fn mark_conversation_read(&self, conversation_id: &str) -> ChatResult<()> {
        let input = ConversationRef::new(conversation_id);
        self.mutation::<_, IgnoredAny>("chat.markConversationAsRead", &input)
            .await?;
        Ok(())
    }

    async fn mark_mentions_read(&self, conversation_id: &str) -> ChatResult<()> {
        let input = ConversationRef::new(conversation_id);
        self.mutation::<_, IgnoredAny>("chat.markMentionsAsRead", &input)
            .await?;
        Ok(())
    }

    async fn create_conversation(
        &self,
        request: &CreateConversationRequest,
    ) -> ChatResult<Conversation> {
        Ok(self.mutation("chat.createConversation", request).await?)
    }
}
