//! The chat procedures of the classroom API, as consumed by the session.
//!
//! `classroom-gateway` implements [`ChatApi`] over HTTP; [`mock::InMemoryChatApi`]
//! implements it in memory for tests and offline demos.

pub mod mock;

use async_trait::async_trait;

use crate::entities::{Conversation, Message};
use crate::types::{
    ChatResult, CreateConversationRequest, ListMessagesRequest, MessagePage, SendMessageRequest,
    UpdateMessageRequest,
};

pub use mock::InMemoryChatApi;

/// Queries and mutations of the chat router
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `chat.getConversations`
    async fn list_conversations(&self) -> ChatResult<Vec<Conversation>>;

    /// `chat.getConversation`
    async fn get_conversation(&self, conversation_id: &str) -> ChatResult<Conversation>;

    /// `chat.getMessages`
    async fn list_messages(&self, request: &ListMessagesRequest) -> ChatResult<MessagePage>;

    /// `chat.sendMessage`
    async fn send_message(&self, request: &SendMessageRequest) -> ChatResult<Message>;

    /// `chat.updateMessage`
    async fn update_message(&self, request: &UpdateMessageRequest) -> ChatResult<Message>;

    /// `chat.deleteMessage`
    async fn delete_message(&self, message_id: &str) -> ChatResult<()>;

    /// `chat.markConversationAsRead`
    async fn mark_conversation_read(&self, conversation_id: &str) -> ChatResult<()>;

    /// `chat.markMentionsAsRead`
    async fn mark_mentions_read(&self, conversation_id: &str) -> ChatResult<()>;

    /// `chat.createConversation`
    async fn create_conversation(
        &self,
        request: &CreateConversationRequest,
    ) -> ChatResult<Conversation>;
}
