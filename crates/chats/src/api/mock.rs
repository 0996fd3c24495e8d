//! In-memory implementation of the chat procedures.
//!
//! Behaves like the classroom backend for a single acting user: pages are
//! served newest first with an index cursor, mutations publish the same push
//! events the server would when a [`LocalPushHub`] is attached.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::ChatApi;
use crate::entities::{Conversation, ConversationType, LastMessage, Member, Message};
use crate::push::{conversation_channel, user_channel, LocalPushHub};
use crate::types::{
    ChatError, ChatResult, ConversationId, CreateConversationRequest, ListMessagesRequest,
    MessageDeletedPayload, MessagePage, MessageUpdatedPayload, NewMessagePayload, PushEvent,
    ReadStatePayload, SendMessageRequest, UpdateMessageRequest,
};

#[derive(Debug, Default)]
struct Backend {
    conversations: Vec<Conversation>,
    messages: HashMap<ConversationId, Vec<Message>>,
    next_id: u64,
    offline: bool,
    echo_client_id: bool,
}

impl Backend {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn conversation_mut(&mut self, conversation_id: &str) -> ChatResult<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|conversation| conversation.id == conversation_id)
            .ok_or_else(|| ChatError::conversation_not_found(conversation_id))
    }

    fn store(&mut self, message: Message) {
        if let Ok(conversation) = self.conversation_mut(&message.conversation_id) {
            conversation.last_message = Some(LastMessage {
                content: message.content.clone(),
                sender_id: Some(message.sender.user_id.clone()),
                created_at: message.created_at.clone(),
            });
        }
        self.messages
            .entry(message.conversation_id.clone())
            .or_default()
            .push(message);
    }
}

/// Chat backend kept in memory, acting as one user
#[derive(Clone)]
pub struct InMemoryChatApi {
    acting: Member,
    backend: Arc<RwLock<Backend>>,
    hub: Option<LocalPushHub>,
}

impl InMemoryChatApi {
    pub fn new(acting: Member) -> Self {
        Self {
            acting,
            backend: Arc::new(RwLock::new(Backend {
                echo_client_id: true,
                ..Backend::default()
            })),
            hub: None,
        }
    }

    /// Publish push events on `hub` for every change
    pub fn with_push(mut self, hub: LocalPushHub) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn acting(&self) -> &Member {
        &self.acting
    }

    pub async fn add_conversation(&self, conversation: Conversation) {
        let mut backend = self.backend.write().await;
        backend.conversations.push(conversation);
    }

    /// Store `count` messages from `sender` without publishing anything
    pub async fn seed_messages(
        &self,
        conversation_id: &str,
        sender: &Member,
        count: usize,
    ) -> Vec<Message> {
        let mut backend = self.backend.write().await;
        (0..count)
            .map(|index| {
                let message = Message {
                    id: backend.next_id("msg"),
                    content: format!("message {}", index + 1),
                    sender: sender.clone(),
                    conversation_id: conversation_id.to_string(),
                    created_at: Utc::now().to_rfc3339(),
                    attachments: Vec::new(),
                    mentions: Vec::new(),
                    mentions_me: false,
                    client_id: None,
                };
                backend.store(message.clone());
                message
            })
            .collect()
    }

    /// Simulate another user posting into a conversation
    pub async fn inject_message(
        &self,
        conversation_id: &str,
        sender: &Member,
        content: &str,
        mentions: Vec<String>,
    ) -> ChatResult<Message> {
        let (message, members) = {
            let mut backend = self.backend.write().await;
            let id = backend.next_id("msg");
            let mentions_acting = mentions.contains(&self.acting.user_id);

            let conversation = backend.conversation_mut(conversation_id)?;
            conversation.unread_count += 1;
            if mentions_acting {
                conversation.mention_count += 1;
            }
            let members = conversation.members.clone();

            let message = Message {
                id,
                content: content.to_string(),
                sender: sender.clone(),
                conversation_id: conversation_id.to_string(),
                created_at: Utc::now().to_rfc3339(),
                attachments: Vec::new(),
                mentions,
                mentions_me: false,
                client_id: None,
            };
            backend.store(message.clone());
            (message, members)
        };

        self.publish_new_message(&message, &members).await;
        Ok(message)
    }

    /// Fail every call with a transport error while set
    pub async fn set_offline(&self, offline: bool) {
        self.backend.write().await.offline = offline;
    }

    /// Whether sent messages carry the client's correlation id back
    pub async fn set_echo_client_id(&self, echo: bool) {
        self.backend.write().await.echo_client_id = echo;
    }

    pub async fn messages(&self, conversation_id: &str) -> Vec<Message> {
        let backend = self.backend.read().await;
        backend
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn conversation(&self, conversation_id: &str) -> Option<Conversation> {
        let backend = self.backend.read().await;
        backend
            .conversations
            .iter()
            .find(|conversation| conversation.id == conversation_id)
            .cloned()
    }

    async fn ensure_online(&self) -> ChatResult<()> {
        if self.backend.read().await.offline {
            return Err(ChatError::transport("network unreachable"));
        }
        Ok(())
    }

    async fn publish(&self, channel: String, event: PushEvent) {
        if let Some(hub) = &self.hub {
            let reached = hub.publish(&channel, event).await;
            debug!(%channel, reached, "published push event");
        }
    }

    async fn publish_new_message(&self, message: &Message, members: &[Member]) {
        let event = PushEvent::NewMessage(NewMessagePayload::from_message(message));
        self.publish(conversation_channel(&message.conversation_id), event.clone())
            .await;
        for member in members {
            self.publish(user_channel(&member.user_id), event.clone()).await;
        }
    }

    fn find_message<'a>(
        messages: &'a mut HashMap<ConversationId, Vec<Message>>,
        message_id: &str,
    ) -> ChatResult<&'a mut Message> {
        messages
            .values_mut()
            .flat_map(|messages| messages.iter_mut())
            .find(|message| message.id == message_id)
            .ok_or_else(|| ChatError::message_not_found(message_id))
    }
}

#[async_trait]
impl ChatApi for InMemoryChatApi {
    async fn list_conversations(&self) -> ChatResult<Vec<Conversation>> {
        self.ensure_online().await?;
        Ok(self.backend.read().await.conversations.clone())
    }

    async fn get_conversation(&self, conversation_id: &str) -> ChatResult<Conversation> {
        self.ensure_online().await?;
        self.conversation(conversation_id)
            .await
            .ok_or_else(|| ChatError::conversation_not_found(conversation_id))
    }

    async fn list_messages(&self, request: &ListMessagesRequest) -> ChatResult<MessagePage> {
        self.ensure_online().await?;
        let backend = self.backend.read().await;
        if !backend
            .conversations
            .iter()
            .any(|conversation| conversation.id == request.conversation_id)
        {
            return Err(ChatError::conversation_not_found(&request.conversation_id));
        }

        let messages = backend
            .messages
            .get(&request.conversation_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let end = match request.cursor.as_deref() {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| ChatError::validation(format!("Invalid cursor: {cursor}")))?
                .min(messages.len()),
            None => messages.len(),
        };
        let start = end.saturating_sub(request.limit as usize);

        Ok(MessagePage {
            messages: messages[start..end].to_vec(),
            next_cursor: (start > 0).then(|| start.to_string()),
        })
    }

    async fn send_message(&self, request: &SendMessageRequest) -> ChatResult<Message> {
        self.ensure_online().await?;
        request.validate()?;

        let (message, members) = {
            let mut backend = self.backend.write().await;
            let id = backend.next_id("msg");
            let echo = backend.echo_client_id;

            let conversation = backend.conversation_mut(&request.conversation_id)?;
            let sender = conversation
                .member(&self.acting.user_id)
                .cloned()
                .unwrap_or_else(|| self.acting.clone());
            let members = conversation.members.clone();

            let message = Message {
                id,
                content: request.content.clone(),
                sender,
                conversation_id: request.conversation_id.clone(),
                created_at: Utc::now().to_rfc3339(),
                attachments: Vec::new(),
                mentions: request.mentioned_user_ids.clone(),
                mentions_me: false,
                client_id: if echo { request.client_id.clone() } else { None },
            };
            backend.store(message.clone());
            (message, members)
        };

        self.publish_new_message(&message, &members).await;
        Ok(message)
    }

    async fn update_message(&self, request: &UpdateMessageRequest) -> ChatResult<Message> {
        self.ensure_online().await?;
        request.validate()?;

        let message = {
            let mut backend = self.backend.write().await;
            let message = Self::find_message(&mut backend.messages, &request.message_id)?;
            if message.sender.user_id != self.acting.user_id {
                return Err(ChatError::rpc(
                    "FORBIDDEN",
                    Some(403),
                    "Only the author can edit a message",
                ));
            }
            message.content = request.content.clone();
            message.mentions = request.mentioned_user_ids.clone();
            message.clone()
        };

        let event = PushEvent::MessageUpdated(MessageUpdatedPayload {
            id: message.id.clone(),
            conversation_id: message.conversation_id.clone(),
            content: message.content.clone(),
            mentioned_user_ids: Some(message.mentions.clone()),
        });
        self.publish(conversation_channel(&message.conversation_id), event)
            .await;
        Ok(message)
    }

    async fn delete_message(&self, message_id: &str) -> ChatResult<()> {
        self.ensure_online().await?;

        let conversation_id = {
            let mut backend = self.backend.write().await;
            let message = Self::find_message(&mut backend.messages, message_id)?;
            if message.sender.user_id != self.acting.user_id {
                return Err(ChatError::rpc(
                    "FORBIDDEN",
                    Some(403),
                    "Only the author can delete a message",
                ));
            }
            let conversation_id = message.conversation_id.clone();
            if let Some(messages) = backend.messages.get_mut(&conversation_id) {
                messages.retain(|message| message.id != message_id);
            }
            conversation_id
        };

        let event = PushEvent::MessageDeleted(MessageDeletedPayload {
            message_id: message_id.to_string(),
            conversation_id: conversation_id.clone(),
        });
        self.publish(conversation_channel(&conversation_id), event).await;
        Ok(())
    }

    async fn mark_conversation_read(&self, conversation_id: &str) -> ChatResult<()> {
        self.ensure_online().await?;
        {
            let mut backend = self.backend.write().await;
            let conversation = backend.conversation_mut(conversation_id)?;
            conversation.unread_count = 0;
            conversation.mention_count = 0;
        }

        let event = PushEvent::ConversationViewed(ReadStatePayload {
            conversation_id: conversation_id.to_string(),
            user_id: Some(self.acting.user_id.clone()),
        });
        self.publish(user_channel(&self.acting.user_id), event).await;
        Ok(())
    }

    async fn mark_mentions_read(&self, conversation_id: &str) -> ChatResult<()> {
        self.ensure_online().await?;
        {
            let mut backend = self.backend.write().await;
            backend.conversation_mut(conversation_id)?.mention_count = 0;
        }

        let event = PushEvent::MentionsViewed(ReadStatePayload {
            conversation_id: conversation_id.to_string(),
            user_id: Some(self.acting.user_id.clone()),
        });
        self.publish(user_channel(&self.acting.user_id), event).await;
        Ok(())
    }

    async fn create_conversation(
        &self,
        request: &CreateConversationRequest,
    ) -> ChatResult<Conversation> {
        self.ensure_online().await?;
        request.validate()?;

        let mut backend = self.backend.write().await;
        if request.kind == ConversationType::Dm {
            let existing = backend.conversations.iter().find(|conversation| {
                conversation.kind == ConversationType::Dm
                    && conversation.member(&self.acting.user_id).is_some()
                    && request
                        .member_ids
                        .iter()
                        .all(|member_id| conversation.member(member_id).is_some())
            });
            if let Some(existing) = existing {
                return Ok(existing.clone());
            }
        }

        let mut members = vec![self.acting.clone()];
        members.extend(
            request
                .member_ids
                .iter()
                .filter(|member_id| **member_id != self.acting.user_id)
                .map(|member_id| Member::new(member_id.as_str(), member_id.as_str())),
        );

        let conversation = Conversation {
            id: backend.next_id("conv"),
            kind: request.kind,
            name: request.name.clone(),
            members,
            last_message: None,
            unread_count: 0,
            mention_count: 0,
        };
        backend.conversations.push(conversation.clone());
        Ok(conversation)
    }
}
