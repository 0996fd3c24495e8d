//! Event types delivered over the push channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{ChatError, ChatResult};
use super::{ConversationId, MessageId, UserId};
use crate::entities::{Attachment, Member, Message, Profile};

/// Sender details embedded in a new-message event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SenderSnapshot {
    pub username: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

/// Payload of a `new-message` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewMessagePayload {
    pub id: MessageId,
    pub content: String,
    pub sender_id: UserId,
    pub sender: SenderSnapshot,
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub mentioned_user_ids: Vec<UserId>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl NewMessagePayload {
    /// Build the payload the server would broadcast for a stored message
    pub fn from_message(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            content: message.content.clone(),
            sender_id: message.sender.user_id.clone(),
            sender: SenderSnapshot {
                username: message.sender.username.clone(),
                profile: message.sender.profile.clone(),
            },
            conversation_id: message.conversation_id.clone(),
            attachments: message.attachments.clone(),
            mentioned_user_ids: message.mentions.clone(),
            created_at: message.created_at.clone(),
            client_id: message.client_id.clone(),
        }
    }

    /// Convert into the message view model (without the viewer-derived flag)
    pub fn into_message(self) -> Message {
        Message {
            id: self.id,
            content: self.content,
            sender: Member {
                user_id: self.sender_id,
                username: self.sender.username,
                profile: self.sender.profile,
            },
            conversation_id: self.conversation_id,
            created_at: self.created_at,
            attachments: self.attachments,
            mentions: self.mentioned_user_ids,
            mentions_me: false,
            client_id: self.client_id,
        }
    }
}

/// Payload of a `message-updated` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageUpdatedPayload {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentioned_user_ids: Option<Vec<UserId>>,
}

/// Payload of a `message-deleted` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeletedPayload {
    pub message_id: MessageId,
    pub conversation_id: ConversationId,
}

/// Payload of the read-state events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReadStatePayload {
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// Events pushed by the server on a conversation or user channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    NewMessage(NewMessagePayload),
    MessageUpdated(MessageUpdatedPayload),
    MessageDeleted(MessageDeletedPayload),
    ConversationViewed(ReadStatePayload),
    MentionsViewed(ReadStatePayload),
}

impl PushEvent {
    pub const NEW_MESSAGE: &'static str = "new-message";
    pub const MESSAGE_UPDATED: &'static str = "message-updated";
    pub const MESSAGE_DELETED: &'static str = "message-deleted";
    pub const CONVERSATION_VIEWED: &'static str = "conversation-viewed";
    pub const MENTIONS_VIEWED: &'static str = "mentions-viewed";

    /// Get the conversation this event concerns
    pub fn conversation_id(&self) -> &str {
        match self {
            PushEvent::NewMessage(payload) => &payload.conversation_id,
            PushEvent::MessageUpdated(payload) => &payload.conversation_id,
            PushEvent::MessageDeleted(payload) => &payload.conversation_id,
            PushEvent::ConversationViewed(payload) | PushEvent::MentionsViewed(payload) => {
                &payload.conversation_id
            }
        }
    }

    /// Wire name of the event, also used for logging
    pub fn event_name(&self) -> &'static str {
        match self {
            PushEvent::NewMessage(_) => Self::NEW_MESSAGE,
            PushEvent::MessageUpdated(_) => Self::MESSAGE_UPDATED,
            PushEvent::MessageDeleted(_) => Self::MESSAGE_DELETED,
            PushEvent::ConversationViewed(_) => Self::CONVERSATION_VIEWED,
            PushEvent::MentionsViewed(_) => Self::MENTIONS_VIEWED,
        }
    }

    /// Check if the event changes read badges rather than messages
    pub fn is_read_state(&self) -> bool {
        matches!(
            self,
            PushEvent::ConversationViewed(_) | PushEvent::MentionsViewed(_)
        )
    }

    /// Decode an event from its wire name and JSON payload.
    ///
    /// Returns `Ok(None)` for event names this client does not handle.
    pub fn decode(event: &str, data: Value) -> ChatResult<Option<Self>> {
        let decoded = match event {
            Self::NEW_MESSAGE => PushEvent::NewMessage(serde_json::from_value(data)?),
            Self::MESSAGE_UPDATED => PushEvent::MessageUpdated(serde_json::from_value(data)?),
            Self::MESSAGE_DELETED => PushEvent::MessageDeleted(serde_json::from_value(data)?),
            Self::CONVERSATION_VIEWED => {
                PushEvent::ConversationViewed(serde_json::from_value(data)?)
            }
            Self::MENTIONS_VIEWED => PushEvent::MentionsViewed(serde_json::from_value(data)?),
            _ => return Ok(None),
        };
        Ok(Some(decoded))
    }

    /// Encode the payload as JSON
    pub fn payload(&self) -> ChatResult<Value> {
        let value = match self {
            PushEvent::NewMessage(payload) => serde_json::to_value(payload)?,
            PushEvent::MessageUpdated(payload) => serde_json::to_value(payload)?,
            PushEvent::MessageDeleted(payload) => serde_json::to_value(payload)?,
            PushEvent::ConversationViewed(payload) | PushEvent::MentionsViewed(payload) => {
                serde_json::to_value(payload)?
            }
        };
        Ok(value)
    }
}

/// Frame sent by the push server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushFrame {
    pub channel: String,
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl PushFrame {
    /// Wrap an event for delivery on a channel
    pub fn new(channel: impl Into<String>, event: &PushEvent) -> ChatResult<Self> {
        Ok(Self {
            channel: channel.into(),
            event: event.event_name().to_string(),
            data: event.payload()?,
        })
    }

    /// Decode the carried event, `Ok(None)` for unknown event names
    pub fn into_event(self) -> ChatResult<Option<PushEvent>> {
        PushEvent::decode(&self.event, self.data)
    }
}

/// Frames sent by the client to the push server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Heartbeat to keep the connection alive
    Ping,
    /// Start receiving events of a channel
    Subscribe { channel: String },
    /// Stop receiving events of a channel
    Unsubscribe { channel: String },
}

impl ClientFrame {
    pub fn to_json(&self) -> ChatResult<String> {
        serde_json::to_string(self).map_err(ChatError::from)
    }
}
