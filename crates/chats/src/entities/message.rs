use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attachment::Attachment;
use super::member::Member;
use crate::types::{ConversationId, MessageId, UserId};

/// Prefix of ids assigned to optimistic placeholders before the server confirms them
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Check whether an id belongs to an unconfirmed placeholder
pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Represents a message within a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server id, or a `temp-` id while the send is in flight
    pub id: MessageId,
    /// Message text
    pub content: String,
    /// Snapshot of the sender at send time
    pub sender: Member,
    /// Conversation this message belongs to
    pub conversation_id: ConversationId,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Files attached to the message
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Users mentioned in the message
    #[serde(default, rename = "mentionedUserIds")]
    pub mentions: Vec<UserId>,
    /// Derived locally: the viewer is among `mentions`
    #[serde(default, skip_serializing)]
    pub mentions_me: bool,
    /// Correlation id generated by the sending client and echoed by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl Message {
    /// Build an optimistic placeholder for a send that has not been confirmed yet.
    pub fn placeholder(
        conversation_id: impl Into<ConversationId>,
        content: impl Into<String>,
        mentions: Vec<UserId>,
        sender: Member,
        client_id: &str,
    ) -> Self {
        Self {
            id: format!("{TEMP_ID_PREFIX}{client_id}"),
            content: content.into(),
            sender,
            conversation_id: conversation_id.into(),
            created_at: Utc::now().to_rfc3339(),
            attachments: Vec::new(),
            mentions,
            mentions_me: false,
            client_id: Some(client_id.to_string()),
        }
    }

    /// Generate a fresh correlation id for an outgoing send
    pub fn new_client_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Check if this entry is still an unconfirmed placeholder
    pub fn is_temporary(&self) -> bool {
        is_temporary_id(&self.id)
    }

    /// Check if the given user is mentioned
    pub fn mentions_user(&self, user_id: &str) -> bool {
        self.mentions.iter().any(|mentioned| mentioned == user_id)
    }

    /// Recompute the derived `mentions_me` flag for the given viewer
    pub fn with_viewer(mut self, viewer_id: Option<&str>) -> Self {
        self.refresh_mentions_me(viewer_id);
        self
    }

    pub(crate) fn refresh_mentions_me(&mut self, viewer_id: Option<&str>) {
        self.mentions_me = viewer_id.map_or(false, |id| self.mentions_user(id));
    }

    /// Check if this placeholder could stand for a message with this sender and content.
    ///
    /// Only used when the server did not echo a correlation id.
    pub fn is_placeholder_for(&self, sender_id: &str, content: &str) -> bool {
        self.is_temporary() && self.sender.user_id == sender_id && self.content == content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> Member {
        Member::new("u1", "ada")
    }

    #[test]
    fn test_placeholder_creation() {
        let message = Message::placeholder("c1", "hello", vec![], sender(), "abc");

        assert_eq!(message.id, "temp-abc");
        assert!(message.is_temporary());
        assert_eq!(message.client_id.as_deref(), Some("abc"));
        assert_eq!(message.conversation_id, "c1");
        assert!(chrono::DateTime::parse_from_rfc3339(&message.created_at).is_ok());
    }

    #[test]
    fn test_temporary_id_detection() {
        assert!(is_temporary_id("temp-123"));
        assert!(!is_temporary_id("msg_123"));
        assert!(!is_temporary_id("attempt-1"));
    }

    #[test]
    fn test_mentions_me_is_derived() {
        let message = Message::placeholder("c1", "@grace look", vec!["u2".to_string()], sender(), "x")
            .with_viewer(Some("u2"));
        assert!(message.mentions_me);

        let message = message.with_viewer(Some("u3"));
        assert!(!message.mentions_me);

        let message = message.with_viewer(None);
        assert!(!message.mentions_me);
    }

    #[test]
    fn test_placeholder_matching() {
        let message = Message::placeholder("c1", "ok", vec![], sender(), "x");
        assert!(message.is_placeholder_for("u1", "ok"));
        assert!(!message.is_placeholder_for("u2", "ok"));
        assert!(!message.is_placeholder_for("u1", "ok!"));
    }

    #[test]
    fn test_deserialize_server_message() {
        let json = r#"{
            "id": "m1",
            "content": "Homework is due Friday",
            "sender": {"userId": "u2", "username": "grace", "profile": {"displayName": "Ms. Hopper"}},
            "conversationId": "c1",
            "createdAt": "2024-03-01T10:00:00Z",
            "mentionedUserIds": ["u1"]
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.sender.display_name(), "Ms. Hopper");
        assert!(message.attachments.is_empty());
        assert!(message.client_id.is_none());
        assert!(!message.mentions_me);
        assert!(message.with_viewer(Some("u1")).mentions_me);
    }
}
