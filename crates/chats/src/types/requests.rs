//! Inputs of the chat RPC procedures.

use serde::{Deserialize, Serialize};

use super::errors::{ChatError, ChatResult};
use super::{ConversationId, MessageId, UserId};
use crate::entities::ConversationType;
use crate::utils::Validator;

/// Input of `chat.getConversation`, `chat.markConversationAsRead` and `chat.markMentionsAsRead`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRef {
    pub conversation_id: ConversationId,
}

impl ConversationRef {
    pub fn new(conversation_id: impl Into<ConversationId>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
        }
    }
}

/// Input of `chat.getMessages`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesRequest {
    pub conversation_id: ConversationId,
    /// Opaque cursor of the previous page; absent for the newest page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub limit: u32,
}

/// Input of `chat.sendMessage`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub conversation_id: ConversationId,
    pub content: String,
    #[serde(default)]
    pub mentioned_user_ids: Vec<UserId>,
    /// Correlation id the server echoes back on the confirmed message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl SendMessageRequest {
    /// Validate the send request
    pub fn validate(&self) -> ChatResult<()> {
        Validator::message_content(&self.content)?;
        Validator::mentions(&self.mentioned_user_ids)
    }
}

/// Input of `chat.updateMessage`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessageRequest {
    pub message_id: MessageId,
    pub content: String,
    #[serde(default)]
    pub mentioned_user_ids: Vec<UserId>,
}

impl UpdateMessageRequest {
    /// Validate the update request
    pub fn validate(&self) -> ChatResult<()> {
        Validator::message_content(&self.content)?;
        Validator::mentions(&self.mentioned_user_ids)
    }
}

/// Input of `chat.deleteMessage`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessageRequest {
    pub message_id: MessageId,
}

/// Input of `chat.createConversation`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    #[serde(rename = "type")]
    pub kind: ConversationType,
    pub member_ids: Vec<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CreateConversationRequest {
    /// Direct message with a single other user
    pub fn direct(member_id: impl Into<UserId>) -> Self {
        Self {
            kind: ConversationType::Dm,
            member_ids: vec![member_id.into()],
            name: None,
        }
    }

    /// Named group with the given members
    pub fn group(name: impl Into<String>, member_ids: Vec<UserId>) -> Self {
        Self {
            kind: ConversationType::Group,
            member_ids,
            name: Some(name.into()),
        }
    }

    /// Validate the create request
    pub fn validate(&self) -> ChatResult<()> {
        Validator::mentions(&self.member_ids)?;

        match self.kind {
            ConversationType::Dm => {
                if self.member_ids.len() != 1 {
                    return Err(ChatError::validation(
                        "A direct message needs exactly one other member",
                    ));
                }
            }
            ConversationType::Group => {
                let name = self.name.as_deref().unwrap_or_default();
                Validator::conversation_name(name)?;
                if self.member_ids.is_empty() {
                    return Err(ChatError::validation("A group needs at least one member"));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_request_wire_format() {
        let request = SendMessageRequest {
            conversation_id: "c1".to_string(),
            content: "hi".to_string(),
            mentioned_user_ids: vec!["u2".to_string()],
            client_id: Some("abc".to_string()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["conversationId"], "c1");
        assert_eq!(json["mentionedUserIds"][0], "u2");
        assert_eq!(json["clientId"], "abc");
    }

    #[test]
    fn test_send_request_validation() {
        let mut request = SendMessageRequest {
            conversation_id: "c1".to_string(),
            content: "   ".to_string(),
            mentioned_user_ids: vec![],
            client_id: None,
        };
        assert!(request.validate().is_err());

        request.content = "hello".to_string();
        assert!(request.validate().is_ok());

        request.mentioned_user_ids = vec![String::new()];
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_list_request_omits_missing_cursor() {
        let request = ListMessagesRequest {
            conversation_id: "c1".to_string(),
            cursor: None,
            limit: 50,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"conversationId":"c1","limit":50}"#);
    }

    #[test]
    fn test_create_conversation_validation() {
        assert!(CreateConversationRequest::direct("u2").validate().is_ok());
        assert!(CreateConversationRequest::group("Science club", vec!["u2".into(), "u3".into()])
            .validate()
            .is_ok());

        let mut dm = CreateConversationRequest::direct("u2");
        dm.member_ids.push("u3".to_string());
        assert!(dm.validate().is_err());

        let unnamed = CreateConversationRequest {
            kind: ConversationType::Group,
            member_ids: vec!["u2".to_string()],
            name: None,
        };
        assert!(unnamed.validate().is_err());
    }
}
