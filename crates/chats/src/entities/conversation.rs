use serde::{Deserialize, Serialize};

use super::member::Member;
use crate::types::{ConversationId, UserId};

/// Represents a conversation as listed for the viewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Server identifier
    pub id: ConversationId,
    /// Direct message or group
    #[serde(rename = "type")]
    pub kind: ConversationType,
    /// Display name (groups only)
    #[serde(default)]
    pub name: Option<String>,
    /// Members in server order
    #[serde(default)]
    pub members: Vec<Member>,
    /// Summary of the most recent message
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    /// Messages the viewer has not read yet
    #[serde(default)]
    pub unread_count: u32,
    /// Unread messages mentioning the viewer
    #[serde(default)]
    pub mention_count: u32,
}

/// Conversation type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationType {
    Dm,
    Group,
}

impl From<&str> for ConversationType {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "group" => ConversationType::Group,
            _ => ConversationType::Dm,
        }
    }
}

impl From<ConversationType> for String {
    fn from(kind: ConversationType) -> Self {
        match kind {
            ConversationType::Dm => "DM".to_string(),
            ConversationType::Group => "GROUP".to_string(),
        }
    }
}

/// Last-message summary shown in the conversation list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub content: String,
    #[serde(default)]
    pub sender_id: Option<UserId>,
    pub created_at: String,
}

impl Conversation {
    /// Look up a member by user id
    pub fn member(&self, user_id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.user_id == user_id)
    }

    /// Check if this is a group conversation
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ConversationType::Group)
    }

    /// Title for the conversation list.
    ///
    /// Groups use their name; direct messages show the other participant.
    pub fn title(&self, viewer_id: Option<&str>) -> String {
        if self.is_group() {
            if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
                return name.to_string();
            }
        }

        let others: Vec<&str> = self
            .members
            .iter()
            .filter(|member| Some(member.user_id.as_str()) != viewer_id)
            .map(Member::display_name)
            .collect();

        if others.is_empty() {
            self.name.clone().unwrap_or_else(|| self.id.clone())
        } else {
            others.join(", ")
        }
    }

    /// Check if the viewer has anything unread
    pub fn has_unread(&self) -> bool {
        self.unread_count > 0 || self.mention_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dm() -> Conversation {
        Conversation {
            id: "c1".to_string(),
            kind: ConversationType::Dm,
            name: None,
            members: vec![
                Member::new("u1", "ada"),
                Member::new("u2", "grace").with_display_name("Grace Hopper"),
            ],
            last_message: None,
            unread_count: 0,
            mention_count: 0,
        }
    }

    #[test]
    fn test_dm_title_shows_other_member() {
        assert_eq!(dm().title(Some("u1")), "Grace Hopper");
    }

    #[test]
    fn test_group_title_uses_name() {
        let mut group = dm();
        group.kind = ConversationType::Group;
        group.name = Some("Period 3 Algebra".to_string());
        assert_eq!(group.title(Some("u1")), "Period 3 Algebra");
    }

    #[test]
    fn test_conversation_type_wire_format() {
        assert_eq!(
            serde_json::to_string(&ConversationType::Dm).unwrap(),
            "\"DM\""
        );
        assert_eq!(
            serde_json::from_str::<ConversationType>("\"GROUP\"").unwrap(),
            ConversationType::Group
        );
        assert_eq!(String::from(ConversationType::Group), "GROUP");
        assert_eq!(ConversationType::from("group"), ConversationType::Group);
    }

    #[test]
    fn test_deserialize_with_missing_counters() {
        let json = r#"{"id":"c9","type":"GROUP","name":"Staff","members":[]}"#;
        let conversation: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conversation.unread_count, 0);
        assert!(!conversation.has_unread());
        assert!(conversation.last_message.is_none());
    }
}
