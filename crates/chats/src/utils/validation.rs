//! Validation utilities.

use crate::types::{ChatError, UserId};

/// Longest message the client will send
pub const MAX_MESSAGE_LENGTH: usize = 10_000;

/// Longest group name accepted
pub const MAX_CONVERSATION_NAME_LENGTH: usize = 100;

/// Validation utilities
pub struct Validator;

impl Validator {
    /// Validate message content
    pub fn message_content(content: &str) -> Result<(), ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::validation("Message content cannot be empty"));
        }

        if content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ChatError::validation(format!(
                "Message content too long (max {} characters)",
                MAX_MESSAGE_LENGTH
            )));
        }

        Ok(())
    }

    /// Validate a list of user ids (mentions or members)
    pub fn mentions(user_ids: &[UserId]) -> Result<(), ChatError> {
        if user_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ChatError::validation("User ids cannot be empty"));
        }

        Ok(())
    }

    /// Validate a group conversation name
    pub fn conversation_name(name: &str) -> Result<(), ChatError> {
        if name.trim().is_empty() {
            return Err(ChatError::validation("Group name cannot be empty"));
        }

        if name.chars().count() > MAX_CONVERSATION_NAME_LENGTH {
            return Err(ChatError::validation(format!(
                "Group name too long (max {} characters)",
                MAX_CONVERSATION_NAME_LENGTH
            )));
        }

        Ok(())
    }

    /// Validate a conversation or message id
    pub fn id(id: &str) -> Result<(), ChatError> {
        if id.trim().is_empty() {
            return Err(ChatError::validation("Id cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validator_message_content() {
        assert!(Validator::message_content("Valid message").is_ok());
        assert!(Validator::message_content("").is_err());
        assert!(Validator::message_content(" ").is_err());

        let too_long = "a".repeat(MAX_MESSAGE_LENGTH + 1);
        assert!(Validator::message_content(&too_long).is_err());

        let at_limit = "é".repeat(MAX_MESSAGE_LENGTH);
        assert!(Validator::message_content(&at_limit).is_ok());
    }

    #[test]
    fn test_validator_mentions() {
        assert!(Validator::mentions(&[]).is_ok());
        assert!(Validator::mentions(&["u1".to_string()]).is_ok());
        assert!(Validator::mentions(&["u1".to_string(), " ".to_string()]).is_err());
    }

    #[test]
    fn test_validator_conversation_name() {
        assert!(Validator::conversation_name("Homeroom").is_ok());
        assert!(Validator::conversation_name("").is_err());
        assert!(Validator::conversation_name(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_validator_id() {
        assert!(Validator::id("c1").is_ok());
        assert!(Validator::id("  ").is_err());
    }
}
