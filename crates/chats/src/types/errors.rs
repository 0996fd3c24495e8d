//! Error types for the chat client.

use thiserror::Error;

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Main error type for the chat client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("RPC error {code}: {message}")]
    Rpc {
        code: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conversation not found: {id}")]
    ConversationNotFound { id: String },

    #[error("Message not found: {id}")]
    MessageNotFound { id: String },

    #[error("No conversation selected")]
    NoConversationSelected,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Chat session closed")]
    SessionClosed,

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ChatError {
    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    /// Create an RPC error reported by the server
    pub fn rpc(code: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Rpc {
            code: code.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode { message: message.into() }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Create a not found error for conversations
    pub fn conversation_not_found(id: impl Into<String>) -> Self {
        Self::ConversationNotFound { id: id.into() }
    }

    /// Create a not found error for messages
    pub fn message_not_found(id: impl Into<String>) -> Self {
        Self::MessageNotFound { id: id.into() }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Check if the failure happened before the server could answer
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: format!("JSON error: {}", err),
        }
    }
}
