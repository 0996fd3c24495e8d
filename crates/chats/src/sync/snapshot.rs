//! Read-only view model published by the session.

use crate::entities::{Conversation, Message, Viewer};

/// Lifecycle of the selected conversation's buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Unselected,
    Loading,
    Ready,
}

/// Status of one query or mutation kind
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error(String),
}

impl RequestStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequestStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Status of each query the session runs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryStatuses {
    pub conversations: RequestStatus,
    pub conversation: RequestStatus,
    pub messages: RequestStatus,
    pub older_messages: RequestStatus,
}

/// Status of each mutation kind
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MutationStatuses {
    pub send: RequestStatus,
    pub update: RequestStatus,
    pub delete: RequestStatus,
    pub mark_read: RequestStatus,
    pub mark_mentions_read: RequestStatus,
    pub create_conversation: RequestStatus,
}

/// Mutation kinds tracked in [`MutationStatuses`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Send,
    Update,
    Delete,
    MarkRead,
    MarkMentionsRead,
    CreateConversation,
}

impl MutationKind {
    pub fn name(&self) -> &'static str {
        match self {
            MutationKind::Send => "send_message",
            MutationKind::Update => "update_message",
            MutationKind::Delete => "delete_message",
            MutationKind::MarkRead => "mark_conversation_read",
            MutationKind::MarkMentionsRead => "mark_mentions_read",
            MutationKind::CreateConversation => "create_conversation",
        }
    }
}

impl MutationStatuses {
    pub fn get(&self, kind: MutationKind) -> &RequestStatus {
        match kind {
            MutationKind::Send => &self.send,
            MutationKind::Update => &self.update,
            MutationKind::Delete => &self.delete,
            MutationKind::MarkRead => &self.mark_read,
            MutationKind::MarkMentionsRead => &self.mark_mentions_read,
            MutationKind::CreateConversation => &self.create_conversation,
        }
    }

    pub fn set(&mut self, kind: MutationKind, status: RequestStatus) {
        let slot = match kind {
            MutationKind::Send => &mut self.send,
            MutationKind::Update => &mut self.update,
            MutationKind::Delete => &mut self.delete,
            MutationKind::MarkRead => &mut self.mark_read,
            MutationKind::MarkMentionsRead => &mut self.mark_mentions_read,
            MutationKind::CreateConversation => &mut self.create_conversation,
        };
        *slot = status;
    }
}

/// Everything a UI needs to render the chat
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatSnapshot {
    pub viewer: Option<Viewer>,
    pub conversations: Vec<Conversation>,
    pub selected_conversation_id: Option<String>,
    /// Details of the selected conversation, once loaded
    pub conversation: Option<Conversation>,
    pub phase: SyncPhase,
    /// Messages of the selected conversation, oldest first
    pub messages: Vec<Message>,
    pub has_more: bool,
    pub loading_more: bool,
    pub queries: QueryStatuses,
    pub mutations: MutationStatuses,
}

impl ChatSnapshot {
    /// Find a message of the selected conversation
    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == message_id)
    }

    /// Number of placeholders still waiting for confirmation
    pub fn pending_sends(&self) -> usize {
        self.messages.iter().filter(|message| message.is_temporary()).count()
    }

    /// Sum of unread counters across the conversation list
    pub fn total_unread(&self) -> u32 {
        self.conversations
            .iter()
            .map(|conversation| conversation.unread_count)
            .sum()
    }
}
