//! Text rendering of chat snapshots.

use std::collections::HashSet;

use chrono::DateTime;
use classroom_chats::sync::MutationStatuses;
use classroom_chats::{ChatSnapshot, Conversation, Message, MutationKind, SyncPhase};

/// One line of console output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Message(String),
    Notice(String),
    Error(String),
}

const MUTATION_KINDS: [MutationKind; 6] = [
    MutationKind::Send,
    MutationKind::Update,
    MutationKind::Delete,
    MutationKind::MarkRead,
    MutationKind::MarkMentionsRead,
    MutationKind::CreateConversation,
];

fn short_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|time| time.format("%H:%M").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

pub fn conversation_line(
    conversation: &Conversation,
    viewer_id: Option<&str>,
    selected: bool,
) -> String {
    let marker = if selected { '*' } else { ' ' };
    let mut line = format!("{marker} {:<12} {}", conversation.id, conversation.title(viewer_id));

    if conversation.unread_count > 0 {
        line.push_str(&format!(" [{} unread]", conversation.unread_count));
    }
    if conversation.mention_count > 0 {
        line.push_str(&format!(" [{} @]", conversation.mention_count));
    }
    if let Some(last) = &conversation.last_message {
        line.push_str(&format!(" - {}", last.content));
    }
    line
}

pub fn message_line(message: &Message) -> String {
    let mut line = format!(
        "[{}] {} ({}): {}",
        short_time(&message.created_at),
        message.sender.display_name(),
        message.id,
        message.content
    );
    for attachment in &message.attachments {
        let label = if attachment.is_image() { "image" } else { "file" };
        line.push_str(&format!(" [{label}: {}]", attachment.file_name));
    }
    if message.mentions_me {
        line.push_str(" <- mentions you");
    }
    line
}

/// Turns successive snapshots into the lines not printed yet
#[derive(Debug, Default)]
pub struct Printer {
    conversation: Option<String>,
    seen: HashSet<String>,
    mutations: MutationStatuses,
    messages_error: Option<String>,
}

impl Printer {
    pub fn update(&mut self, snapshot: &ChatSnapshot) -> Vec<Line> {
        let mut lines = Vec::new();

        if snapshot.selected_conversation_id != self.conversation {
            self.conversation = snapshot.selected_conversation_id.clone();
            self.seen.clear();
            self.messages_error = None;
            lines.push(Line::Notice(match &self.conversation {
                Some(id) => format!("--- {id} ---"),
                None => "--- closed ---".to_string(),
            }));
        }

        let messages_error = snapshot.queries.messages.error().map(str::to_string);
        if messages_error != self.messages_error {
            if let Some(error) = &messages_error {
                lines.push(Line::Error(format!("loading messages failed: {error}")));
            }
            self.messages_error = messages_error;
        }

        if snapshot.phase == SyncPhase::Ready {
            for message in &snapshot.messages {
                if message.is_temporary() || self.seen.contains(&message.id) {
                    continue;
                }
                self.seen.insert(message.id.clone());
                lines.push(Line::Message(message_line(message)));
            }
        }

        for kind in MUTATION_KINDS {
            let status = snapshot.mutations.get(kind);
            if status == self.mutations.get(kind) {
                continue;
            }
            if let Some(error) = status.error() {
                lines.push(Line::Error(format!("{} failed: {error}", kind.name())));
            }
            self.mutations.set(kind, status.clone());
        }

        lines
    }
}
