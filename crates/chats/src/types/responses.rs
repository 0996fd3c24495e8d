//! Outputs of the chat RPC procedures that are not plain entities.

use serde::{Deserialize, Serialize};

use crate::entities::Message;

/// One page of `chat.getMessages`, oldest message first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    /// Cursor for the next older page; absent when the history is exhausted
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl MessagePage {
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}
