//! # Classroom Chats Crate
//!
//! Client-side chat synchronisation for the classroom platform. It keeps the
//! conversation list and the message buffer of the selected conversation
//! consistent while optimistic sends, server confirmations and push events
//! arrive in any order.
//!
//! ## Architecture
//!
//! - **Entities**: View models (Conversation, Message, Member, etc.)
//! - **Types**: Errors, RPC inputs/outputs and push events
//! - **Api**: The [`ChatApi`] trait and an in-memory implementation
//! - **Push**: The [`PushTransport`] trait and an in-process hub
//! - **Sync**: The reconciliation state and the session task driving it
//! - **Utils**: Input validation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use classroom_chats::{ChatSession, SessionOptions};
//!
//! let (handle, _task) = ChatSession::spawn(api, push, SessionOptions::new(viewer, 50));
//! handle.select_conversation("c1")?;
//! handle.send_message("hello", vec![])?;
//! let snapshot = handle.wait_until(|s| s.pending_sends() == 0).await?;
//! ```

pub mod api;
pub mod entities;
pub mod push;
pub mod sync;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use api::{ChatApi, InMemoryChatApi};
pub use entities::{
    Attachment, Conversation, ConversationType, LastMessage, Member, Message, Profile, Viewer,
};
pub use push::{conversation_channel, user_channel, LocalPushHub, PushTransport, Subscription};
pub use sync::{
    ChatHandle, ChatSession, ChatSnapshot, ChatState, MutationKind, RequestStatus,
    SessionOptions, SyncPhase,
};
pub use types::{
    ChatError, ChatResult, CreateConversationRequest, ListMessagesRequest, MessagePage, PushEvent,
    SendMessageRequest, UpdateMessageRequest,
};
