//! Domain entities for the chat client.
//!
//! These are the view models the client receives from the classroom API and
//! keeps in memory. Server persistence is owned by the backend.

pub mod attachment;
pub mod conversation;
pub mod member;
pub mod message;

// Re-export all entity types
pub use attachment::{Attachment, AttachmentKind};
pub use conversation::{Conversation, ConversationType, LastMessage};
pub use member::{Member, Profile, Viewer};
pub use message::{is_temporary_id, Message, TEMP_ID_PREFIX};
