//! Shared types and interfaces for the chat client.
//!
//! This module contains error definitions, RPC inputs and outputs, and the
//! push events exchanged with the classroom backend.

pub mod errors;
pub mod events;
pub mod requests;
pub mod responses;

// Re-export common types
pub use errors::{ChatError, ChatResult};
pub use events::*;
pub use requests::*;
pub use responses::*;

// Common type aliases
pub type ConversationId = String;
pub type MessageId = String;
pub type UserId = String;
