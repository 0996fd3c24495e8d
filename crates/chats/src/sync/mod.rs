//! Client-side reconciliation of the selected conversation.
//!
//! [`ChatState`] holds the conversation list and the message buffer of the
//! selected conversation. [`ChatSession`] owns one state and applies user
//! commands, query and mutation completions, and push events to it in order,
//! publishing a [`ChatSnapshot`] after each step.

pub mod session;
pub mod snapshot;
pub mod state;

pub use session::{ChatCommand, ChatHandle, ChatSession, SessionOptions};
pub use snapshot::{
    ChatSnapshot, MutationKind, MutationStatuses, QueryStatuses, RequestStatus, SyncPhase,
};
pub use state::{ChatState, Generation, PageRequest, PushOutcome, SendTicket};
