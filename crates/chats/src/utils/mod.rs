//! Internal utilities for the chat client.

pub mod validation;

// Re-export utilities
pub use validation::*;
