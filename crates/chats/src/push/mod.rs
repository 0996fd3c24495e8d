//! Push channel binding.
//!
//! A [`PushTransport`] hands out one [`Subscription`] per channel. Dropping the
//! subscription releases it: the forwarding task is aborted and no further
//! events are delivered.

pub mod hub;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::types::{ChatResult, PushEvent};

pub use hub::LocalPushHub;

/// Channel carrying the events of one conversation
pub fn conversation_channel(conversation_id: &str) -> String {
    format!("conversation-{conversation_id}")
}

/// Channel carrying the events addressed to one user across all conversations
pub fn user_channel(user_id: &str) -> String {
    format!("user-{user_id}")
}

/// Source of push events
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Start receiving the events published on `channel`
    async fn subscribe(&self, channel: &str) -> ChatResult<Subscription>;
}

/// Live subscription to one channel
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    events: mpsc::Receiver<PushEvent>,
    forwarder: Option<AbortHandle>,
}

impl Subscription {
    /// Wrap a receiver fed by `forwarder`; the task is aborted when the subscription drops
    pub fn new(
        channel: impl Into<String>,
        events: mpsc::Receiver<PushEvent>,
        forwarder: Option<AbortHandle>,
    ) -> Self {
        Self {
            channel: channel.into(),
            events,
            forwarder,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Next event, or `None` once the transport has stopped delivering
    pub async fn recv(&mut self) -> Option<PushEvent> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        assert_eq!(conversation_channel("c1"), "conversation-c1");
        assert_eq!(user_channel("u1"), "user-u1");
    }

    #[tokio::test]
    async fn test_subscription_ends_when_sender_closes() {
        let (tx, rx) = mpsc::channel(1);
        let mut subscription = Subscription::new("conversation-c1", rx, None);
        drop(tx);
        assert_eq!(subscription.channel(), "conversation-c1");
        assert!(subscription.recv().await.is_none());
    }
}
