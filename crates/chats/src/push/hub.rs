//! In-process push hub backed by broadcast channels.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, warn};

use super::{PushTransport, Subscription};
use crate::types::{ChatResult, PushEvent};

const DEFAULT_CAPACITY: usize = 100;

/// Broadcaster per channel, shared by publishers and subscribers in one process
#[derive(Clone)]
pub struct LocalPushHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<PushEvent>>>>,
    capacity: usize,
}

impl Default for LocalPushHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalPushHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Get or create the broadcaster for a channel
    async fn broadcaster(&self, channel: &str) -> broadcast::Sender<PushEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Publish an event; returns the number of subscribers reached
    pub async fn publish(&self, channel: &str, event: PushEvent) -> usize {
        let channels = self.channels.read().await;
        let Some(sender) = channels.get(channel) else {
            debug!(channel, event = event.event_name(), "no subscribers for channel");
            return 0;
        };
        sender.send(event).unwrap_or(0)
    }

    /// Number of live subscriptions on a channel
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        let channels = self.channels.read().await;
        channels
            .get(channel)
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }
}

#[async_trait]
impl PushTransport for LocalPushHub {
    async fn subscribe(&self, channel: &str) -> ChatResult<Subscription> {
        let mut receiver = self.broadcaster(channel).await.subscribe();
        let (tx, events) = mpsc::channel(self.capacity);
        let channel_name = channel.to_string();

        let forwarder = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(channel = %channel_name, skipped, "push subscriber lagged behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(channel, events, Some(forwarder.abort_handle())))
    }
}
