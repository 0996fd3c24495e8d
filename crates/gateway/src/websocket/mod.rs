//! Websocket push transport.
//!
//! Every subscription opens its own connection to the realtime endpoint,
//! sends a `subscribe` frame for its channel and forwards the decoded events.
//! Dropping the subscription sends `unsubscribe` and closes the connection.

mod connection;

use std::time::Duration;

use async_trait::async_trait;
use classroom_chats::{ChatError, ChatResult, PushTransport, Subscription};
use classroom_config::RealtimeConfig;
use tokio::sync::mpsc;
use tracing::info;

pub use connection::HEARTBEAT_INTERVAL;

/// [`PushTransport`] over the classroom realtime websocket
#[derive(Debug, Clone)]
pub struct WsPushTransport {
    url: String,
    token: Option<String>,
    buffer: usize,
    connect_timeout: Duration,
}

impl WsPushTransport {
    pub fn new(config: &RealtimeConfig) -> Self {
        Self {
            url: config.url.clone(),
            token: None,
            buffer: config.event_buffer.max(1),
            connect_timeout: Duration::from_secs(config.connect_timeout_seconds.max(1)),
        }
    }

    /// Authenticate the connections with a bearer token
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Override the bound on opening a connection
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PushTransport for WsPushTransport {
    async fn subscribe(&self, channel: &str) -> ChatResult<Subscription> {
        let socket = connection::open(&self.url, self.token.as_deref(), self.connect_timeout)
            .await
            .map_err(ChatError::from)?;
        info!(channel, url = %self.url, "push connection established");

        let (events_tx, events) = mpsc::channel(self.buffer);
        tokio::spawn(connection::pump(socket, channel.to_string(), events_tx));

        // The pump notices the dropped receiver and unsubscribes on its own.
        Ok(Subscription::new(channel, events, None))
    }
}
