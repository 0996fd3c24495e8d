use std::sync::Arc;

use anyhow::{Context, Result};
use classroom_chats::{ChatApi, ChatHandle, ChatSession, PushTransport, SessionOptions, Viewer};
use classroom_config::{AppConfig, ViewerConfig};
use classroom_gateway::{RpcClient, WsPushTransport};
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub mod telemetry {
    use anyhow::Result;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    /// Install the global subscriber; `RUST_LOG` overrides the `info` default.
    ///
    /// Logs go to stderr so interactive output on stdout stays readable.
    pub fn init_tracing() -> Result<()> {
        init_tracing_with("info")
    }

    pub fn init_tracing_with(default_directive: &str) -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive));

        let subscriber = SubscriberBuilder::default()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Transports and session settings resolved from configuration
#[derive(Clone)]
pub struct ClientServices {
    pub api: Arc<dyn ChatApi>,
    pub push: Arc<dyn PushTransport>,
    pub options: SessionOptions,
}

impl ClientServices {
    pub fn initialise(config: &AppConfig) -> Result<Self> {
        let rpc = RpcClient::new(&config.api).context("failed to build rpc client")?;
        let push = WsPushTransport::new(&config.realtime).with_token(config.api.token.clone());

        let viewer = viewer_from_config(&config.viewer);
        if viewer.is_none() {
            warn!("no viewer configured, sending is disabled");
        }

        info!(
            api = rpc.base_url(),
            realtime = push.url(),
            viewer = viewer.as_ref().map(|viewer| viewer.user_id.as_str()),
            page_size = config.chat.page_size,
            "client services ready"
        );

        Ok(Self {
            api: Arc::new(rpc),
            push: Arc::new(push),
            options: SessionOptions::new(viewer, config.chat.page_size),
        })
    }

    /// Assemble services from already built transports
    pub fn from_parts(
        api: Arc<dyn ChatApi>,
        push: Arc<dyn PushTransport>,
        options: SessionOptions,
    ) -> Self {
        Self { api, push, options }
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        self.options.viewer.as_ref()
    }

    /// Spawn a chat session on the current runtime
    pub fn start_session(&self) -> (ChatHandle, JoinHandle<()>) {
        ChatSession::spawn(
            Arc::clone(&self.api),
            Arc::clone(&self.push),
            self.options.clone(),
        )
    }
}

/// Viewer described by the configuration, if a user id is set
pub fn viewer_from_config(config: &ViewerConfig) -> Option<Viewer> {
    let user_id = config.user_id.as_deref().map(str::trim)?;
    if user_id.is_empty() {
        return None;
    }
    Some(Viewer::new(user_id, config.username.clone()))
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
