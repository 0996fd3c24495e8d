use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "classroom.toml",
    "config/classroom.toml",
    "crates/config/classroom.toml",
    "../classroom.toml",
    "../config/classroom.toml",
    "../crates/config/classroom.toml",
];

/// Number of messages requested per page by the message list query.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub realtime: RealtimeConfig,
    pub chat: ChatConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
}

/// Settings for the RPC endpoint of the classroom platform.
///
/// ```
/// use classroom_config::ApiConfig;
///
/// let api = ApiConfig::default();
/// assert_eq!(api.base_url, "http://127.0.0.1:3000/api/trpc");
/// assert_eq!(api.request_timeout_seconds, 30);
/// assert!(api.token.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "ApiConfig::default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "ApiConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl ApiConfig {
    fn default_base_url() -> String {
        "http://127.0.0.1:3000/api/trpc".to_string()
    }

    const fn default_request_timeout() -> u64 {
        30
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            token: None,
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    pub url: String,
    pub event_buffer: usize,
    /// Upper bound for opening one push connection
    #[serde(default = "RealtimeConfig::default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl RealtimeConfig {
    const fn default_connect_timeout() -> u64 {
        10
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3001/realtime".to_string(),
            event_buffer: 128,
            connect_timeout_seconds: Self::default_connect_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub page_size: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Identity the client acts for. Without a user id the session refuses to send.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ViewerConfig {
    pub user_id: Option<String>,
    pub username: Option<String>,
}

/// Load the client configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use classroom_config::load;
///
/// std::env::remove_var("CLASSROOM_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.api.base_url.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let timeout = i64::try_from(defaults.api.request_timeout_seconds).unwrap_or(i64::MAX);
    let buffer = i64::try_from(defaults.realtime.event_buffer).unwrap_or(i64::MAX);
    let connect_timeout =
        i64::try_from(defaults.realtime.connect_timeout_seconds).unwrap_or(i64::MAX);

    let mut builder = config::Config::builder()
        .set_default("api.base_url", defaults.api.base_url.clone())?
        .set_default("api.request_timeout_seconds", timeout)?
        .set_default("realtime.url", defaults.realtime.url.clone())?
        .set_default("realtime.event_buffer", buffer)?
        .set_default("realtime.connect_timeout_seconds", connect_timeout)?
        .set_default("chat.page_size", i64::from(defaults.chat.page_size))?;

    let environment_overrides = config::Environment::with_prefix("CLASSROOM").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("CLASSROOM_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via CLASSROOM_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.chat.page_size == 0 {
        config.chat.page_size = DEFAULT_PAGE_SIZE;
    }

    debug!(?config, "loaded client configuration");
    Ok(config)
}
