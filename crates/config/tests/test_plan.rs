//! Test plan for the `classroom-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and validation behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use classroom_config::{load, ApiConfig, AppConfig, ChatConfig, RealtimeConfig, DEFAULT_PAGE_SIZE};

const ENV_VARS_TO_RESET: &[&str] = &[
    "CLASSROOM_CONFIG",
    "CLASSROOM__API__BASE_URL",
    "CLASSROOM__API__TOKEN",
    "CLASSROOM__API__REQUEST_TIMEOUT_SECONDS",
    "CLASSROOM__REALTIME__URL",
    "CLASSROOM__REALTIME__EVENT_BUFFER",
    "CLASSROOM__CHAT__PAGE_SIZE",
    "CLASSROOM__VIEWER__USER_ID",
    "CLASSROOM__VIEWER__USERNAME",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.api.base_url, defaults.api.base_url);
    assert_eq!(
        config.api.request_timeout_seconds,
        defaults.api.request_timeout_seconds
    );
    assert!(config.api.token.is_none());
    assert_eq!(config.realtime.url, defaults.realtime.url);
    assert_eq!(config.realtime.event_buffer, defaults.realtime.event_buffer);
    assert_eq!(config.chat.page_size, DEFAULT_PAGE_SIZE);
    assert!(config.viewer.user_id.is_none());
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "classroom.toml",
        r#"
        [chat]
        page_size = 20
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/classroom.toml",
        r#"
        [chat]
        page_size = 99
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.chat.page_size, 20);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "classroom.toml",
        r#"
        [api]
        token = "session-token"

        [viewer]
        user_id = "user-1"
        username = "ada"
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.api.token.as_deref(), Some("session-token"));
    assert_eq!(config.api.base_url, defaults.api.base_url);
    assert_eq!(config.realtime.url, defaults.realtime.url);
    assert_eq!(config.viewer.user_id.as_deref(), Some("user-1"));
    assert_eq!(config.viewer.username.as_deref(), Some("ada"));
}

#[test]
#[serial]
fn load_honours_explicit_config_path() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "classroom.toml",
        r#"
        [realtime]
        url = "ws://ignored"
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [realtime]
        url = "ws://push.example.test/socket"
        "#,
    );

    let explicit = temp_dir.path().join("elsewhere/custom.toml");
    ctx.set_var("CLASSROOM_CONFIG", explicit.display().to_string());

    let config = load().expect("configuration load should read the explicit file");
    assert_eq!(config.realtime.url, "ws://push.example.test/socket");
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "classroom.toml",
        r#"
        [chat]
        page_size = 10
        "#,
    );

    ctx.set_var("CLASSROOM__CHAT__PAGE_SIZE", "25");
    ctx.set_var("CLASSROOM__API__BASE_URL", "https://classroom.example.test/api/trpc");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.chat.page_size, 25);
    assert_eq!(config.api.base_url, "https://classroom.example.test/api/trpc");
}

#[test]
#[serial]
fn load_restores_default_page_size_when_zero() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("CLASSROOM__CHAT__PAGE_SIZE", "0");

    let config = load().expect("configuration load should succeed");
    assert_eq!(config.chat.page_size, DEFAULT_PAGE_SIZE);
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "classroom.toml",
        r#"
        [chat]
        page_size = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn api_config_defaults_point_at_local_trpc_endpoint() {
    let defaults = ApiConfig::default();
    assert_eq!(defaults.base_url, "http://127.0.0.1:3000/api/trpc");
    assert_eq!(defaults.request_timeout_seconds, 30);
}

#[test]
fn realtime_and_chat_defaults() {
    assert_eq!(RealtimeConfig::default().event_buffer, 128);
    assert_eq!(RealtimeConfig::default().connect_timeout_seconds, 10);
    assert_eq!(ChatConfig::default().page_size, 50);
}
