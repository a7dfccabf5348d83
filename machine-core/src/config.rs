// ABOUTME: Configuration parsing from TOML file with environment variable overrides
// ABOUTME: Validates Slack tokens and provides defaults for sync, scheduler, and metrics settings
use crate::paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

// ─── SlackConfig ────────────────────────────────────────────────

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot OAuth token (xoxb-...) for Web API calls
    #[serde(default)]
    pub bot_token: String,
    /// App-level token (xapp-...) for Socket Mode connections
    #[serde(default)]
    pub app_token: String,
    /// HTTP CONNECT proxy (http://host:port) for Web API calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
}

// Custom Debug impl to redact bot_token and app_token
impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("app_token", &"[REDACTED]")
            .field("http_proxy", &self.http_proxy)
            .finish()
    }
}

// ─── SyncConfig ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Bulk-fetch channels at connect time in addition to users
    #[serde(default = "default_true")]
    pub channels: bool,
    /// Capacity of the queue between the Socket Mode listener and the synchronizer
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channels: true,
            event_buffer: default_event_buffer(),
        }
    }
}

// ─── SchedulerConfig ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
        }
    }
}

// ─── MetricsConfig ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Port for the Prometheus scrape endpoint; no exporter when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

fn default_true() -> bool {
    true
}

fn default_event_buffer() -> usize {
    256
}

fn default_check_interval_secs() -> u64 {
    1
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", name, value))
}

impl Config {
    /// Find the config file, checking multiple locations in order:
    /// 1. MACHINE_CONFIG_PATH env var (if set)
    /// 2. ./config.toml (current directory - for development)
    /// 3. ~/.config/slack-machine/config.toml (XDG config dir)
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var("MACHINE_CONFIG_PATH") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        let xdg_config = paths::config_file();
        if xdg_config.exists() {
            return Some(xdg_config);
        }

        None
    }

    /// Load configuration from the first config file found, with environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, reading `path` instead of searching when given
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(),
        };

        let mut config = if let Some(config_path) = config_path {
            tracing::info!(
                path = %config_path.display(),
                "Loading configuration from file"
            );
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            tracing::info!("No config file found, using environment variables and defaults");
            Config::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("SLACK_BOT_TOKEN") {
            self.slack.bot_token = val;
        }
        if let Ok(val) = std::env::var("SLACK_APP_TOKEN") {
            self.slack.app_token = val;
        }
        if let Ok(val) = std::env::var("HTTP_PROXY") {
            let val = val.trim();
            self.slack.http_proxy = (!val.is_empty()).then(|| val.to_string());
        }
        if let Ok(val) = std::env::var("SYNC_CHANNELS") {
            self.sync.channels = parse_env("SYNC_CHANNELS", &val)?;
        }
        if let Ok(val) = std::env::var("SYNC_EVENT_BUFFER") {
            self.sync.event_buffer = parse_env("SYNC_EVENT_BUFFER", &val)?;
        }
        if let Ok(val) = std::env::var("SCHEDULER_CHECK_INTERVAL_SECS") {
            self.scheduler.check_interval_secs =
                parse_env("SCHEDULER_CHECK_INTERVAL_SECS", &val)?;
        }
        if let Ok(val) = std::env::var("METRICS_PORT") {
            self.metrics.port = Some(parse_env("METRICS_PORT", &val)?);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.slack.bot_token.trim().is_empty() {
            anyhow::bail!(
                "slack.bot_token is required (set in config.toml or SLACK_BOT_TOKEN env var)"
            );
        }
        if !self.slack.bot_token.starts_with("xoxb-") {
            anyhow::bail!("slack.bot_token must be a bot token starting with xoxb-");
        }
        if self.slack.app_token.trim().is_empty() {
            anyhow::bail!(
                "slack.app_token is required (set in config.toml or SLACK_APP_TOKEN env var)"
            );
        }
        if !self.slack.app_token.starts_with("xapp-") {
            anyhow::bail!("slack.app_token must be an app-level token starting with xapp-");
        }
        if let Some(proxy) = &self.slack.http_proxy {
            if !proxy.starts_with("http://") {
                anyhow::bail!("slack.http_proxy must be an http:// URL");
            }
        }
        if self.sync.event_buffer == 0 {
            anyhow::bail!("sync.event_buffer must be greater than zero");
        }
        if self.scheduler.check_interval_secs == 0 {
            anyhow::bail!("scheduler.check_interval_secs must be greater than zero");
        }
        Ok(())
    }
}
