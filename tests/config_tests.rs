// ABOUTME: Tests for configuration loading and validation
// ABOUTME: Verifies TOML parsing, env var overrides, and required field validation

use machine::config::Config;
use serial_test::serial;
use std::io::Write;

/// Helper to clear all config-related env vars
fn clear_config_env_vars() {
    std::env::remove_var("MACHINE_CONFIG_PATH");
    std::env::remove_var("SLACK_BOT_TOKEN");
    std::env::remove_var("SLACK_APP_TOKEN");
    std::env::remove_var("SYNC_CHANNELS");
    std::env::remove_var("SYNC_EVENT_BUFFER");
    std::env::remove_var("SCHEDULER_CHECK_INTERVAL_SECS");
    std::env::remove_var("METRICS_PORT");
    std::env::remove_var("HTTP_PROXY");
}

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_config_loads_from_toml_file() {
    clear_config_env_vars();

    let file = write_config(
        r#"
[slack]
bot_token = "xoxb-file"
app_token = "xapp-file"
http_proxy = "http://proxy.internal:3128"

[sync]
channels = false
event_buffer = 64

[scheduler]
check_interval_secs = 5

[metrics]
port = 9464
"#,
    );

    let config = Config::load_from(Some(file.path())).unwrap();
    assert_eq!(config.slack.bot_token, "xoxb-file");
    assert_eq!(config.slack.app_token, "xapp-file");
    assert!(!config.sync.channels);
    assert_eq!(config.sync.event_buffer, 64);
    assert_eq!(config.scheduler.check_interval_secs, 5);
    assert_eq!(config.metrics.port, Some(9464));
    assert_eq!(
        config.slack.http_proxy.as_deref(),
        Some("http://proxy.internal:3128")
    );
}

#[test]
#[serial]
fn test_env_vars_override_file() {
    clear_config_env_vars();

    let file = write_config(
        r#"
[slack]
bot_token = "xoxb-file"
app_token = "xapp-file"
"#,
    );
    std::env::set_var("SLACK_BOT_TOKEN", "xoxb-env");
    std::env::set_var("SYNC_CHANNELS", "false");
    std::env::set_var("METRICS_PORT", "9100");
    std::env::set_var("HTTP_PROXY", "http://env-proxy:8080");

    let config = Config::load_from(Some(file.path())).unwrap();
    clear_config_env_vars();

    assert_eq!(config.slack.bot_token, "xoxb-env");
    assert_eq!(config.slack.app_token, "xapp-file");
    assert!(!config.sync.channels);
    assert_eq!(config.metrics.port, Some(9100));
    assert_eq!(config.slack.http_proxy.as_deref(), Some("http://env-proxy:8080"));
}

#[test]
#[serial]
fn test_config_path_env_var_is_searched_first() {
    clear_config_env_vars();

    let file = write_config(
        r#"
[slack]
bot_token = "xoxb-from-path"
app_token = "xapp-from-path"
"#,
    );
    std::env::set_var("MACHINE_CONFIG_PATH", file.path());

    let config = Config::load().unwrap();
    clear_config_env_vars();

    assert_eq!(config.slack.bot_token, "xoxb-from-path");
}

#[test]
#[serial]
fn test_missing_tokens_fail_validation() {
    clear_config_env_vars();

    let file = write_config("[sync]\nchannels = true\n");
    let err = Config::load_from(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("bot_token"));
}

#[test]
#[serial]
fn test_invalid_env_value_is_reported() {
    clear_config_env_vars();

    let file = write_config(
        r#"
[slack]
bot_token = "xoxb-file"
app_token = "xapp-file"
"#,
    );
    std::env::set_var("SYNC_EVENT_BUFFER", "lots");

    let err = Config::load_from(Some(file.path())).unwrap_err();
    clear_config_env_vars();

    assert!(err.to_string().contains("SYNC_EVENT_BUFFER"));
}

#[test]
#[serial]
fn test_unparseable_file_is_an_error() {
    clear_config_env_vars();

    let file = write_config("[slack\nbot_token = ");
    let err = Config::load_from(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("Failed to parse"));
}
