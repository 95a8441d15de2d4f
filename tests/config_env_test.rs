//! Environment overrides for ClientConfig.

use std::time::Duration;

use ragchat::config::{ClientConfig, ENV_BASE_URL, ENV_TIMEOUT_SECS, ENV_USER_ID};
use serial_test::serial;

fn clear_env() {
    std::env::remove_var(ENV_BASE_URL);
    std::env::remove_var(ENV_USER_ID);
    std::env::remove_var(ENV_TIMEOUT_SECS);
}

#[test]
#[serial]
fn test_from_env_without_variables_is_default() {
    clear_env();
    assert_eq!(ClientConfig::from_env(), ClientConfig::default());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var(ENV_BASE_URL, "https://chat.example.com/");
    std::env::set_var(ENV_USER_ID, " 42 ");
    std::env::set_var(ENV_TIMEOUT_SECS, "90");

    let config = ClientConfig::from_env();
    clear_env();

    assert_eq!(config.base_url, "https://chat.example.com");
    assert_eq!(config.user_id, "42");
    assert_eq!(config.request_timeout, Duration::from_secs(90));
    assert_eq!(
        config.url("/api/llm/chat"),
        "https://chat.example.com/api/llm/chat"
    );
}

#[test]
#[serial]
fn test_from_env_ignores_invalid_timeout() {
    clear_env();
    std::env::set_var(ENV_TIMEOUT_SECS, "soon");
    let config = ClientConfig::from_env();
    std::env::set_var(ENV_TIMEOUT_SECS, "0");
    let zero = ClientConfig::from_env();
    clear_env();

    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(zero.request_timeout, Duration::from_secs(30));
}

#[test]
#[serial]
fn test_blank_values_are_ignored() {
    clear_env();
    std::env::set_var(ENV_BASE_URL, "   ");
    std::env::set_var(ENV_USER_ID, "");
    let config = ClientConfig::from_env();
    clear_env();

    assert_eq!(config.base_url, "http://localhost:8000");
    assert_eq!(config.user_id, "default_user");
}
