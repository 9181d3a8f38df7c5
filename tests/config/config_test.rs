//! Tests for configuration parsing and defaults.

use std::path::PathBuf;

use huddle::config::HuddleConfig;

#[test]
fn full_config_parses() {
    let toml_str = r#"
[slack]
bot_token = "xoxb-1"
app_token = "xapp-1"
api_base = "http://localhost:9999/api"

[llm]
api_key = "sk-1"
model = "gpt-4o-mini"
base_url = "http://localhost:9998"

[google]
client_id = "cid"
client_secret = "csecret"
redirect_uri = "https://bot.example/oauth"
tokens_dir = "/var/lib/huddle/tokens"

[scheduler]
timezone = "Europe/Berlin"

[paths]
logs_dir = "/var/log/huddle"
"#;
    let config = HuddleConfig::from_toml(toml_str).expect("parses");
    assert_eq!(config.slack.app_token.as_deref(), Some("xapp-1"));
    assert_eq!(config.slack.api_base, "http://localhost:9999/api");
    assert_eq!(config.llm.base_url, "http://localhost:9998");
    assert_eq!(config.google.client_id.as_deref(), Some("cid"));
    assert_eq!(
        config.google.tokens_dir,
        PathBuf::from("/var/lib/huddle/tokens")
    );
    assert_eq!(config.timezone().expect("valid"), chrono_tz::Europe::Berlin);
    assert_eq!(config.paths.logs_dir, PathBuf::from("/var/log/huddle"));
}

#[test]
fn partial_sections_keep_other_defaults() {
    let config = HuddleConfig::from_toml(
        r#"
[google]
client_id = "cid"
"#,
    )
    .expect("parses");
    assert_eq!(config.google.client_id.as_deref(), Some("cid"));
    assert_eq!(
        config.google.redirect_uri,
        "http://localhost:8080/oauth/callback"
    );
    assert_eq!(config.llm.model, "gpt-4o");
}

#[test]
fn unknown_keys_are_tolerated() {
    let config = HuddleConfig::from_toml(
        r#"
[slack]
bot_token = "xoxb-1"
first_seen = "2026-01-01"

[experimental]
shiny = true
"#,
    )
    .expect("parses");
    assert_eq!(config.slack.bot_token.as_deref(), Some("xoxb-1"));
}

#[test]
fn malformed_toml_is_an_error() {
    assert!(HuddleConfig::from_toml("[slack\nbot_token=").is_err());
}
