//! Configuration loading.
//!
//! Loads configuration from `./config.toml` (or `$HUDDLE_CONFIG_PATH`).
//! Environment variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;

// ── Top-level config ────────────────────────────────────────────

/// Top-level bot configuration loaded from TOML.
///
/// Path: `./config.toml` or `$HUDDLE_CONFIG_PATH`. A missing file is not an
/// error; defaults apply and env vars fill in the secrets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HuddleConfig {
    /// Slack adapter settings (`[slack]`).
    pub slack: SlackSectionConfig,
    /// LLM provider settings (`[llm]`).
    pub llm: LlmConfig,
    /// Google Calendar OAuth settings (`[google]`).
    pub google: GoogleConfig,
    /// Scheduling behavior (`[scheduler]`).
    pub scheduler: SchedulerConfig,
    /// Filesystem paths (`[paths]`).
    pub paths: PathsConfig,
}

impl HuddleConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from TOML file only, no env overrides.
    fn load_from_file() -> Result<Self> {
        let path = Self::config_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                let config: HuddleConfig =
                    toml::from_str(&contents).context("failed to parse config TOML")?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(HuddleConfig::default())
            }
            Err(e) => Err(anyhow::anyhow!("failed to read config file: {e}")),
        }
    }

    /// Resolve config file path: `$HUDDLE_CONFIG_PATH`, then `./config.toml`.
    fn config_path() -> PathBuf {
        match std::env::var("HUDDLE_CONFIG_PATH") {
            Ok(p) => PathBuf::from(p),
            Err(_) => PathBuf::from("config.toml"),
        }
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids unsafe `set_var` in tests).
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        // Slack.
        if let Some(v) = env("HUDDLE_SLACK_BOT_TOKEN") {
            self.slack.bot_token = Some(v);
        }
        if let Some(v) = env("HUDDLE_SLACK_APP_TOKEN") {
            self.slack.app_token = Some(v);
        }

        // LLM.
        if let Some(v) = env("HUDDLE_OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = env("HUDDLE_OPENAI_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = env("HUDDLE_OPENAI_BASE_URL") {
            self.llm.base_url = v;
        }

        // Google OAuth.
        if let Some(v) = env("HUDDLE_GOOGLE_CLIENT_ID") {
            self.google.client_id = Some(v);
        }
        if let Some(v) = env("HUDDLE_GOOGLE_CLIENT_SECRET") {
            self.google.client_secret = Some(v);
        }
        if let Some(v) = env("HUDDLE_GOOGLE_REDIRECT_URI") {
            self.google.redirect_uri = v;
        }
        if let Some(v) = env("HUDDLE_TOKENS_DIR") {
            self.google.tokens_dir = PathBuf::from(v);
        }

        // Scheduler.
        if let Some(v) = env("HUDDLE_TIMEZONE") {
            self.scheduler.timezone = v;
        }

        // Paths.
        if let Some(v) = env("HUDDLE_LOGS_DIR") {
            self.paths.logs_dir = PathBuf::from(v);
        }
    }

    /// Parse a TOML string into config (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: HuddleConfig =
            toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Parse the configured display timezone.
    pub fn timezone(&self) -> Result<Tz> {
        self.scheduler
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid timezone {:?}: {e}", self.scheduler.timezone))
    }
}

// ── Slack config ────────────────────────────────────────────────

/// Slack adapter configuration (`[slack]`).
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SlackSectionConfig {
    /// Bot token (`xoxb-…`), used for Web API calls.
    pub bot_token: Option<String>,
    /// App-level token (`xapp-…`), used to open the Socket Mode connection.
    pub app_token: Option<String>,
    /// Web API base URL. Overridden in tests.
    pub api_base: String,
}

impl Default for SlackSectionConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            app_token: None,
            api_base: "https://slack.com/api".to_string(),
        }
    }
}

impl std::fmt::Debug for SlackSectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackSectionConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "__REDACTED__"))
            .field("app_token", &self.app_token.as_ref().map(|_| "__REDACTED__"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

// ── LLM config ──────────────────────────────────────────────────

/// LLM provider configuration (`[llm]`).
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI API key.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// API base URL.
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com".to_string(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "__REDACTED__"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

// ── Google config ───────────────────────────────────────────────

/// Google Calendar OAuth configuration (`[google]`).
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// OAuth client ID.
    pub client_id: Option<String>,
    /// OAuth client secret.
    pub client_secret: Option<String>,
    /// Redirect URI registered with the OAuth client.
    pub redirect_uri: String,
    /// Directory holding per-user token files.
    pub tokens_dir: PathBuf,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: "http://localhost:8080/oauth/callback".to_string(),
            tokens_dir: PathBuf::from("tokens"),
        }
    }
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "__REDACTED__"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field("tokens_dir", &self.tokens_dir)
            .finish()
    }
}

// ── Scheduler config ────────────────────────────────────────────

/// Scheduling behavior (`[scheduler]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// IANA timezone in which bare times in messages are interpreted and
    /// confirmations are rendered.
    pub timezone: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
        }
    }
}

// ── Paths config ────────────────────────────────────────────────

/// Filesystem paths (`[paths]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory for rotating log files.
    pub logs_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("logs"),
        }
    }
}
