//! Google OAuth for per-user calendar access.
//!
//! Standard authorization-code flow with offline access: the bot hands the
//! user an authorization URL, the user pastes back the code (exchanged via
//! the `auth` CLI subcommand), and the resulting tokens are stored one JSON
//! file per Slack user. Access tokens are refreshed transparently when
//! expired.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use super::{AuthGate, CalendarError};
use crate::clock::Clock;

/// Calendar scope requested during authorization.
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Google's OAuth authorization endpoint.
const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's token endpoint, for code exchange and refresh.
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before actual expiry to absorb clock skew.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// OAuth client settings (from configuration).
#[derive(Debug, Clone)]
pub struct OauthConfig {
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Redirect URI registered with the OAuth client.
    pub redirect_uri: String,
    /// Directory holding one token file per Slack user.
    pub tokens_dir: PathBuf,
}

/// Tokens persisted for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    /// Short-lived bearer token for API calls.
    pub access_token: String,
    /// Long-lived token used to mint new access tokens.
    pub refresh_token: Option<String>,
    /// Instant the access token expires.
    pub expires_at: DateTime<Utc>,
}

/// Wire shape of Google's token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

/// Per-user Google OAuth manager backed by a token directory.
pub struct GoogleOauth {
    config: OauthConfig,
    client: reqwest::Client,
    clock: std::sync::Arc<dyn Clock>,
}

impl GoogleOauth {
    /// Create the manager, ensuring the token directory exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the token directory cannot be created.
    pub fn new(
        config: OauthConfig,
        clock: std::sync::Arc<dyn Clock>,
    ) -> Result<Self, CalendarError> {
        std::fs::create_dir_all(&config.tokens_dir).map_err(|e| {
            CalendarError::TokenStore(format!(
                "failed to create {}: {e}",
                config.tokens_dir.display()
            ))
        })?;
        Ok(Self {
            config,
            client: reqwest::Client::new(),
            clock,
        })
    }

    /// Path of the token file for `user_id`.
    ///
    /// The user ID is sanitized to alphanumerics so a crafted ID cannot
    /// escape the token directory.
    fn token_path(&self, user_id: &str) -> PathBuf {
        let safe: String = user_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        self.config.tokens_dir.join(format!("{safe}_token.json"))
    }

    /// Load the stored token for `user_id`, if any.
    pub fn load_token(&self, user_id: &str) -> Option<StoredToken> {
        let path = self.token_path(user_id);
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable token file");
                None
            }
        }
    }

    /// Persist `token` for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::TokenStore`] when the file cannot be written.
    pub fn save_token(&self, user_id: &str, token: &StoredToken) -> Result<(), CalendarError> {
        let path = self.token_path(user_id);
        let payload = serde_json::to_string_pretty(token)
            .map_err(|e| CalendarError::TokenStore(e.to_string()))?;
        write_private(&path, &payload)
            .map_err(|e| CalendarError::TokenStore(format!("{}: {e}", path.display())))?;
        info!(user_id, "saved calendar credentials");
        Ok(())
    }

    /// Exchange an authorization code for tokens and store them.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::Api`] on a rejected code and
    /// [`CalendarError::TokenStore`] when persisting fails.
    pub async fn exchange_code(&self, user_id: &str, code: &str) -> Result<(), CalendarError> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
        ];
        let token = self.request_token(&params).await?;
        self.save_token(user_id, &token)
    }

    /// A bearer token for `user_id`, refreshing first when expired.
    ///
    /// # Errors
    ///
    /// [`CalendarError::AuthRequired`] when no stored token exists or it is
    /// expired with no refresh token.
    pub async fn access_token(&self, user_id: &str) -> Result<String, CalendarError> {
        let token = self
            .load_token(user_id)
            .ok_or(CalendarError::AuthRequired)?;

        if !self.is_expired(&token) {
            return Ok(token.access_token);
        }

        let Some(refresh_token) = token.refresh_token.clone() else {
            return Err(CalendarError::AuthRequired);
        };

        info!(user_id, "refreshing expired calendar credentials");
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];
        let mut refreshed = self.request_token(&params).await?;
        // Google omits the refresh token on refresh responses; keep the old one.
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = Some(refresh_token);
        }
        self.save_token(user_id, &refreshed)?;
        Ok(refreshed.access_token)
    }

    fn is_expired(&self, token: &StoredToken) -> bool {
        let margin = Duration::seconds(EXPIRY_MARGIN_SECS);
        let cutoff = token
            .expires_at
            .checked_sub_signed(margin)
            .unwrap_or(token.expires_at);
        self.clock.now() >= cutoff
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<StoredToken, CalendarError> {
        let response = self.client.post(TOKEN_ENDPOINT).form(params).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CalendarError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| CalendarError::Parse(e.to_string()))?;
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(Duration::seconds(parsed.expires_in))
            .unwrap_or_else(|| self.clock.now());
        Ok(StoredToken {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token,
            expires_at,
        })
    }
}

impl AuthGate for GoogleOauth {
    fn is_authenticated(&self, user_id: &str) -> bool {
        match self.load_token(user_id) {
            // An expired token still counts when it can be refreshed.
            Some(token) => !self.is_expired(&token) || token.refresh_token.is_some(),
            None => false,
        }
    }

    fn auth_url(&self, user_id: &str) -> String {
        let mut url = match Url::parse(AUTH_ENDPOINT) {
            Ok(url) => url,
            // Constant endpoint; parse failure is unreachable in practice.
            Err(_) => return AUTH_ENDPOINT.to_owned(),
        };
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", CALENDAR_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", user_id);
        url.to_string()
    }
}

/// Write `contents` to `path`, restricting permissions where supported.
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    std::fs::write(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
