//! Slack Socket Mode adapter.
//!
//! Opens a websocket via `apps.connections.open`, acknowledges every
//! envelope, and normalizes `app_mention` and IM `message` events into
//! [`InboundMessage`]s for the router. Outbound replies go through
//! `chat.postMessage`. Reconnects with exponential backoff when the socket
//! drops or Slack asks for a refresh.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::{AdapterToRouter, InboundMessage, MessageKind, RouterToAdapter};

/// Initial backoff after a socket failure, in milliseconds.
const INITIAL_BACKOFF_MS: u64 = 1_000;

/// Maximum backoff after repeated socket failures, in milliseconds.
const MAX_BACKOFF_MS: u64 = 30_000;

/// Maximum number of event IDs remembered for duplicate suppression.
const DEDUP_CAP: usize = 1_024;

/// Slack adapter configuration.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// Bot token (`xoxb-…`) for Web API calls.
    pub bot_token: String,
    /// App-level token (`xapp-…`) for Socket Mode.
    pub app_token: String,
    /// Web API base URL.
    pub api_base: String,
}

/// Slack adapter errors.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The Slack Web API returned an error response.
    #[error("Slack API error: {0}")]
    Api(String),
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Websocket transport error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// JSON deserialization failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Slack API types (minimal subset)
// ---------------------------------------------------------------------------

/// `auth.test` response.
#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    ok: bool,
    user_id: Option<String>,
    error: Option<String>,
}

/// `apps.connections.open` response.
#[derive(Debug, Deserialize)]
struct OpenSocketResponse {
    ok: bool,
    url: Option<String>,
    error: Option<String>,
}

/// `chat.postMessage` response.
#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}

/// A Socket Mode envelope as delivered over the websocket.
#[derive(Debug, Deserialize)]
struct SocketEnvelope {
    envelope_id: Option<String>,
    #[serde(rename = "type")]
    envelope_type: String,
    #[serde(default)]
    payload: Value,
}

// ---------------------------------------------------------------------------
// Event normalization
// ---------------------------------------------------------------------------

/// Normalize a Socket Mode `events_api` payload into an [`InboundMessage`].
///
/// Accepts `app_mention` events anywhere and `message` events in IM
/// channels. Bot messages (self-echo included) and message subtypes
/// (edits, joins) are dropped.
#[doc(hidden)]
pub fn normalize_event(payload: &Value, bot_user_id: &str) -> Option<InboundMessage> {
    let event = payload.get("event")?;
    let event_id = payload
        .get("event_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    if event.get("bot_id").is_some() {
        return None;
    }
    let user_id = event.get("user").and_then(Value::as_str)?;
    if user_id == bot_user_id {
        return None;
    }

    let kind = match event.get("type").and_then(Value::as_str)? {
        "app_mention" => MessageKind::Mention,
        "message" => {
            if event.get("subtype").is_some() {
                return None;
            }
            if event.get("channel_type").and_then(Value::as_str) != Some("im") {
                return None;
            }
            MessageKind::DirectMessage
        }
        _ => return None,
    };

    Some(InboundMessage {
        kind,
        user_id: user_id.to_owned(),
        channel_id: event.get("channel").and_then(Value::as_str)?.to_owned(),
        text: event
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        event_id,
    })
}

/// Bounded sliding window of seen event IDs.
#[derive(Debug, Default)]
struct DedupWindow {
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl DedupWindow {
    /// Record `key`; returns `false` when it was already present.
    fn insert(&mut self, key: &str) -> bool {
        if key.is_empty() {
            // Events without an ID cannot be deduplicated; let them through.
            return true;
        }
        if !self.seen.insert(key.to_owned()) {
            return false;
        }
        self.order.push_back(key.to_owned());
        while self.order.len() > DEDUP_CAP {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Adapter implementation
// ---------------------------------------------------------------------------

/// Slack Socket Mode adapter.
///
/// Runs as a long-lived tokio task. One socket session at a time; a second
/// task handles outbound replies from the router.
pub struct SlackAdapter {
    config: SlackConfig,
    client: reqwest::Client,
}

impl SlackAdapter {
    /// Create a new Slack adapter.
    pub fn new(config: SlackConfig) -> Self {
        Self {
            config: SlackConfig {
                api_base: config.api_base.trim_end_matches('/').to_owned(),
                ..config
            },
            client: reqwest::Client::new(),
        }
    }

    /// Run the adapter until the router channel closes or `Shutdown` arrives.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Api`] when Slack rejects the bot credentials
    /// at startup; socket failures after that are retried with backoff.
    pub async fn run(
        self,
        to_router: mpsc::Sender<AdapterToRouter>,
        mut from_router: mpsc::Receiver<RouterToAdapter>,
    ) -> Result<(), AdapterError> {
        info!("Slack adapter starting");

        let bot_user_id = self.resolve_bot_user_id().await?;
        info!(bot_user_id, "Slack identity resolved");

        // Outbound handler.
        let client_out = self.client.clone();
        let config_out = self.config.clone();
        let outbound = tokio::spawn(async move {
            while let Some(command) = from_router.recv().await {
                match command {
                    RouterToAdapter::SendMessage { channel_id, text } => {
                        if let Err(e) =
                            post_message(&client_out, &config_out, &channel_id, &text).await
                        {
                            error!(error = %e, channel_id, "failed to post reply");
                        }
                    }
                    RouterToAdapter::Shutdown => break,
                }
            }
        });

        // Inbound socket loop with reconnect backoff.
        let mut dedup = DedupWindow::default();
        let mut backoff_ms = INITIAL_BACKOFF_MS;
        loop {
            match self.open_socket_url().await {
                Ok(socket_url) => {
                    match self
                        .run_socket_session(&socket_url, &bot_user_id, &to_router, &mut dedup)
                        .await
                    {
                        Ok(SessionEnd::RouterGone) => break,
                        Ok(SessionEnd::Reconnect) => {
                            backoff_ms = INITIAL_BACKOFF_MS;
                            debug!("socket session ended, reconnecting");
                        }
                        Err(e) => {
                            warn!(error = %e, backoff_ms, "socket session failed");
                            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                            backoff_ms = (backoff_ms.saturating_mul(2)).min(MAX_BACKOFF_MS);
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, backoff_ms, "failed to open socket connection");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = (backoff_ms.saturating_mul(2)).min(MAX_BACKOFF_MS);
                }
            }
        }

        outbound.abort();
        info!("Slack adapter stopped");
        Ok(())
    }

    /// Resolve the bot's own user ID via `auth.test`.
    async fn resolve_bot_user_id(&self) -> Result<String, AdapterError> {
        let response: AuthTestResponse = self
            .client
            .post(format!("{}/auth.test", self.config.api_base))
            .bearer_auth(&self.config.bot_token)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(AdapterError::Api(format!(
                "auth.test failed: {}",
                response.error.unwrap_or_else(|| "unknown error".to_owned())
            )));
        }
        response
            .user_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AdapterError::Api("auth.test did not return user_id".to_owned()))
    }

    /// Obtain a fresh Socket Mode websocket URL.
    async fn open_socket_url(&self) -> Result<String, AdapterError> {
        let response: OpenSocketResponse = self
            .client
            .post(format!("{}/apps.connections.open", self.config.api_base))
            .bearer_auth(&self.config.app_token)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(AdapterError::Api(format!(
                "apps.connections.open failed: {}",
                response.error.unwrap_or_else(|| "unknown error".to_owned())
            )));
        }
        response
            .url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AdapterError::Api("apps.connections.open returned no url".to_owned()))
    }

    /// Drive one websocket session until disconnect or shutdown.
    async fn run_socket_session(
        &self,
        socket_url: &str,
        bot_user_id: &str,
        to_router: &mpsc::Sender<AdapterToRouter>,
        dedup: &mut DedupWindow,
    ) -> Result<SessionEnd, AdapterError> {
        let (stream, _response) = connect_async(socket_url).await?;
        let (mut sink, mut source) = stream.split();
        info!("Slack socket connected");

        while let Some(message) = source.next().await {
            let message = message?;
            let Some(envelope) = parse_envelope(&message)? else {
                continue;
            };

            // Ack first; Slack redelivers unacked envelopes.
            if let Some(envelope_id) = &envelope.envelope_id {
                let ack = json!({ "envelope_id": envelope_id }).to_string();
                sink.send(WsMessage::Text(ack.into())).await?;
            }

            match envelope.envelope_type.as_str() {
                "events_api" => {
                    let Some(inbound) = normalize_event(&envelope.payload, bot_user_id) else {
                        continue;
                    };
                    if !dedup.insert(&inbound.event_id) {
                        debug!(event_id = inbound.event_id, "duplicate event skipped");
                        continue;
                    }
                    if to_router
                        .send(AdapterToRouter::Message(Box::new(inbound)))
                        .await
                        .is_err()
                    {
                        return Ok(SessionEnd::RouterGone);
                    }
                }
                "disconnect" => {
                    // Slack rotates socket URLs; reconnect with a fresh one.
                    return Ok(SessionEnd::Reconnect);
                }
                "hello" => debug!("socket mode hello received"),
                other => debug!(envelope_type = other, "ignoring envelope"),
            }
        }

        Ok(SessionEnd::Reconnect)
    }
}

/// Why a socket session ended.
enum SessionEnd {
    /// Reconnect with a fresh URL.
    Reconnect,
    /// The router hung up; stop the adapter.
    RouterGone,
}

/// Decode a websocket frame into a Socket Mode envelope, if it carries one.
fn parse_envelope(message: &WsMessage) -> Result<Option<SocketEnvelope>, AdapterError> {
    match message {
        WsMessage::Text(text) => Ok(Some(serde_json::from_str(text)?)),
        _ => Ok(None),
    }
}

/// Post a reply via `chat.postMessage`.
async fn post_message(
    client: &reqwest::Client,
    config: &SlackConfig,
    channel_id: &str,
    text: &str,
) -> Result<(), AdapterError> {
    let payload = json!({
        "channel": channel_id,
        "text": text,
        "unfurl_links": false,
        "unfurl_media": false,
    });
    let response: PostMessageResponse = client
        .post(format!("{}/chat.postMessage", config.api_base))
        .bearer_auth(&config.bot_token)
        .json(&payload)
        .send()
        .await?
        .json()
        .await?;

    if !response.ok {
        return Err(AdapterError::Api(format!(
            "chat.postMessage failed: {}",
            response.error.unwrap_or_else(|| "unknown error".to_owned())
        )));
    }
    Ok(())
}
