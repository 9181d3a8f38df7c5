//! LLM provider abstraction for the general-chat path.
//!
//! Messages that are not meeting requests are answered by an LLM. The bot
//! needs nothing more than a single text completion per message — no tool
//! calling, no streaming — so the trait surface stays small.

use async_trait::async_trait;

pub mod openai;

/// A request for one chat completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt injected before the user message.
    pub system: Option<String>,
    /// The user's message text.
    pub user: String,
    /// Maximum tokens in the response.
    pub max_tokens: Option<u32>,
}

/// A text-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Produce a single completion for `request`.
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;

    /// Identifier of the model that will serve requests.
    fn model_id(&self) -> &str;
}

/// Errors returned by model providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response did not match expected schema.
    #[error("provider response parse error: {0}")]
    Parse(String),
    /// Upstream provider responded with an error status.
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
}

/// Check HTTP response status and return body text or a structured error.
pub(crate) async fn check_http_response(
    response: reqwest::Response,
) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}
