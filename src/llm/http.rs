//! Real HTTP-backed [`LlmClient`], speaking an OpenAI-compatible chat
//! completions API.
//!
//! Grounded on `cosmos-engine::llm::client::send_with_retry`: bearer
//! auth, exponential backoff on 429/5xx/transient network errors, and a
//! hard per-call timeout. Differs from the teacher in error typing
//! (`LlmError` variants instead of `anyhow`) and in cooperating with a
//! [`tokio_util::sync::CancellationToken`] so the orchestrator can abort
//! an in-flight call when a task is cancelled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmClient};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

fn redact(message: &str) -> String {
    let lower = message.to_lowercase();
    const SECRET_MARKERS: &[&str] = &["api_key", "apikey", "secret", "password", "bearer", "authorization"];
    if SECRET_MARKERS.iter().any(|marker| lower.contains(marker)) {
        "(response redacted: may contain credentials)".to_string()
    } else {
        message.to_string()
    }
}

fn backoff(attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(INITIAL_BACKOFF_MS.saturating_mul(factor))
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponseBody {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

/// An [`LlmClient`] backed by a real HTTP endpoint.
pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl HttpLlmClient {
    /// Builds a client targeting `base_url` (an OpenAI-compatible chat
    /// completions endpoint) authenticated with `api_key`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
        }
    }

    fn is_retryable_status(status: reqwest::StatusCode) -> bool {
        status.as_u16() == 429 || status.is_server_error()
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, request: CompletionRequest, cancel: &CancellationToken) -> Result<String, LlmError> {
        let messages: Vec<WireMessage<'_>> = request
            .messages
            .iter()
            .map(|m: &ChatMessage| WireMessage {
                role: m.role,
                content: &m.content,
            })
            .collect();
        let body = ChatRequestBody {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let call = self
                .client
                .post(&self.base_url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .timeout(self.timeout)
                .send();

            let response = tokio::select! {
                () = cancel.cancelled() => return Err(LlmError::Cancelled),
                result = call => result,
            };

            let response = match response {
                Ok(response) => response,
                Err(err) if err.is_timeout() => {
                    return Err(LlmError::Timeout {
                        timeout_secs: self.timeout.as_secs(),
                    });
                }
                Err(err) if attempt <= MAX_RETRIES => {
                    warn!(attempt, error = %err, "llm transport error, retrying");
                    tokio::time::sleep(backoff(attempt)).await;
                    continue;
                }
                Err(err) => {
                    return Err(LlmError::CallFailed {
                        attempts: attempt,
                        message: redact(&err.to_string()),
                    });
                }
            };

            let status = response.status();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::Authentication { message: redact(&text) });
            }

            if Self::is_retryable_status(status) && attempt <= MAX_RETRIES {
                warn!(attempt, %status, "llm call rejected, retrying");
                tokio::time::sleep(backoff(attempt)).await;
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::CallFailed {
                    attempts: attempt,
                    message: redact(&text),
                });
            }

            let text = response.text().await.map_err(|err| LlmError::CallFailed {
                attempts: attempt,
                message: redact(&err.to_string()),
            })?;

            let parsed: ChatResponseBody = serde_json::from_str(&text).map_err(|err| LlmError::MalformedRequest {
                message: format!("could not parse chat response: {err}"),
            })?;

            let content = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .unwrap_or_default();

            if content.is_empty() {
                return Err(LlmError::CallFailed {
                    attempts: attempt,
                    message: "model returned an empty completion".to_string(),
                });
            }

            return Ok(content);
        }
    }
}
