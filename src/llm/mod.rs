//! LLM client abstraction used by every review agent's analyzer/modifier
//! stage.
//!
//! Each agent speaks to the model through a system prompt plus a user
//! prompt and expects prose back (sometimes JSON-shaped prose, sometimes
//! plain Markdown). The split between [`LlmClient`] and the JSON-salvage
//! helpers in [`json`] mirrors `cosmos-engine::llm::client`'s split
//! between the HTTP call and `parse_structured_content`.

mod fake;
mod http;
pub mod json;

pub use fake::FakeLlmClient;
pub use http::HttpLlmClient;

use async_trait::async_trait;

use crate::error::LlmError;

/// One turn of a chat-completion request.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// `"system"` or `"user"`.
    pub role: &'static str,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Builds a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    /// Builds a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// A request to complete a chat conversation.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// The conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

/// Abstraction over "send a prompt, get prose back" so every agent can be
/// tested against [`FakeLlmClient`] without network access.
///
/// Implementations must be thread-safe: the orchestrator shares one client
/// across every concurrently running task.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Completes `request`, cooperating with `cancel` for early abort.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] if the call fails after retries, is rejected
    /// outright (auth/malformed request), times out, or is cancelled.
    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<String, LlmError>;
}
