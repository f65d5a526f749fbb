//! Deterministic [`LlmClient`] for tests: no network, scripted responses.

use async_trait::async_trait;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::llm::{CompletionRequest, LlmClient};

/// Replays a fixed queue of responses, in order, one per [`LlmClient::complete`]
/// call. Panics (via an explicit error, never `unwrap`) if exhausted, so
/// tests fail loudly instead of hanging.
pub struct FakeLlmClient {
    responses: Mutex<Vec<Result<String, LlmError>>>,
}

impl FakeLlmClient {
    /// Builds a client that returns `responses` in order, one per call.
    #[must_use]
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().rev().map(Ok).collect()),
        }
    }

    /// Builds a client whose `n`th call fails with `error`, by position.
    #[must_use]
    pub fn with_results(results: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(results.into_iter().rev().collect()),
        }
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn complete(&self, _request: CompletionRequest, cancel: &CancellationToken) -> Result<String, LlmError> {
        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }
        let mut queue = self.responses.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        queue.pop().unwrap_or(Err(LlmError::CallFailed {
            attempts: 0,
            message: "FakeLlmClient response queue exhausted".to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    #[tokio::test]
    async fn replays_responses_in_order() {
        let client = FakeLlmClient::new(vec!["first".to_string(), "second".to_string()]);
        let cancel = CancellationToken::new();
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.0,
            max_tokens: 10,
        };
        let first = client.complete(request.clone(), &cancel).await.unwrap();
        let second = client.complete(request, &cancel).await.unwrap();
        assert_eq!(first, "first");
        assert_eq!(second, "second");
    }

    #[tokio::test]
    async fn respects_cancellation() {
        let client = FakeLlmClient::new(vec!["unused".to_string()]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.0,
            max_tokens: 10,
        };
        let result = client.complete(request, &cancel).await;
        assert!(matches!(result, Err(LlmError::Cancelled)));
    }
}
