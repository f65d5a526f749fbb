//! Real HTTP-backed [`SearchClient`].
//!
//! Grounded on `web_agent_app/web_search_agent.py::_search_custom_api`:
//! a POST with `{"query": ..., "engines": [...]}`, response shaped as
//! `{"items": [{"title", "link", "content", "engine"}, ...]}`. Field names
//! are translated to the `SearchHit` shape at the boundary.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::core::claim::SearchHit;
use crate::error::EvidenceSearchError;
use crate::search::SearchClient;

#[derive(Serialize)]
struct SearchRequestBody<'a> {
    query: &'a str,
    engines: &'a [&'a str],
}

#[derive(Deserialize)]
struct SearchResponseBody {
    #[serde(default)]
    items: Vec<SearchResponseItem>,
}

#[derive(Deserialize)]
struct SearchResponseItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    content: String,
}

/// A [`SearchClient`] backed by a real HTTP search endpoint.
pub struct HttpSearchClient {
    client: reqwest::Client,
    endpoint: String,
    engines: Vec<&'static str>,
    timeout: Duration,
}

impl HttpSearchClient {
    /// Builds a client targeting `endpoint`, the custom search API's POST
    /// URL, using the `serp` engine as the original did.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            engines: vec!["serp"],
            timeout,
        }
    }
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    async fn search(&self, query: &str, max_results: usize, cancel: &CancellationToken) -> Result<Vec<SearchHit>, EvidenceSearchError> {
        let body = SearchRequestBody {
            query,
            engines: &self.engines,
        };

        let call = self.client.post(&self.endpoint).json(&body).timeout(self.timeout).send();

        let response = tokio::select! {
            () = cancel.cancelled() => return Err(EvidenceSearchError::Cancelled),
            result = call => result,
        };

        let response = response.map_err(|err| {
            if err.is_timeout() {
                EvidenceSearchError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                EvidenceSearchError::Transport { message: err.to_string() }
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(EvidenceSearchError::Provider {
                message: format!("search API returned {status}"),
            });
        }

        let parsed: SearchResponseBody = response
            .json()
            .await
            .map_err(|err| EvidenceSearchError::Provider { message: err.to_string() })?;

        Ok(parsed
            .items
            .into_iter()
            .take(max_results)
            .map(|item| SearchHit {
                title: item.title,
                url: item.link,
                snippet: item.content.chars().take(500).collect(),
            })
            .collect())
    }
}
