//! Web search client abstraction for the evidence agent.
//!
//! Grounded on `web_agent_app/web_search_agent.py::_search_custom_api`: a
//! single POST endpoint taking a query and returning a list of hits. The
//! split between [`SearchClient`] and [`HttpSearchClient`] mirrors the
//! `LlmClient`/`HttpLlmClient` split in [`crate::llm`].

mod fake;
mod http;

pub use fake::FakeSearchClient;
pub use http::HttpSearchClient;

use async_trait::async_trait;

use crate::core::claim::SearchHit;
use crate::error::EvidenceSearchError;

/// Abstraction over "run a web search, get hits back" so the evidence
/// agent can be tested against [`FakeSearchClient`] without network
/// access.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Searches for `query`, returning up to `max_results` hits.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceSearchError`] if the call fails, times out, or is
    /// cancelled.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<Vec<SearchHit>, EvidenceSearchError>;
}
