//! Deterministic [`SearchClient`] for tests: no network, scripted hits.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::claim::SearchHit;
use crate::error::EvidenceSearchError;
use crate::search::SearchClient;

/// Maps query strings to canned hit lists; queries with no fixture return
/// an empty result set (mirroring "search ran, found nothing").
pub struct FakeSearchClient {
    fixtures: HashMap<String, Vec<SearchHit>>,
    calls: Mutex<Vec<String>>,
}

impl FakeSearchClient {
    /// Builds a client from a list of `(query, hits)` fixtures.
    #[must_use]
    pub fn new(fixtures: Vec<(&str, Vec<SearchHit>)>) -> Self {
        Self {
            fixtures: fixtures.into_iter().map(|(q, hits)| (q.to_string(), hits)).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Returns every query this client was asked to search, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl SearchClient for FakeSearchClient {
    async fn search(&self, query: &str, max_results: usize, cancel: &CancellationToken) -> Result<Vec<SearchHit>, EvidenceSearchError> {
        if cancel.is_cancelled() {
            return Err(EvidenceSearchError::Cancelled);
        }
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(query.to_string());
        Ok(self
            .fixtures
            .get(query)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(max_results)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_fixture_hits_for_known_query() {
        let hit = SearchHit {
            title: "t".into(),
            url: "https://example.org".into(),
            snippet: "s".into(),
        };
        let client = FakeSearchClient::new(vec![("query a", vec![hit.clone()])]);
        let cancel = CancellationToken::new();
        let hits = client.search("query a", 10, &cancel).await.unwrap();
        assert_eq!(hits, vec![hit]);
        assert_eq!(client.calls(), vec!["query a".to_string()]);
    }

    #[tokio::test]
    async fn returns_empty_for_unknown_query() {
        let client = FakeSearchClient::new(vec![]);
        let cancel = CancellationToken::new();
        let hits = client.search("unknown", 10, &cancel).await.unwrap();
        assert!(hits.is_empty());
    }
}
