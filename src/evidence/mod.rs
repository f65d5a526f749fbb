//! Evidence search stage: turns [`UnsupportedClaim`]s into
//! [`EvidenceResult`]s by querying a [`SearchClient`] and scoring the
//! hits.
//!
//! Grounded on `web_agent_app/evidence_detector.py::process_section`
//! (claim-cap overflow drop, descending confidence) and
//! `web_agent_app/web_search_agent.py` (query building, top-K selection).

pub mod scoring;

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::agents::ProgressHook;
use crate::core::claim::{EvidenceResult, EvidenceStatus, SourceRef, UnsupportedClaim};
use crate::search::SearchClient;

/// Top-K sources kept per claim, per spec §4.6.
pub const TOP_K_SOURCES: usize = 3;

/// Confidence threshold above which a result is `Success` rather than
/// `Partial` (spec §4.6 default).
const SUCCESS_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Builds the search query for a claim from its first three keywords,
/// per `web_search_agent.py::_build_search_query`'s base-query step.
/// The original's claim-type-conditioned modifier suffixes are folded
/// into the more general [`crate::core::claim::ClaimType`] classification
/// upstream rather than re-derived from keyword sniffing here.
#[must_use]
pub fn build_search_query(claim: &UnsupportedClaim) -> String {
    claim.search_keywords.iter().take(3).cloned().collect::<Vec<_>>().join(" ")
}

/// Drops claims beyond `cap`, keeping the highest-confidence ones, per
/// spec §4.6's claim-cap overflow policy.
#[must_use]
pub fn cap_claims(mut claims: Vec<UnsupportedClaim>, cap: usize) -> Vec<UnsupportedClaim> {
    if claims.len() <= cap {
        return claims;
    }
    claims.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    warn!(
        dropped = claims.len() - cap,
        cap, "evidence claim cap exceeded; dropping lowest-confidence claims"
    );
    claims.truncate(cap);
    claims
}

/// Searches evidence for every claim concurrently, bounded by `concurrency`
/// in-flight searches at once (spec §5.2's `N_search`).
pub async fn search_all(
    claims: &[UnsupportedClaim],
    client: &Arc<dyn SearchClient>,
    concurrency: usize,
    cancel: &CancellationToken,
    on_progress: Option<ProgressHook>,
) -> Vec<EvidenceResult> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = tokio::task::JoinSet::new();
    let total = claims.len();

    for claim in claims.iter().cloned() {
        let semaphore = Arc::clone(&semaphore);
        let client = Arc::clone(client);
        let cancel = cancel.clone();
        set.spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return search_one(&claim, client.as_ref(), &cancel).await;
            };
            search_one(&claim, client.as_ref(), &cancel).await
        });
    }

    let mut results = Vec::with_capacity(claims.len());
    let mut completed = 0usize;
    while let Some(joined) = set.join_next().await {
        if let Ok(result) = joined {
            results.push(result);
        }
        completed += 1;
        if let Some(hook) = &on_progress {
            hook(completed, total);
        }
    }
    results
}

async fn search_one(claim: &UnsupportedClaim, client: &dyn SearchClient, cancel: &CancellationToken) -> EvidenceResult {
    let query = build_search_query(claim);

    let hits = match client.search(&query, 10, cancel).await {
        Ok(hits) => hits,
        Err(err) => {
            warn!(claim_id = %claim.claim_id, error = %err, "evidence search failed for claim");
            return EvidenceResult {
                claim_id: claim.claim_id.clone(),
                claim_text: claim.claim_text.clone(),
                section_title: claim.section_title.clone(),
                search_query: query,
                sources: Vec::new(),
                confidence: 0.0,
                status: EvidenceStatus::Failed,
            };
        }
    };

    let haystack = format!("{} {}", claim.claim_text, claim.context);
    let mut sources: Vec<SourceRef> = hits
        .iter()
        .map(|hit| {
            let relevance = scoring::relevance_score(&format!("{} {}", hit.title, hit.snippet), &haystack);
            let domain = url::Url::parse(&hit.url).ok().and_then(|u| u.host_str().map(str::to_lowercase)).unwrap_or_default();
            let authority = scoring::authority_score(&domain);
            SourceRef::from_hit(hit, relevance, authority)
        })
        .collect();

    sources.sort_by(|a, b| b.combined_score().total_cmp(&a.combined_score()));
    sources.truncate(TOP_K_SOURCES);

    let confidence = if sources.is_empty() {
        0.0
    } else {
        sources.iter().map(SourceRef::combined_score).sum::<f64>() / sources.len() as f64
    };

    let status = if sources.is_empty() {
        EvidenceStatus::Failed
    } else if confidence >= SUCCESS_CONFIDENCE_THRESHOLD {
        EvidenceStatus::Success
    } else {
        EvidenceStatus::Partial
    };

    EvidenceResult {
        claim_id: claim.claim_id.clone(),
        claim_text: claim.claim_text.clone(),
        section_title: claim.section_title.clone(),
        search_query: query,
        sources,
        confidence,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::claim::{ClaimType, SearchHit};
    use std::sync::Arc;

    fn claim(id: &str, confidence: f64) -> UnsupportedClaim {
        UnsupportedClaim {
            claim_id: id.to_string(),
            claim_text: "AI improved workplace productivity".to_string(),
            section_title: "H1 > H2".to_string(),
            claim_type: ClaimType::Statistical,
            confidence,
            context: "context".to_string(),
            search_keywords: vec!["ai".to_string(), "productivity".to_string(), "workplace".to_string()],
            original_position: 0,
        }
    }

    #[test]
    fn caps_claims_by_descending_confidence() {
        let claims = vec![claim("a", 0.3), claim("b", 0.9), claim("c", 0.5)];
        let capped = cap_claims(claims, 2);
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[0].claim_id, "b");
        assert_eq!(capped[1].claim_id, "c");
    }

    #[test]
    fn under_cap_is_unchanged() {
        let claims = vec![claim("a", 0.3)];
        let capped = cap_claims(claims, 5);
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn search_all_returns_failed_for_no_hits() {
        let client: Arc<dyn SearchClient> = Arc::new(crate::search::FakeSearchClient::new(vec![]));
        let cancel = CancellationToken::new();
        let results = search_all(&[claim("a", 0.9)], &client, 2, &cancel, None).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, EvidenceStatus::Failed);
    }

    #[tokio::test]
    async fn search_all_scores_and_sorts_hits() {
        let hits = vec![
            SearchHit {
                title: "unrelated".to_string(),
                url: "https://random-blog.net".to_string(),
                snippet: "nothing relevant here".to_string(),
            },
            SearchHit {
                title: "AI productivity".to_string(),
                url: "https://nature.com/article".to_string(),
                snippet: "AI improved workplace productivity significantly".to_string(),
            },
        ];
        let client: Arc<dyn SearchClient> = Arc::new(crate::search::FakeSearchClient::new(vec![("ai productivity workplace", hits)]));
        let cancel = CancellationToken::new();
        let results = search_all(&[claim("a", 0.9)], &client, 2, &cancel, None).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].sources.first().unwrap().domain, "nature.com");
    }
}
