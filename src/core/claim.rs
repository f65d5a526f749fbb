//! Evidence-agent data model: unsupported claims and their search results.
//!
//! Grounded on `web_agent_app/evidence_detector.py`'s `UnsupportedClaim`
//! dataclass and `web_agent_app/web_search_agent.py`'s `SearchResult`.

use serde::{Deserialize, Serialize};
use url::Url;

/// Coarse classification of a factual claim, supplementing the distilled
/// spec's `UnsupportedClaim` shape with the original's `claim_type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    /// A plain factual assertion.
    Factual,
    /// A claim built on a number or measurement.
    Statistical,
    /// A claim asserting cause and effect.
    Causal,
    /// A claim comparing two or more things.
    Comparative,
    /// A claim about a past event or timeline.
    Historical,
}

/// A factual statement the evidence analyzer flagged as lacking support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsupportedClaim {
    /// Unique id within the run.
    pub claim_id: String,
    /// The flagged sentence or clause.
    pub claim_text: String,
    /// The H1/section-key path the claim was found in.
    pub section_title: String,
    /// Coarse claim classification (supplement from the original source).
    pub claim_type: ClaimType,
    /// How urgently the claim needs evidentiary support, in `[0, 1]`.
    pub confidence: f64,
    /// Surrounding prose, used to build the rewrite prompt.
    pub context: String,
    /// Keywords used to build the search query.
    pub search_keywords: Vec<String>,
    /// Position (line or paragraph index) in the original section, used
    /// only for stable ordering and diagnostics.
    pub original_position: usize,
}

/// One search hit, as returned by a [`crate::search::SearchClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result title.
    pub title: String,
    /// Result URL.
    pub url: String,
    /// Result snippet/summary.
    pub snippet: String,
}

/// A scored, selected source attached to an [`EvidenceResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Result title.
    pub title: String,
    /// Result URL.
    pub url: String,
    /// Result snippet/summary.
    pub snippet: String,
    /// Host portion of `url`, lower-cased.
    pub domain: String,
    /// Word-overlap relevance score in `[0, 1]`.
    pub relevance: f64,
    /// Domain-authority score in `[0, 1]`.
    pub authority: f64,
}

impl SourceRef {
    /// Builds a `SourceRef` from a raw hit plus its computed scores,
    /// deriving `domain` via `url::Url::parse` the way the original
    /// derived `source_domain` from `urlparse(url).netloc`.
    #[must_use]
    pub fn from_hit(hit: &SearchHit, relevance: f64, authority: f64) -> Self {
        let domain = Url::parse(&hit.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .unwrap_or_default();
        Self {
            title: hit.title.clone(),
            url: hit.url.clone(),
            snippet: hit.snippet.clone(),
            domain,
            relevance,
            authority,
        }
    }

    /// Combined score: `authority*0.6 + relevance*0.4`, per spec §4.6.
    #[must_use]
    pub fn combined_score(&self) -> f64 {
        self.authority * 0.6 + self.relevance * 0.4
    }
}

/// Outcome of the evidence search stage for one claim, per spec §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceResult {
    /// The claim this result answers.
    pub claim_id: String,
    /// Copied from the claim, for display without a join.
    pub claim_text: String,
    /// Copied from the claim.
    pub section_title: String,
    /// The query actually sent to the search client.
    pub search_query: String,
    /// Top-K selected sources (spec default K=3), highest-scored first.
    pub sources: Vec<SourceRef>,
    /// Mean of the selected sources' combined scores.
    pub confidence: f64,
    /// Outcome classification.
    pub status: EvidenceStatus,
}

/// Per-claim search outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStatus {
    /// At least one source was found and scored.
    Success,
    /// The search ran but results were sparse or low-confidence.
    Partial,
    /// The search failed or returned nothing.
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ref_derives_lowercase_domain() {
        let hit = SearchHit {
            title: "t".into(),
            url: "https://WWW.Example.COM/a/b?x=1".into(),
            snippet: "s".into(),
        };
        let source = SourceRef::from_hit(&hit, 0.5, 0.9);
        assert_eq!(source.domain, "www.example.com");
        assert!((source.combined_score() - (0.9 * 0.6 + 0.5 * 0.4)).abs() < f64::EPSILON);
    }

    #[test]
    fn source_ref_handles_unparseable_url() {
        let hit = SearchHit {
            title: "t".into(),
            url: "not a url".into(),
            snippet: "s".into(),
        };
        let source = SourceRef::from_hit(&hit, 0.0, 0.5);
        assert_eq!(source.domain, "");
    }
}
