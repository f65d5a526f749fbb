//! Source scoring: authority (domain reputation) and relevance (word
//! overlap), combined per spec §4.6.
//!
//! Ported verbatim (scores included) from
//! `web_agent_app/web_search_agent.py::_calculate_authority_score` and
//! `_calculate_relevance_score`.

/// Exact-or-suffix domain-authority lookup table, highest-authority
/// sources first only for readability — lookup is exhaustive, not
/// first-match-wins.
const AUTHORITY_DOMAINS: &[(&str, f64)] = &[
    ("scholar.google.com", 0.95),
    ("pubmed.ncbi.nlm.nih.gov", 0.95),
    ("ieee.org", 0.9),
    ("acm.org", 0.9),
    ("springer.com", 0.9),
    ("elsevier.com", 0.9),
    ("nature.com", 0.95),
    ("science.org", 0.95),
    ("cell.com", 0.9),
    ("who.int", 0.95),
    ("worldbank.org", 0.9),
    ("un.org", 0.9),
    ("oecd.org", 0.9),
    ("reuters.com", 0.8),
    ("bbc.com", 0.8),
    ("economist.com", 0.85),
    ("ft.com", 0.85),
    ("wsj.com", 0.8),
    ("nytimes.com", 0.75),
    ("brookings.edu", 0.85),
    ("cnki.net", 0.9),
    ("wanfangdata.com.cn", 0.85),
    ("cas.cn", 0.9),
    ("xinhuanet.com", 0.7),
    ("people.com.cn", 0.7),
];

const DEFAULT_AUTHORITY: f64 = 0.5;
const UNPARSEABLE_AUTHORITY: f64 = 0.3;

/// Scores a domain's authority in `[0, 1]`.
///
/// `domain` should already be lower-cased (see
/// [`crate::core::claim::SourceRef::from_hit`]). An empty domain (the
/// unparseable-URL case) scores [`UNPARSEABLE_AUTHORITY`].
#[must_use]
pub fn authority_score(domain: &str) -> f64 {
    if domain.is_empty() {
        return UNPARSEABLE_AUTHORITY;
    }
    if let Some((_, score)) = AUTHORITY_DOMAINS.iter().find(|(d, _)| *d == domain) {
        return *score;
    }
    if let Some((_, score)) = AUTHORITY_DOMAINS.iter().find(|(d, _)| domain.ends_with(*d)) {
        return *score;
    }
    if domain.ends_with(".gov") {
        0.9
    } else if domain.ends_with(".edu") {
        0.85
    } else if domain.ends_with(".org") {
        0.7
    } else if domain.contains("university") || domain.contains("college") {
        0.8
    } else if domain.contains("research") || domain.contains("institute") {
        0.75
    } else {
        DEFAULT_AUTHORITY
    }
}

/// Scores how relevant `text` (title + snippet) is to `claim_text`, via
/// word-set overlap plus a bigram-match bonus, clamped to `[0, 1]`.
#[must_use]
pub fn relevance_score(text: &str, claim_text: &str) -> f64 {
    if text.trim().is_empty() || claim_text.trim().is_empty() {
        return 0.0;
    }

    let text_lower = text.to_lowercase();
    let claim_lower = claim_text.to_lowercase();

    let claim_words: std::collections::HashSet<&str> = claim_lower.split_whitespace().collect();
    let text_words: std::collections::HashSet<&str> = text_lower.split_whitespace().collect();

    if claim_words.is_empty() {
        return 0.0;
    }

    let overlap = claim_words.intersection(&text_words).count();
    let word_overlap = overlap as f64 / claim_words.len() as f64;

    let mut phrase_matches = 0usize;
    if claim_text.chars().count() > 20 {
        let words: Vec<&str> = claim_text.split_whitespace().collect();
        for pair in words.windows(2) {
            let phrase = format!("{} {}", pair[0], pair[1]).to_lowercase();
            if text_lower.contains(&phrase) {
                phrase_matches += 1;
            }
        }
    }
    let phrase_bonus = (phrase_matches as f64 * 0.2).min(0.4);

    (word_overlap + phrase_bonus).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_domain_match() {
        assert!((authority_score("nature.com") - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn suffix_domain_match() {
        assert!((authority_score("news.bbc.com") - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn gov_suffix_fallback() {
        assert!((authority_score("data.census.gov") - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn edu_suffix_fallback() {
        assert!((authority_score("cs.stanford.edu") - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn org_suffix_fallback() {
        assert!((authority_score("example.org") - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn substring_heuristic_university() {
        assert!((authority_score("university-of-example.net") - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_domain_default() {
        assert!((authority_score("random-blog.net") - DEFAULT_AUTHORITY).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_domain_is_unparseable_default() {
        assert!((authority_score("") - UNPARSEABLE_AUTHORITY).abs() < f64::EPSILON);
    }

    #[test]
    fn relevance_rewards_word_overlap() {
        let score = relevance_score("workplace productivity rose sharply", "workplace productivity increased");
        assert!(score > 0.0);
    }

    #[test]
    fn relevance_is_zero_for_disjoint_text() {
        let score = relevance_score("completely unrelated content here", "workplace productivity increased");
        assert!(score < 0.3);
    }

    #[test]
    fn relevance_clamped_to_one() {
        let score = relevance_score("artificial intelligence productivity", "artificial intelligence productivity");
        assert!(score <= 1.0);
    }
}
