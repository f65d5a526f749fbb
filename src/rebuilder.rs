//! Document rebuilder: splices regenerated section content back into the
//! original Markdown, per spec §4.10.
//!
//! Grounded on `shared/document_parser.py::extract_section_content`'s
//! fuzzy-match fallback chain (exact, then case-insensitive substring
//! either direction, first-occurrence tie-break), generalized here from a
//! single lookup to a full-document splice.

use indexmap::IndexMap;

use crate::core::record::{RecordStatus, SectionRecord, UnifiedSections};
use crate::core::section::{ParsedDocument, PROLOGUE_TITLE};
use crate::parser::{self, MaxLevel};

/// Rebuilds `markdown` by replacing each section whose heading path
/// resolves (tolerantly) to a modified record with that record's
/// regenerated content, preserving every other section verbatim.
///
/// Matching is first attempted exactly (`H1`, then section key); on a miss,
/// falls back to case-insensitive substring matching in either direction,
/// resolving ties by first occurrence in `unified`'s iteration order — the
/// same "may collide when two H2s share a substring" behavior spec §9
/// documents as inherited rather than fixed.
#[must_use]
pub fn rebuild(markdown: &str, unified: &UnifiedSections) -> String {
    let doc: ParsedDocument = parser::parse(markdown, MaxLevel::H3, true);
    let mut parts = Vec::with_capacity(doc.section_count());

    for h1 in doc.h1_titles() {
        for key in doc.section_keys(h1) {
            let Some(original_content) = doc.section(h1, key) else { continue };
            let part = match find_record(unified, h1, key) {
                Some(record) => splice(h1, original_content, record),
                None => original_content.to_string(),
            };
            parts.push(part);
        }
    }

    parts.join("\n")
}

/// Produces the text that replaces one section's original content, given
/// its resolved record.
fn splice(h1: &str, original_content: &str, record: &SectionRecord) -> String {
    if h1 == PROLOGUE_TITLE || !record.status.is_real_modification() {
        return record.regenerated_content.clone();
    }
    // Non-prologue modified records carry heading-stripped bodies (the
    // modifier owns the body, the rebuilder owns the heading — spec §4.5).
    let heading_line = original_content.lines().next().unwrap_or_default();
    if record.regenerated_content.is_empty() {
        return original_content.to_string();
    }
    format!("{heading_line}\n{}", record.regenerated_content)
}

fn find_record<'a>(unified: &'a UnifiedSections, h1: &str, key: &str) -> Option<&'a SectionRecord> {
    if let Some(inner) = unified.h1s.get(h1) {
        if let Some(record) = tolerant_lookup(inner, key) {
            return Some(record);
        }
    }
    let h1_lower = h1.to_lowercase();
    for (candidate_h1, inner) in &unified.h1s {
        let candidate_lower = candidate_h1.to_lowercase();
        if candidate_lower == h1_lower || candidate_lower.contains(&h1_lower) || h1_lower.contains(candidate_lower.as_str()) {
            if let Some(record) = tolerant_lookup(inner, key) {
                return Some(record);
            }
        }
    }
    None
}

/// Exact match first; else first-occurrence case-insensitive substring
/// match in either direction.
fn tolerant_lookup<'a>(inner: &'a IndexMap<String, SectionRecord>, key: &str) -> Option<&'a SectionRecord> {
    if let Some(record) = inner.get(key) {
        return Some(record);
    }
    let key_lower = key.to_lowercase();
    inner.iter().find_map(|(candidate, record)| {
        let candidate_lower = candidate.to_lowercase();
        (candidate_lower.contains(&key_lower) || key_lower.contains(&candidate_lower)).then_some(record)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::SectionRecord;

    fn unified_with(h1: &str, key: &str, record: SectionRecord) -> UnifiedSections {
        let mut inner = IndexMap::new();
        inner.insert(key.to_string(), record);
        let mut unified = UnifiedSections::new();
        unified.h1s.insert(h1.to_string(), inner);
        unified
    }

    #[test]
    fn unmatched_sections_pass_through_verbatim() {
        let md = "# H1\n## H2\nbody\n";
        let unified = UnifiedSections::new();
        let rebuilt = rebuild(md, &unified);
        assert!(rebuilt.contains("## H2"));
        assert!(rebuilt.contains("body"));
    }

    #[test]
    fn modified_section_splices_regenerated_body_under_original_heading() {
        let md = "# H1\n## H2\noriginal body\n";
        let record = SectionRecord::modified("## H2\noriginal body", "tighten prose", "rewritten body", RecordStatus::Modified);
        let unified = unified_with("H1", "H2", record);
        let rebuilt = rebuild(md, &unified);
        assert!(rebuilt.contains("## H2\nrewritten body"));
        assert!(!rebuilt.contains("original body"));
    }

    #[test]
    fn tolerant_substring_match_resolves_loosely_named_section() {
        let md = "# H1\n## Building Contents Overview\nold\n";
        let record = SectionRecord::modified("## Building Contents Overview\nold", "s", "new table", RecordStatus::TableOptimized);
        let unified = unified_with("H1", "Building Contents", record);
        let rebuilt = rebuild(md, &unified);
        assert!(rebuilt.contains("new table"));
    }

    #[test]
    fn prologue_section_splices_without_a_synthetic_heading() {
        let md = "hello world\n";
        let record = SectionRecord::modified("hello world", "s", "greetings, world", RecordStatus::Modified);
        let unified = unified_with(PROLOGUE_TITLE, PROLOGUE_TITLE, record);
        let rebuilt = rebuild(md, &unified);
        assert_eq!(rebuilt, "greetings, world");
    }
}
