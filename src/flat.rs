//! Flat view adapter: projects [`UnifiedSections`] into the `chapters[]`
//! shape `GetFlat`/the stream `result` event return, per spec §4.11.
//!
//! Grounded on `shared/json_merger.py`'s flattening step: walk the unified
//! map in order, keep only records whose status is a real modification.

use crate::core::record::{FlatChapter, FlatChapters, UnifiedSections};

/// Walks `unified` in order and emits one [`FlatChapter`] per record whose
/// status indicates a real modification — not `success` (unchanged) and
/// not `no_evidence` (spec §4.11/§8 scenario 6: "`chapters` omits the
/// record").
#[must_use]
pub fn build_flat_chapters(unified: &UnifiedSections) -> FlatChapters {
    let mut chapters = Vec::new();
    for inner in unified.h1s.values() {
        for record in inner.values() {
            if !record.status.is_real_modification() {
                continue;
            }
            chapters.push(FlatChapter {
                original_text: record.original_content.clone(),
                edit_text: record.regenerated_content.clone(),
                comment: if record.suggestion.is_empty() {
                    record.error.clone().unwrap_or_default()
                } else {
                    record.suggestion.clone()
                },
            });
        }
    }
    chapters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::{RecordStatus, SectionRecord};
    use indexmap::IndexMap;

    fn unified_with(h1: &str, key: &str, record: SectionRecord) -> UnifiedSections {
        let mut inner = IndexMap::new();
        inner.insert(key.to_string(), record);
        let mut unified = UnifiedSections::new();
        unified.h1s.insert(h1.to_string(), inner);
        unified
    }

    #[test]
    fn unchanged_sections_are_omitted() {
        let unified = unified_with("H1", "H2", SectionRecord::unchanged("body"));
        assert!(build_flat_chapters(&unified).is_empty());
    }

    #[test]
    fn no_evidence_sections_are_omitted() {
        let record = SectionRecord::modified("orig", "", "orig", RecordStatus::NoEvidence);
        let unified = unified_with("H1", "H2", record);
        assert!(build_flat_chapters(&unified).is_empty());
    }

    #[test]
    fn modified_sections_are_included_in_order() {
        let mut inner = IndexMap::new();
        inner.insert("a".to_string(), SectionRecord::modified("o1", "s1", "r1", RecordStatus::Modified));
        inner.insert("b".to_string(), SectionRecord::unchanged("o2"));
        inner.insert("c".to_string(), SectionRecord::modified("o3", "s3", "r3", RecordStatus::TableOptimized));
        let mut unified = UnifiedSections::new();
        unified.h1s.insert("H1".to_string(), inner);

        let chapters = build_flat_chapters(&unified);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].edit_text, "r1");
        assert_eq!(chapters[1].edit_text, "r3");
    }

    #[test]
    fn failed_sections_surface_the_error_as_comment_when_no_suggestion() {
        let record = SectionRecord::failed("orig", "", "boom");
        let unified = unified_with("H1", "H2", record);
        let chapters = build_flat_chapters(&unified);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].comment, "boom");
    }
}
