//! Parsed-document section model.
//!
//! `ParsedDocument` is the output of [`crate::parser::parse`]: an ordered,
//! two-level `H1 -> sectionKey -> content` view of a Markdown document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Name of the synthetic section holding content that appears before the
/// first H1 heading (`"文档开头"`, "document prologue" — see spec §3).
pub const PROLOGUE_TITLE: &str = "文档开头";

/// An ordered view of a document's sections, keyed first by H1 title and
/// then by section key (`H2` or `"H2 > H3"`).
///
/// Both map levels preserve first-appearance order, which is the ordering
/// invariant the unified-sections builder and the flat view adapter both
/// rely on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// `H1 title -> (section key -> content)`.
    pub h1s: IndexMap<String, IndexMap<String, String>>,
}

impl ParsedDocument {
    /// Creates an empty parsed document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the content of one section, if present.
    #[must_use]
    pub fn section(&self, h1: &str, section_key: &str) -> Option<&str> {
        self.h1s.get(h1)?.get(section_key).map(String::as_str)
    }

    /// Returns the ordered list of H1 titles.
    #[must_use]
    pub fn h1_titles(&self) -> Vec<&str> {
        self.h1s.keys().map(String::as_str).collect()
    }

    /// Returns the ordered list of section keys under one H1.
    #[must_use]
    pub fn section_keys(&self, h1: &str) -> Vec<&str> {
        self.h1s
            .get(h1)
            .map(|inner| inner.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Total number of sections across all H1s.
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.h1s.values().map(IndexMap::len).sum()
    }

    /// Concatenates every section's content, in order, for the parser's
    /// round-trip invariant (spec §8.1).
    #[must_use]
    pub fn concat_in_order(&self) -> String {
        let mut out = String::new();
        for inner in self.h1s.values() {
            for content in inner.values() {
                out.push_str(content);
                out.push('\n');
            }
        }
        out
    }

    pub(crate) fn insert(&mut self, h1: String, section_key: String, content: String) {
        self.h1s.entry(h1).or_default().insert(section_key, content);
    }
}

/// Counts Unicode words in `text`, used for `SectionRecord::word_count`.
///
/// Uses `unicode_words` rather than `split_whitespace` so CJK text (the
/// corpus this pipeline was built against is Chinese-language) is counted
/// meaningfully instead of collapsing to a single "word" per line.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.unicode_words().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_handles_cjk_and_latin() {
        assert_eq!(word_count("hello world"), 2);
        assert_eq!(word_count("本项目符合国家规划"), 9);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn parsed_document_preserves_insertion_order() {
        let mut doc = ParsedDocument::new();
        doc.insert("A".to_string(), "one".to_string(), "1".to_string());
        doc.insert("A".to_string(), "two".to_string(), "2".to_string());
        doc.insert("B".to_string(), "three".to_string(), "3".to_string());
        assert_eq!(doc.h1_titles(), vec!["A", "B"]);
        assert_eq!(doc.section_keys("A"), vec!["one", "two"]);
        assert_eq!(doc.section_count(), 3);
    }
}
