//! Per-section output records and the unified/flat shapes built from them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::section::word_count;

/// Outcome of modifying one section, per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// The modifier rewrote the section per an instruction.
    Modified,
    /// The table agent converted prose into a Markdown table.
    TableOptimized,
    /// The section was only flagged, not rewritten (reserved for agents
    /// that report without regenerating content).
    Identified,
    /// The thesis agent corrected drift from the document's thesis.
    Corrected,
    /// The evidence agent folded sources into the section.
    Enhanced,
    /// The evidence agent found no usable sources for this claim.
    NoEvidence,
    /// No instruction targeted this section; content is unchanged.
    Success,
    /// The modifier call failed after retries; original content retained.
    Failed,
}

impl RecordStatus {
    /// Whether this status represents a real modification, per spec
    /// §4.11 ("not `success`/unchanged and not `no_evidence`").
    #[must_use]
    pub const fn is_real_modification(self) -> bool {
        !matches!(self, Self::Success | Self::NoEvidence)
    }
}

/// The per-section output element every agent produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    /// The section's content before modification.
    pub original_content: String,
    /// The instruction/suggestion that produced this record, if any.
    pub suggestion: String,
    /// The section's content after modification (equals `original_content`
    /// when nothing changed or evidence was unavailable).
    pub regenerated_content: String,
    /// Unicode word count of `regenerated_content`.
    pub word_count: usize,
    /// Outcome classification.
    pub status: RecordStatus,
    /// Present only when `status == Failed`: the recorded error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SectionRecord {
    /// Builds an unchanged record for a section no instruction targeted.
    #[must_use]
    pub fn unchanged(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            word_count: word_count(&content),
            regenerated_content: content.clone(),
            original_content: content,
            suggestion: String::new(),
            status: RecordStatus::Success,
            error: None,
        }
    }

    /// Builds a record for a successfully modified section.
    #[must_use]
    pub fn modified(
        original_content: impl Into<String>,
        suggestion: impl Into<String>,
        regenerated_content: impl Into<String>,
        status: RecordStatus,
    ) -> Self {
        let regenerated_content = regenerated_content.into();
        Self {
            word_count: word_count(&regenerated_content),
            original_content: original_content.into(),
            suggestion: suggestion.into(),
            regenerated_content,
            status,
            error: None,
        }
    }

    /// Builds a record for a section whose modification failed; the
    /// original content is retained per spec §4.5.
    #[must_use]
    pub fn failed(original_content: impl Into<String>, suggestion: impl Into<String>, error: impl Into<String>) -> Self {
        let original_content = original_content.into();
        Self {
            word_count: word_count(&original_content),
            regenerated_content: original_content.clone(),
            original_content,
            suggestion: suggestion.into(),
            status: RecordStatus::Failed,
            error: Some(error.into()),
        }
    }
}

/// The canonical two-level output shape every agent returns:
/// `H1 -> sectionKey -> SectionRecord`. Both levels preserve the parser's
/// order, per spec §3/§8.3.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedSections {
    /// `H1 title -> (section key -> record)`.
    #[serde(flatten)]
    pub h1s: IndexMap<String, IndexMap<String, SectionRecord>>,
}

impl UnifiedSections {
    /// Creates an empty unified-sections map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of section records across all H1s.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.h1s.values().map(IndexMap::len).sum()
    }
}

/// One row of the flat-view projection, per spec §3/§4.11.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatChapter {
    /// The section's content before modification.
    pub original_text: String,
    /// The section's content after modification.
    pub edit_text: String,
    /// Human-readable note (the suggestion, or an explanatory note for
    /// `no_evidence` records when the caller chooses to surface them).
    pub comment: String,
}

/// An ordered list of [`FlatChapter`]s, the shape `GetFlat` returns.
pub type FlatChapters = Vec<FlatChapter>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_record_retains_original_as_regenerated() {
        let record = SectionRecord::failed("original", "suggestion", "boom");
        assert_eq!(record.regenerated_content, "original");
        assert_eq!(record.status, RecordStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));
    }

    #[test]
    fn status_real_modification_excludes_success_and_no_evidence() {
        assert!(!RecordStatus::Success.is_real_modification());
        assert!(!RecordStatus::NoEvidence.is_real_modification());
        assert!(RecordStatus::Modified.is_real_modification());
        assert!(RecordStatus::Enhanced.is_real_modification());
    }
}
