//! Analyzer output for the non-evidence agents.

use serde::{Deserialize, Serialize};

/// A directive from an analyzer targeting one section.
///
/// `subtitle` references a section key (`H2` or `"H2 > H3"`) from the
/// parsed document; `suggestion` is free-text guidance handed to the
/// modifier. The redundancy analyzer may emit several instructions with
/// the same `subtitle` (once per section involved in a cross-section
/// redundancy) — the modifier treats each independently, per spec §4.4.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationInstruction {
    /// The H1 this instruction belongs to.
    pub h1: String,
    /// The section key the instruction targets.
    pub subtitle: String,
    /// Free-text guidance for the modifier.
    pub suggestion: String,
}

impl ModificationInstruction {
    /// Builds an instruction, rejecting empty `subtitle`/`suggestion` per
    /// the analyzer's parsing policy (spec §4.4: "malformed elements are
    /// dropped").
    #[must_use]
    pub fn new(h1: impl Into<String>, subtitle: impl Into<String>, suggestion: impl Into<String>) -> Option<Self> {
        let subtitle = subtitle.into();
        let suggestion = suggestion.into();
        if subtitle.trim().is_empty() || suggestion.trim().is_empty() {
            return None;
        }
        Some(Self {
            h1: h1.into(),
            subtitle,
            suggestion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_fields() {
        assert!(ModificationInstruction::new("H1", "", "suggestion").is_none());
        assert!(ModificationInstruction::new("H1", "subtitle", "   ").is_none());
        assert!(ModificationInstruction::new("H1", "subtitle", "suggestion").is_some());
    }
}
