//! Review agents: each pairs an analyzer (reads the whole document, emits
//! per-section directives) with a modifier (rewrites one section per
//! directive) per spec §3/§4.
//!
//! The two-phase analyze/modify shape and the shared concurrency/ordering
//! rules live here; each concrete agent (`redundancy`, `table`, `thesis`,
//! `evidence`) only supplies its prompts and its [`RecordStatus`].

pub mod evidence;
pub mod redundancy;
pub mod table;
pub mod thesis;

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::core::instruction::ModificationInstruction;
use crate::core::record::{RecordStatus, SectionRecord, UnifiedSections};
use crate::core::section::ParsedDocument;
use crate::error::LlmError;
use crate::llm::LlmClient;

/// A `(completed, total)` callback invoked once per finished unit of work
/// (one section's modification, one claim's search/rewrite), so a caller
/// can interpolate progress across the 40-90% band spec §4.9 describes,
/// instead of jumping straight from "modification started" to "done".
pub type ProgressHook = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Reads the whole document and emits zero or more directives, each
/// targeting one section.
///
/// Analyzers may emit several instructions for the same `subtitle` (the
/// redundancy analyzer does, once per section involved in a cross-section
/// repetition) — [`run_modification_pipeline`] applies same-section
/// instructions in emission order so each sees the previous one's output.
#[async_trait]
pub trait SectionAnalyzer: Send + Sync {
    /// Produces the directives for `document`.
    async fn analyze(&self, document: &ParsedDocument, llm: &dyn LlmClient, cancel: &CancellationToken) -> Result<Vec<ModificationInstruction>, LlmError>;
}

/// Rewrites one section's content per one directive.
#[async_trait]
pub trait SectionModifier: Send + Sync {
    /// The [`RecordStatus`] this modifier's successful output carries.
    fn record_status(&self) -> RecordStatus;

    /// Rewrites `original_content` per `suggestion`.
    async fn modify(
        &self,
        h1: &str,
        subtitle: &str,
        original_content: &str,
        suggestion: &str,
        llm: &dyn LlmClient,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError>;
}

/// Builds the baseline [`UnifiedSections`] where every section is
/// `unchanged`, then overlays modifications from `instructions`.
///
/// Instructions targeting the same `(h1, subtitle)` are applied in
/// emission order, sequentially, so the second sees the first's rewritten
/// content (spec §4.4). Distinct sections are modified concurrently,
/// bounded by `concurrency` in-flight LLM calls (spec §5.2's `N_mod`).
pub async fn run_modification_pipeline(
    document: &ParsedDocument,
    instructions: Vec<ModificationInstruction>,
    modifier: &Arc<dyn SectionModifier>,
    llm: &Arc<dyn LlmClient>,
    concurrency: usize,
    cancel: &CancellationToken,
    on_progress: Option<ProgressHook>,
) -> UnifiedSections {
    let mut unified = UnifiedSections::new();
    for (h1, sections) in &document.h1s {
        let mut inner = IndexMap::new();
        for (key, content) in sections {
            inner.insert(key.clone(), SectionRecord::unchanged(content.clone()));
        }
        unified.h1s.insert(h1.clone(), inner);
    }

    let mut grouped: IndexMap<(String, String), Vec<ModificationInstruction>> = IndexMap::new();
    for instruction in instructions {
        grouped
            .entry((instruction.h1.clone(), instruction.subtitle.clone()))
            .or_default()
            .push(instruction);
    }

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = tokio::task::JoinSet::new();
    let total = grouped.len();

    for ((h1, subtitle), chain) in grouped {
        let Some(original_content) = document.section(&h1, &subtitle).map(str::to_string) else {
            continue;
        };
        let semaphore = Arc::clone(&semaphore);
        let modifier = Arc::clone(modifier);
        let llm = Arc::clone(llm);
        let cancel = cancel.clone();
        set.spawn(async move {
            let _permit = semaphore.acquire().await.ok();
            let mut content = original_content.clone();
            let mut last_suggestion = String::new();
            let mut failure = None;
            for instruction in &chain {
                last_suggestion = instruction.suggestion.clone();
                match modifier.modify(&h1, &subtitle, &content, &instruction.suggestion, llm.as_ref(), &cancel).await {
                    Ok(rewritten) if rewritten.trim().is_empty() => {
                        failure = Some("modifier returned an empty section after post-processing".to_string());
                        break;
                    }
                    Ok(rewritten) => content = rewritten,
                    Err(err) => {
                        failure = Some(err.to_string());
                        break;
                    }
                }
            }
            (h1, subtitle, original_content, last_suggestion, content, failure)
        });
    }

    let mut outcomes = Vec::new();
    let mut completed = 0usize;
    while let Some(joined) = set.join_next().await {
        if let Ok(outcome) = joined {
            outcomes.push(outcome);
        }
        completed += 1;
        if let Some(hook) = &on_progress {
            hook(completed, total);
        }
    }

    for (h1, subtitle, original_content, suggestion, content, failure) in outcomes {
        let record = match failure {
            Some(error) => SectionRecord::failed(original_content, suggestion, error),
            None => SectionRecord::modified(original_content, suggestion, content, modifier.record_status()),
        };
        if let Some(inner) = unified.h1s.get_mut(&h1) {
            inner.insert(subtitle, record);
        }
    }

    unified
}

/// Parses a `[{"subtitle": "...", "suggestion": "..."}]` analyzer
/// response into [`ModificationInstruction`]s, resolving each element's
/// `h1` by locating which H1 bucket contains `subtitle` in `document`.
/// Elements naming a subtitle the document doesn't have, or with empty
/// fields, are dropped per spec §4.4's "malformed elements are dropped"
/// policy.
pub(crate) fn parse_instruction_array(document: &ParsedDocument, raw: &str) -> Vec<ModificationInstruction> {
    #[derive(serde::Deserialize)]
    struct RawInstruction {
        subtitle: String,
        suggestion: String,
    }

    let parsed: Vec<RawInstruction> = crate::llm::json::parse_structured_content(raw).unwrap_or_default();
    parsed
        .into_iter()
        .filter_map(|r| {
            let h1 = resolve_h1_for_subtitle(document, &r.subtitle)?;
            ModificationInstruction::new(h1, r.subtitle, r.suggestion)
        })
        .collect()
}

/// Finds the H1 bucket containing section key `subtitle`, trying an exact
/// match first and falling back to substring matching either direction
/// (the analyzer's response may echo a trimmed or loosely reworded
/// heading), mirroring `redundancy_modifier.py::find_section_in_parsed`.
pub(crate) fn resolve_h1_for_subtitle(document: &ParsedDocument, subtitle: &str) -> Option<String> {
    let clean_target = subtitle.trim().trim_start_matches('#').trim();
    for h1 in document.h1_titles() {
        for key in document.section_keys(h1) {
            if key == clean_target || key.contains(clean_target) || clean_target.contains(key) {
                return Some(h1.to_string());
            }
        }
    }
    None
}

/// Concatenates every section under `document` into a single blob, the
/// unit the redundancy/table/thesis analyzers read per spec §4.4 (one
/// analyzer call over the whole document, not per-H1).
pub(crate) fn whole_document_blob(document: &ParsedDocument) -> String {
    let mut blob = String::new();
    for h1 in document.h1_titles() {
        for key in document.section_keys(h1) {
            if let Some(content) = document.section(h1, key) {
                blob.push_str(content);
                blob.push('\n');
            }
        }
    }
    blob
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::RecordStatus;
    use crate::llm::FakeLlmClient;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct BlankModifier;

    #[async_trait]
    impl SectionModifier for BlankModifier {
        fn record_status(&self) -> RecordStatus {
            RecordStatus::Modified
        }

        async fn modify(&self, _h1: &str, _subtitle: &str, _original: &str, _suggestion: &str, llm: &dyn LlmClient, cancel: &CancellationToken) -> Result<String, LlmError> {
            // Mirrors `table::clean_response`/`thesis`'s heading-strip collapsing to "".
            let raw = llm.complete(crate::llm::CompletionRequest {
                messages: vec![crate::llm::ChatMessage::user("x".to_string())],
                temperature: 0.0,
                max_tokens: 10,
            }, cancel).await?;
            Ok(raw.trim().to_string())
        }
    }

    #[tokio::test]
    async fn empty_rewrite_after_post_processing_is_treated_as_failure() {
        let mut document = ParsedDocument::new();
        document.insert("H1".to_string(), "H2".to_string(), "## H2\noriginal".to_string());
        let instructions = vec![ModificationInstruction::new("H1".to_string(), "H2".to_string(), "suggestion".to_string()).unwrap()];
        let modifier: Arc<dyn SectionModifier> = Arc::new(BlankModifier);
        let llm: Arc<dyn LlmClient> = Arc::new(FakeLlmClient::new(vec!["   ".to_string()]));
        let cancel = CancellationToken::new();

        let unified = run_modification_pipeline(&document, instructions, &modifier, &llm, 2, &cancel, None).await;

        let record = unified.h1s.get("H1").unwrap().get("H2").unwrap();
        assert_eq!(record.status, RecordStatus::Failed);
        assert_eq!(record.regenerated_content, "## H2\noriginal");
    }

    #[tokio::test]
    async fn progress_hook_fires_once_per_completed_section() {
        let mut document = ParsedDocument::new();
        document.insert("H1".to_string(), "A".to_string(), "## A\nbody".to_string());
        document.insert("H1".to_string(), "B".to_string(), "## B\nbody".to_string());
        let instructions = vec![
            ModificationInstruction::new("H1".to_string(), "A".to_string(), "s".to_string()).unwrap(),
            ModificationInstruction::new("H1".to_string(), "B".to_string(), "s".to_string()).unwrap(),
        ];
        let modifier: Arc<dyn SectionModifier> = Arc::new(BlankModifier);
        let llm: Arc<dyn LlmClient> = Arc::new(FakeLlmClient::new(vec!["rewritten a".to_string(), "rewritten b".to_string()]));
        let cancel = CancellationToken::new();

        let calls = Arc::new(AtomicUsize::new(0));
        let seen_totals: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = Arc::clone(&calls);
        let seen_totals_clone = Arc::clone(&seen_totals);
        let hook: ProgressHook = Arc::new(move |_completed, total| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            seen_totals_clone.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(total);
        });

        let _unified = run_modification_pipeline(&document, instructions, &modifier, &llm, 2, &cancel, Some(hook)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(seen_totals.lock().unwrap_or_else(std::sync::PoisonError::into_inner).iter().all(|&t| t == 2));
    }
}
