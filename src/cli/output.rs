//! Output formatting for CLI commands.
//!
//! Supports text and JSON/NDJSON output formats.

use std::fmt::Write;

use serde::Serialize;

use crate::core::record::{FlatChapters, UnifiedSections};
use crate::core::task::Task;
use crate::orchestrator::RebuiltDocument;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
    /// Newline-delimited JSON (NDJSON) for streaming.
    /// Each record is a single JSON object on its own line.
    Ndjson,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" | "stream" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Returns true if this format is a streaming format.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        matches!(self, Self::Ndjson)
    }
}

/// Formats a task snapshot.
#[must_use]
pub fn format_task(task: &Task, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_task_text(task),
        OutputFormat::Json | OutputFormat::Ndjson => format_json(task),
    }
}

fn format_task_text(task: &Task) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Task {}", task.task_id);
    let _ = writeln!(output, "  Agent:     {:?}", task.agent);
    let _ = writeln!(output, "  Mode:      {:?}", task.mode);
    let _ = writeln!(output, "  Status:    {:?}", task.status);
    let _ = writeln!(output, "  Progress:  {}%", task.progress);
    let _ = writeln!(output, "  Message:   {}", task.message);
    let _ = writeln!(output, "  Created:   {}", task.created_at);
    if let Some(started) = task.started_at {
        let _ = writeln!(output, "  Started:   {started}");
    }
    if let Some(completed) = task.completed_at {
        let _ = writeln!(output, "  Completed: {completed}");
    }
    if let Some(result) = &task.result {
        let _ = writeln!(output, "  Unified artifact: {}", result.unified_path);
        if let Some(rebuilt) = &result.rebuilt_path {
            let _ = writeln!(output, "  Rebuilt artifact:  {rebuilt}");
        }
    }
    if let Some(error) = &task.error {
        let _ = writeln!(output, "  Error:     {error}");
    }
    output
}

/// Formats the `UnifiedSections` artifact.
#[must_use]
pub fn format_unified(unified: &UnifiedSections, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_unified_text(unified),
        OutputFormat::Json | OutputFormat::Ndjson => {
            crate::io::to_json_two_space(unified).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

fn format_unified_text(unified: &UnifiedSections) -> String {
    if unified.h1s.is_empty() {
        return "No sections found.\n".to_string();
    }
    let mut output = String::new();
    for (h1, sections) in &unified.h1s {
        let _ = writeln!(output, "# {h1}");
        for (key, record) in sections {
            let _ = writeln!(output, "  [{:?}] {key} ({} words)", record.status, record.word_count);
            if !record.suggestion.is_empty() {
                let _ = writeln!(output, "    suggestion: {}", truncate(&record.suggestion, 80));
            }
        }
    }
    output
}

/// Formats the flattened `chapters[]` view.
#[must_use]
pub fn format_flat(chapters: &FlatChapters, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_flat_text(chapters),
        OutputFormat::Json | OutputFormat::Ndjson => format_json(chapters),
    }
}

fn format_flat_text(chapters: &FlatChapters) -> String {
    if chapters.is_empty() {
        return "No modifications.\n".to_string();
    }
    let mut output = String::new();
    let _ = writeln!(output, "{} modified section(s):", chapters.len());
    for (i, chapter) in chapters.iter().enumerate() {
        let _ = writeln!(output, "\n--- [{}] ---", i + 1);
        let _ = writeln!(output, "original: {}", truncate(&chapter.original_text, 100));
        let _ = writeln!(output, "edit:     {}", truncate(&chapter.edit_text, 100));
        if !chapter.comment.is_empty() {
            let _ = writeln!(output, "comment:  {}", chapter.comment);
        }
    }
    output
}

/// Formats the rebuilt-document artifact.
#[must_use]
pub fn format_rebuilt(rebuilt: Option<&RebuiltDocument>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => rebuilt.map_or_else(|| "No rebuilt document for this task.\n".to_string(), |r| r.content.clone()),
        OutputFormat::Json | OutputFormat::Ndjson => format_json(&rebuilt),
    }
}

/// Formats a cleanup-sweep result.
#[must_use]
pub fn format_cleanup_result(removed: usize, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("Swept {removed} task(s).\n"),
        OutputFormat::Json | OutputFormat::Ndjson => format_json(&serde_json::json!({ "removed": removed })),
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Formats an error for output.
///
/// When format is JSON, returns a structured error object.
/// When format is Text, returns the error message string.
#[must_use]
pub fn format_error(error: &crate::Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json | OutputFormat::Ndjson => {
            let (error_type, suggestion) = get_error_details(error);
            let json = serde_json::json!({
                "success": false,
                "error": {
                    "type": error_type,
                    "message": error.to_string(),
                    "suggestion": suggestion
                }
            });
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

/// Extracts error type and recovery suggestion from an error.
const fn get_error_details(error: &crate::Error) -> (&'static str, Option<&'static str>) {
    use crate::error::{EvidenceSearchError, InputError, LlmError, StorageError, TaskError};

    match error {
        crate::Error::Input(e) => match e {
            InputError::EmptyDocument => ("EmptyDocument", Some("Provide a non-empty Markdown document")),
            InputError::DocumentTooLarge { .. } => ("DocumentTooLarge", Some("Reduce the document size or use async/stream delivery")),
            InputError::InvalidUtf8 { .. } => ("InvalidUtf8", Some("Re-save the document as valid UTF-8")),
        },
        crate::Error::Llm(e) => match e {
            LlmError::CallFailed { .. } => ("LlmCallFailed", None),
            LlmError::Authentication { .. } => ("LlmAuthenticationFailed", Some("Check the configured LLM credentials")),
            LlmError::MalformedRequest { .. } => ("LlmMalformedRequest", None),
            LlmError::Cancelled => ("LlmCancelled", None),
            LlmError::Timeout { .. } => ("LlmTimeout", Some("Increase LLM_TIMEOUT_SEC or retry")),
        },
        crate::Error::EvidenceSearch(e) => match e {
            EvidenceSearchError::Transport { .. } => ("SearchTransportError", None),
            EvidenceSearchError::Provider { .. } => ("SearchProviderError", None),
            EvidenceSearchError::Cancelled => ("SearchCancelled", None),
            EvidenceSearchError::Timeout { .. } => ("SearchTimeout", Some("Increase SEARCH_TIMEOUT_SEC or retry")),
        },
        crate::Error::Task(e) => match e {
            TaskError::Cancelled => ("TaskCancelled", None),
            TaskError::TimedOut { .. } => ("TaskTimedOut", Some("Increase TASK_TIMEOUT_SEC or retry")),
            TaskError::ArtifactWriteFailed { .. } => ("ArtifactWriteFailed", Some("Check OUTPUT_DIR permissions and disk space")),
            TaskError::ParserInvariantViolated { .. } => ("ParserInvariantViolated", None),
            TaskError::NotFound { .. } => ("TaskNotFound", Some("Run 'review-pipeline status <task_id>' with a valid task id")),
            TaskError::QueueFull => ("QueueFull", Some("Retry later or use async/stream delivery")),
        },
        crate::Error::Storage(e) => match e {
            StorageError::Database(_) => ("DatabaseError", None),
            StorageError::Migration(_) => ("MigrationError", None),
            StorageError::Serialization(_) => ("SerializationError", None),
            StorageError::Io(_) => ("IoError", Some("Verify the file path exists and is readable")),
        },
        crate::Error::Config(_) => ("ConfigError", Some("Check the recognized environment variables in the README")),
    }
}

/// Truncates a string to max length with ellipsis, on a `char` boundary.
fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.replace('\n', " ")
    } else if max_chars <= 3 {
        s.chars().take(max_chars).collect()
    } else {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", head.replace('\n', " "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::{FlatChapter, RecordStatus, SectionRecord};
    use crate::core::task::{AgentKind, DeliveryMode};
    use indexmap::IndexMap;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("unknown"), OutputFormat::Text);
    }

    #[test]
    fn test_output_format_ndjson() {
        assert_eq!(OutputFormat::parse("ndjson"), OutputFormat::Ndjson);
        assert_eq!(OutputFormat::parse("jsonl"), OutputFormat::Ndjson);
        assert_eq!(OutputFormat::parse("stream"), OutputFormat::Ndjson);
        assert!(OutputFormat::Ndjson.is_streaming());
        assert!(!OutputFormat::Json.is_streaming());
    }

    #[test]
    fn test_format_task_text() {
        let task = Task::new("t1".to_string(), AgentKind::Redundancy, DeliveryMode::Sync);
        let text = format_task(&task, OutputFormat::Text);
        assert!(text.contains("Task t1"));
        assert!(text.contains("Progress:  0%"));
    }

    #[test]
    fn test_format_unified_empty() {
        let unified = UnifiedSections::new();
        let text = format_unified(&unified, OutputFormat::Text);
        assert!(text.contains("No sections found"));
        let json = format_unified(&unified, OutputFormat::Json);
        assert_eq!(json.trim(), "{}");
    }

    #[test]
    fn test_format_unified_with_sections() {
        let mut unified = UnifiedSections::new();
        let mut inner = IndexMap::new();
        inner.insert("H2".to_string(), SectionRecord::unchanged("body".to_string()));
        unified.h1s.insert("H1".to_string(), inner);
        let text = format_unified(&unified, OutputFormat::Text);
        assert!(text.contains("# H1"));
        assert!(text.contains("H2"));
    }

    #[test]
    fn test_format_flat_empty() {
        let chapters: FlatChapters = vec![];
        let text = format_flat(&chapters, OutputFormat::Text);
        assert!(text.contains("No modifications"));
        let json = format_flat(&chapters, OutputFormat::Json);
        assert!(json.contains("[]"));
    }

    #[test]
    fn test_format_flat_with_data() {
        let chapters = vec![FlatChapter {
            original_text: "a".repeat(150),
            edit_text: "b".to_string(),
            comment: "note".to_string(),
        }];
        let text = format_flat(&chapters, OutputFormat::Text);
        assert!(text.contains("1 modified section"));
        assert!(text.contains("comment:  note"));
    }

    #[test]
    fn test_format_rebuilt_none() {
        let text = format_rebuilt(None, OutputFormat::Text);
        assert!(text.contains("No rebuilt document"));
    }

    #[test]
    fn test_format_rebuilt_some() {
        let rebuilt = RebuiltDocument {
            content: "# H1\nbody\n".to_string(),
            file_path: "out/t1-1.md".to_string(),
        };
        let text = format_rebuilt(Some(&rebuilt), OutputFormat::Text);
        assert_eq!(text, "# H1\nbody\n");
        let json = format_rebuilt(Some(&rebuilt), OutputFormat::Json);
        assert!(json.contains("file_path"));
    }

    #[test]
    fn test_format_cleanup_result() {
        let text = format_cleanup_result(3, OutputFormat::Text);
        assert!(text.contains("Swept 3 task"));
        let json = format_cleanup_result(3, OutputFormat::Json);
        assert!(json.contains("\"removed\": 3"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello", 10), "Hello");
        assert_eq!(truncate("Hello World", 8), "Hello...");
        assert_eq!(truncate("Hi", 2), "Hi");
    }

    #[test]
    fn record_status_variant_used_in_test_fixture() {
        // keep RecordStatus import exercised for enum coverage in this module
        let status = RecordStatus::Modified;
        assert_eq!(format!("{status:?}"), "Modified");
    }
}
