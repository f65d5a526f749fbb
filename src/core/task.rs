//! Task lifecycle model owned by the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::record::{FlatChapters, UnifiedSections};

/// Which review agent a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Finds and rewrites repeated prose.
    Redundancy,
    /// Converts structured prose into Markdown tables.
    Table,
    /// Extracts the document's thesis and corrects drift from it.
    Thesis,
    /// Finds unsupported claims and folds in web-search evidence.
    Evidence,
}

/// Which delivery mode a caller chose for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// The caller blocks until the task reaches a terminal state.
    Sync,
    /// The caller polls `GetStatus`/fetches artifacts separately.
    Async,
    /// The caller consumes a server-sent-event-shaped stream.
    Stream,
}

/// A task's state-machine status, per spec §3: `pending -> processing ->
/// {completed, failed}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TaskStatus {
    /// Submitted but not yet picked up by a worker.
    Pending,
    /// A worker is actively running analyze/modify stages.
    Processing {
        /// Monotonically non-decreasing progress, `0..=100`.
        progress: u8,
    },
    /// The task finished successfully.
    Completed,
    /// The task failed; see `Task::error`.
    Failed,
}

/// The unit of work the orchestrator tracks end-to-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task id.
    pub task_id: String,
    /// Which agent this task runs.
    pub agent: AgentKind,
    /// Which delivery mode this task was submitted under.
    pub mode: DeliveryMode,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Progress percentage, `0..=100` (redundant with `status` for
    /// `Processing`, but retained at the top level so `completed`/`failed`
    /// snapshots still report the last-known value).
    pub progress: u8,
    /// Human-readable status message (includes parse-degraded and
    /// claim-cap-overflow notes, per spec §7).
    pub message: String,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// When a worker began processing, if it has.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal state, if it has.
    pub completed_at: Option<DateTime<Utc>>,
    /// Paths to persisted artifacts, set once `status == Completed`.
    pub result: Option<TaskResult>,
    /// Machine-stable error kind plus human message, set once
    /// `status == Failed`.
    pub error: Option<String>,
}

/// Artifact locations recorded once a task completes, per spec §4.9.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Path to the persisted UnifiedSections JSON artifact.
    pub unified_path: String,
    /// Path to the persisted rebuilt Markdown artifact, if the agent
    /// produces one.
    pub rebuilt_path: Option<String>,
}

impl Task {
    /// Creates a new `pending` task at submission time.
    #[must_use]
    pub fn new(task_id: String, agent: AgentKind, mode: DeliveryMode) -> Self {
        Self {
            task_id,
            agent,
            mode,
            status: TaskStatus::Pending,
            progress: 0,
            message: "task created".to_string(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// Whether the task has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// In-flight, per-task artifacts the orchestrator builds before persisting.
/// Not serialized; discarded once the task completes and `Task::result`
/// takes over as the shareable, read-only view.
#[derive(Debug, Clone, Default)]
pub struct TaskArtifacts {
    /// The unified-sections result, once built.
    pub unified: Option<UnifiedSections>,
    /// The flattened chapters view, once built.
    pub flat: Option<FlatChapters>,
    /// The rebuilt document, once built (not every agent rebuilds).
    pub rebuilt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_starts_pending_with_zero_progress() {
        let task = Task::new("t1".to_string(), AgentKind::Redundancy, DeliveryMode::Async);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.progress, 0);
        assert!(!task.is_terminal());
    }
}
