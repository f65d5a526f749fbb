//! Error types for the review pipeline.
//!
//! Mirrors the taxonomy in the design: whole-task failures are `Error`
//! values the orchestrator surfaces; per-section and per-claim failures are
//! *not* represented here at all — they are absorbed into
//! [`crate::core::record::SectionRecord`] / evidence result status fields
//! instead.

use thiserror::Error;

/// Result type alias for review-pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the review pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Request validation failed before a task was created.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// An LLM call failed after retries, at a point where the whole task
    /// cannot continue (e.g. during thesis extraction, which the
    /// orchestrator cannot recover from per-section).
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    /// The evidence search stage failed in a way that aborts the task
    /// rather than a single claim.
    #[error("evidence search error: {0}")]
    EvidenceSearch(#[from] EvidenceSearchError),

    /// Task-fatal orchestration errors (cancellation, timeout, artifact
    /// write failure, parser invariant violation).
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// Persistence errors (task table, artifact files).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors surfaced at submission time, before any task exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// `document_content` was empty or whitespace-only.
    #[error("文档内容不能为空")]
    EmptyDocument,

    /// `document_content` exceeded the configured size cap for the chosen
    /// delivery mode.
    #[error("document content exceeds the {limit}-byte cap for this mode")]
    DocumentTooLarge {
        /// The cap that was exceeded, in bytes.
        limit: usize,
    },

    /// `document_content` was not valid UTF-8.
    #[error("document content is not valid UTF-8 (first invalid byte at offset {offset})")]
    InvalidUtf8 {
        /// Byte offset of the first invalid UTF-8 sequence.
        offset: usize,
    },
}

/// Errors raised by [`crate::llm::LlmClient::complete`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The call failed after exhausting retries.
    #[error("llm call failed after {attempts} attempt(s): {message}")]
    CallFailed {
        /// Number of attempts made.
        attempts: u32,
        /// Last underlying error message (redacted of anything
        /// resembling a credential).
        message: String,
    },

    /// Authentication failed; not retried.
    #[error("llm authentication failed: {message}")]
    Authentication {
        /// Redacted error message.
        message: String,
    },

    /// The request was malformed; not retried.
    #[error("llm request rejected: {message}")]
    MalformedRequest {
        /// Redacted error message.
        message: String,
    },

    /// The call was cancelled cooperatively before completion.
    #[error("llm call cancelled")]
    Cancelled,

    /// The call exceeded its configured timeout.
    #[error("llm call timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout, in seconds.
        timeout_secs: u64,
    },
}

/// Errors raised by [`crate::search::SearchClient::search`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvidenceSearchError {
    /// Transport-level failure (connection, DNS, TLS).
    #[error("search transport error: {message}")]
    Transport {
        /// Redacted error message.
        message: String,
    },

    /// The provider rejected the request (quota, auth).
    #[error("search provider error: {message}")]
    Provider {
        /// Redacted error message.
        message: String,
    },

    /// The call was cancelled cooperatively before completion.
    #[error("search call cancelled")]
    Cancelled,

    /// The call exceeded its configured timeout.
    #[error("search call timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout, in seconds.
        timeout_secs: u64,
    },
}

/// Task-fatal errors: the task transitions to `failed` and the error is
/// surfaced to the caller (sync return, async `GetStatus`, or a stream
/// `error` event).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task was cancelled before reaching a terminal state.
    #[error("task cancelled")]
    Cancelled,

    /// The task exceeded its wall-clock timeout.
    #[error("task timed out after {timeout_secs}s")]
    TimedOut {
        /// Configured per-task timeout, in seconds.
        timeout_secs: u64,
    },

    /// Writing the UnifiedSections/Markdown artifact failed.
    #[error("failed to write artifact: {message}")]
    ArtifactWriteFailed {
        /// Underlying I/O error message.
        message: String,
    },

    /// The section parser's invariants were violated (should be
    /// unreachable for well-formed UTF-8 input; guards against a future
    /// parser regression rather than an expected runtime condition).
    #[error("parser invariant violated: {message}")]
    ParserInvariantViolated {
        /// Description of the violated invariant.
        message: String,
    },

    /// The requested task id does not exist.
    #[error("task not found: {task_id}")]
    NotFound {
        /// The task id that was not found.
        task_id: String,
    },

    /// The sync submission path rejected the request because the worker
    /// pool's queue depth exceeded the configured threshold.
    #[error("task queue is full")]
    QueueFull,
}

/// Errors raised by the task-table / artifact storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Underlying filesystem I/O error for artifact writes/reads.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value of the wrong type.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// The environment variable name.
        key: String,
        /// The offending raw value.
        value: String,
    },
}
