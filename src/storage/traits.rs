//! Task-store trait: the orchestrator's persistence boundary.
//!
//! Grounded on the teacher's `Storage` trait shape (an `init`/`is_initialized`
//! pair plus typed CRUD methods behind one trait so the orchestrator can be
//! tested against an in-memory store), narrowed to the one table this crate
//! actually needs: tasks.

use chrono::{DateTime, Utc};

use crate::core::task::Task;
use crate::error::Result;

/// Persistence for the task table (spec §3: "Tasks live until an explicit
/// deletion or a time-based sweep").
///
/// Implementations must be safe to share across concurrently running tasks;
/// the orchestrator is the sole caller and serializes logical state
/// transitions per task before calling through, but concurrent tasks do
/// call through concurrently for *different* `task_id`s.
pub trait TaskStore: Send + Sync {
    /// Initializes storage (creates schema, runs migrations). Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation or migration fails.
    fn init(&mut self) -> Result<()>;

    /// Inserts a newly created task.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn insert(&mut self, task: &Task) -> Result<()>;

    /// Overwrites the stored snapshot of an existing task.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn update(&mut self, task: &Task) -> Result<()>;

    /// Fetches a task snapshot by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get(&self, task_id: &str) -> Result<Option<Task>>;

    /// Deletes one task explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete(&mut self, task_id: &str) -> Result<()>;

    /// Deletes every `completed`/`failed` task whose `completed_at` is
    /// strictly older than `threshold`, returning the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the sweep query fails.
    fn sweep_completed_before(&mut self, threshold: DateTime<Utc>) -> Result<usize>;
}
