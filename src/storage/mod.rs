//! Task-table persistence.
//!
//! The task table is the one piece of process state this crate persists
//! to `SQLite` across restarts (a supplement to the distilled spec's
//! silence on the question, decided in DESIGN.md); artifact *content*
//! (`UnifiedSections` JSON, rebuilt Markdown) is written to plain files
//! under `OUTPUT_DIR` instead, via [`crate::io`].

pub mod schema;
pub mod sqlite;
pub mod traits;

pub use schema::{CURRENT_SCHEMA_VERSION, SCHEMA_SQL};
pub use sqlite::SqliteStorage;
pub use traits::TaskStore;

/// Default database file name.
pub const DEFAULT_DB_NAME: &str = "review-pipeline-tasks.db";

/// Default database path relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".review-pipeline/tasks.db";
