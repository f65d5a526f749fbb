//! `SQLite`-backed [`TaskStore`].
//!
//! Kept from the teacher's `SqliteStorage`: same open/in-memory/WAL-mode
//! shape and the same migration-runner pattern, narrowed to the `tasks`
//! table. Task *content* is one JSON blob per row; `status` and
//! `completed_at` are duplicated into plain columns purely so the cleanup
//! sweep and any future status-filtered listing don't pay a
//! deserialize-every-row cost.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::core::task::{Task, TaskStatus};
use crate::error::{Result, StorageError};
use crate::io::to_json_two_space;
use crate::storage::schema::{CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION, GET_VERSION_SQL, SCHEMA_SQL, SET_VERSION_SQL};
use crate::storage::traits::TaskStore;

/// `SQLite`-based task-table storage.
pub struct SqliteStorage {
    conn: Connection,
    path: Option<PathBuf>,
}

fn status_label(status: &TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Processing { .. } => "processing",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
    }
}

impl SqliteStorage {
    /// Opens or creates a `SQLite` database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
            }
        }
        let conn = Connection::open(&path).map_err(StorageError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", []).map_err(StorageError::from)?;
        let _: String = conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
            .map_err(StorageError::from)?;
        Ok(Self { conn, path: Some(path) })
    }

    /// Creates an in-memory database, for tests and the CLI's `--offline`
    /// harness.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", []).map_err(StorageError::from)?;
        Ok(Self { conn, path: None })
    }

    /// The database file path, `None` for an in-memory store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn get_schema_version(&self) -> Result<Option<u32>> {
        let version: Option<String> = self
            .conn
            .query_row(GET_VERSION_SQL, [], |row| row.get(0))
            .optional()
            .map_err(StorageError::from)?;
        Ok(version.and_then(|v| v.parse().ok()))
    }

    fn set_schema_version(&self, version: u32) -> Result<()> {
        self.conn
            .execute(SET_VERSION_SQL, params![version.to_string()])
            .map_err(StorageError::from)?;
        Ok(())
    }
}

impl TaskStore for SqliteStorage {
    fn init(&mut self) -> Result<()> {
        let is_init: i64 = self.conn.query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0)).map_err(StorageError::from)?;
        if is_init == 0 {
            self.conn.execute_batch(SCHEMA_SQL).map_err(StorageError::from)?;
            self.set_schema_version(CURRENT_SCHEMA_VERSION)?;
        } else if self.get_schema_version()?.unwrap_or(0) < CURRENT_SCHEMA_VERSION {
            self.conn.execute_batch(SCHEMA_SQL).map_err(StorageError::from)?;
            self.set_schema_version(CURRENT_SCHEMA_VERSION)?;
        }
        Ok(())
    }

    fn insert(&mut self, task: &Task) -> Result<()> {
        let data = to_json_two_space(task).map_err(StorageError::from)?;
        self.conn
            .execute(
                "INSERT INTO tasks (task_id, status, created_at, completed_at, data) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    task.task_id,
                    status_label(&task.status),
                    task.created_at.timestamp(),
                    task.completed_at.map(|t| t.timestamp()),
                    data,
                ],
            )
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn update(&mut self, task: &Task) -> Result<()> {
        let data = to_json_two_space(task).map_err(StorageError::from)?;
        let changed = self
            .conn
            .execute(
                "UPDATE tasks SET status = ?2, completed_at = ?3, data = ?4 WHERE task_id = ?1",
                params![task.task_id, status_label(&task.status), task.completed_at.map(|t| t.timestamp()), data],
            )
            .map_err(StorageError::from)?;
        if changed == 0 {
            return self.insert(task);
        }
        Ok(())
    }

    fn get(&self, task_id: &str) -> Result<Option<Task>> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM tasks WHERE task_id = ?1", params![task_id], |row| row.get(0))
            .optional()
            .map_err(StorageError::from)?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json).map_err(StorageError::from)?)),
            None => Ok(None),
        }
    }

    fn delete(&mut self, task_id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM tasks WHERE task_id = ?1", params![task_id])
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn sweep_completed_before(&mut self, threshold: DateTime<Utc>) -> Result<usize> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM tasks WHERE completed_at IS NOT NULL AND completed_at < ?1",
                params![threshold.timestamp()],
            )
            .map_err(StorageError::from)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::{AgentKind, DeliveryMode};
    use chrono::Duration;

    fn sample_task(id: &str) -> Task {
        Task::new(id.to_string(), AgentKind::Redundancy, DeliveryMode::Async)
    }

    #[test]
    fn insert_and_get_round_trips() {
        let mut store = SqliteStorage::in_memory().unwrap();
        store.init().unwrap();
        let task = sample_task("t1");
        store.insert(&task).unwrap();
        let fetched = store.get("t1").unwrap().unwrap();
        assert_eq!(fetched.task_id, "t1");
        assert_eq!(fetched.status, TaskStatus::Pending);
    }

    #[test]
    fn get_missing_task_returns_none() {
        let mut store = SqliteStorage::in_memory().unwrap();
        store.init().unwrap();
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn update_overwrites_status() {
        let mut store = SqliteStorage::in_memory().unwrap();
        store.init().unwrap();
        let mut task = sample_task("t1");
        store.insert(&task).unwrap();
        task.status = TaskStatus::Completed;
        task.completed_at = Some(Utc::now());
        store.update(&task).unwrap();
        let fetched = store.get("t1").unwrap().unwrap();
        assert_eq!(fetched.status, TaskStatus::Completed);
    }

    #[test]
    fn update_of_unknown_task_inserts_it() {
        let mut store = SqliteStorage::in_memory().unwrap();
        store.init().unwrap();
        let task = sample_task("t1");
        store.update(&task).unwrap();
        assert!(store.get("t1").unwrap().is_some());
    }

    #[test]
    fn delete_removes_task() {
        let mut store = SqliteStorage::in_memory().unwrap();
        store.init().unwrap();
        let task = sample_task("t1");
        store.insert(&task).unwrap();
        store.delete("t1").unwrap();
        assert!(store.get("t1").unwrap().is_none());
    }

    #[test]
    fn sweep_removes_only_old_completed_tasks() {
        let mut store = SqliteStorage::in_memory().unwrap();
        store.init().unwrap();

        let mut old = sample_task("old");
        old.status = TaskStatus::Completed;
        old.completed_at = Some(Utc::now() - Duration::hours(48));
        store.insert(&old).unwrap();

        let mut recent = sample_task("recent");
        recent.status = TaskStatus::Completed;
        recent.completed_at = Some(Utc::now());
        store.insert(&recent).unwrap();

        let pending = sample_task("pending");
        store.insert(&pending).unwrap();

        let removed = store.sweep_completed_before(Utc::now() - Duration::hours(24)).unwrap();
        assert_eq!(removed, 1);
        assert!(store.get("old").unwrap().is_none());
        assert!(store.get("recent").unwrap().is_some());
        assert!(store.get("pending").unwrap().is_some());
    }

    #[test]
    fn init_is_idempotent() {
        let mut store = SqliteStorage::in_memory().unwrap();
        store.init().unwrap();
        store.init().unwrap();
        assert_eq!(store.get_schema_version().unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }
}
