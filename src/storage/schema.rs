//! Database schema for the task table.
//!
//! One table: `tasks`. The full [`crate::core::task::Task`] is stored as a
//! JSON blob (`data`); `status` and `completed_at` are broken out as plain
//! columns so the cleanup sweep (spec §3: "completed tasks older than 24h")
//! and status-filtered listing don't need to deserialize every row.

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// SQL schema for initial database setup.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_info (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    task_id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    completed_at INTEGER,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
CREATE INDEX IF NOT EXISTS idx_tasks_completed_at ON tasks(completed_at);
";

/// SQL to check if schema is initialized.
pub const CHECK_SCHEMA_SQL: &str = r"
SELECT COUNT(*) FROM sqlite_master
WHERE type='table' AND name='schema_info';
";

/// SQL to get schema version.
pub const GET_VERSION_SQL: &str = r"
SELECT value FROM schema_info WHERE key = 'version';
";

/// SQL to set schema version.
pub const SET_VERSION_SQL: &str = r"
INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_sql_creates_tasks_table() {
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS tasks"));
    }

    #[test]
    fn schema_version_is_at_least_one() {
        const _: () = assert!(CURRENT_SCHEMA_VERSION >= 1);
    }
}
