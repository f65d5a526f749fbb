//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros. The CLI is the one
//! concrete request transport this crate ships (spec §1 places HTTP
//! routing out of scope as an external collaborator); each subcommand maps
//! onto one of the conceptual operations in spec §6's table.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::task::AgentKind;

/// review-pipeline: a document-review runtime with four LLM-backed agents.
///
/// Parses a Markdown document into sections, runs one review agent's
/// analyze -> modify pipeline over it, and returns per-section edit
/// proposals plus an optional rebuilt document, via synchronous,
/// asynchronous, or streaming delivery.
#[derive(Parser, Debug)]
#[command(name = "review-pipeline")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the task-table database file.
    ///
    /// Defaults to `.review-pipeline/tasks.db` in the current directory.
    #[arg(long, env = "REVIEW_PIPELINE_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Which review agent a command targets.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum AgentArg {
    /// Finds and rewrites repeated prose.
    Redundancy,
    /// Converts structured prose into Markdown tables.
    Table,
    /// Extracts the document's thesis and corrects drift from it.
    Thesis,
    /// Finds unsupported claims and folds in web-search evidence.
    Evidence,
}

impl From<AgentArg> for AgentKind {
    fn from(value: AgentArg) -> Self {
        match value {
            AgentArg::Redundancy => Self::Redundancy,
            AgentArg::Table => Self::Table,
            AgentArg::Thesis => Self::Thesis,
            AgentArg::Evidence => Self::Evidence,
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an agent synchronously and print its result once the task
    /// reaches a terminal state.
    Submit {
        /// Path to the Markdown document to review.
        file: PathBuf,

        /// Which review agent to run.
        #[arg(short, long, value_enum)]
        agent: AgentArg,

        /// Optional document title, carried through for diagnostics only.
        #[arg(long)]
        title: Option<String>,
    },

    /// Submit an agent run asynchronously and print the `task_id`
    /// immediately.
    SubmitAsync {
        /// Path to the Markdown document to review.
        file: PathBuf,

        /// Which review agent to run.
        #[arg(short, long, value_enum)]
        agent: AgentArg,

        /// Optional document title, carried through for diagnostics only.
        #[arg(long)]
        title: Option<String>,
    },

    /// Submit an agent run and stream `progress`/`result`/`end` events as
    /// they occur (spec §6's event stream format).
    Stream {
        /// Path to the Markdown document to review.
        file: PathBuf,

        /// Which review agent to run.
        #[arg(short, long, value_enum)]
        agent: AgentArg,

        /// Optional document title, carried through for diagnostics only.
        #[arg(long)]
        title: Option<String>,
    },

    /// Fetch a task's current status snapshot.
    Status {
        /// The task id returned by `submit-async` or `stream`.
        task_id: String,
    },

    /// Fetch a completed task's `UnifiedSections` artifact.
    GetUnified {
        /// The task id.
        task_id: String,
    },

    /// Fetch a completed task's flattened `chapters[]` view.
    GetFlat {
        /// The task id.
        task_id: String,
    },

    /// Fetch a completed task's rebuilt Markdown document, if it produced
    /// one.
    GetRebuilt {
        /// The task id.
        task_id: String,
    },

    /// Cancel a running task cooperatively.
    Cancel {
        /// The task id.
        task_id: String,
    },

    /// Sweep completed/failed tasks older than the configured threshold.
    Cleanup {
        /// Sweep tasks whose terminal timestamp is older than this many
        /// hours (defaults to `CLEANUP_AFTER_HOURS`, spec §3).
        #[arg(long)]
        after_hours: Option<u64>,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_db_path() {
        let cli = Cli {
            db_path: None,
            verbose: false,
            format: "text".to_string(),
            command: Commands::Status { task_id: "t1".to_string() },
        };
        assert_eq!(cli.get_db_path(), PathBuf::from(crate::storage::DEFAULT_DB_PATH));
    }

    #[test]
    fn test_custom_db_path() {
        let cli = Cli {
            db_path: Some(PathBuf::from("/custom/path.db")),
            verbose: false,
            format: "text".to_string(),
            command: Commands::Status { task_id: "t1".to_string() },
        };
        assert_eq!(cli.get_db_path(), PathBuf::from("/custom/path.db"));
    }

    #[test]
    fn test_submit_requires_agent() {
        let result = Cli::try_parse_from(["review-pipeline", "submit", "doc.md"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_submit_parses_with_agent() {
        let cli = Cli::try_parse_from(["review-pipeline", "submit", "doc.md", "--agent", "table"]).unwrap();
        match cli.command {
            Commands::Submit { file, agent, .. } => {
                assert_eq!(file, PathBuf::from("doc.md"));
                assert_eq!(agent, AgentArg::Table);
            }
            _ => panic!("expected Submit"),
        }
    }
}
