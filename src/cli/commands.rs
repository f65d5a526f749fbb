//! CLI command implementations.
//!
//! Each command builds an [`Orchestrator`] wired to the real HTTP-backed
//! LLM/search clients and a `SQLite`-backed task store, then drives one of
//! its sync/async/stream/status/artifact-fetch operations. The orchestrator
//! itself is async (spec §5); this harness opens a single-threaded
//! `tokio` runtime per invocation and blocks on it, since the CLI is a
//! one-shot process rather than a long-lived server.

#![allow(clippy::too_many_lines)]

use std::io::Write as IoWrite;
use std::sync::Arc;

use tokio_stream::StreamExt;

use crate::cli::output::{OutputFormat, format_cleanup_result, format_flat, format_rebuilt, format_task, format_unified};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::task::{AgentKind, DeliveryMode};
use crate::error::{ConfigError, Error, Result};
use crate::io::read_document_file;
use crate::llm::{HttpLlmClient, LlmClient};
use crate::orchestrator::{Orchestrator, StreamEvent, SubmitRequest};
use crate::search::{HttpSearchClient, SearchClient};
use crate::storage::{SqliteStorage, TaskStore};

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Storage(crate::error::StorageError::Io(e.to_string())))?;

    runtime.block_on(async move {
        let config = Config::from_env()?;
        let orchestrator = build_orchestrator(config, &db_path)?;

        match &cli.command {
            Commands::Submit { file, agent, title } => cmd_submit(&orchestrator, file, (*agent).into(), title.clone(), format).await,
            Commands::SubmitAsync { file, agent, title } => {
                cmd_submit_async(&orchestrator, file, (*agent).into(), title.clone(), format).await
            }
            Commands::Stream { file, agent, title } => cmd_stream(&orchestrator, file, (*agent).into(), title.clone()).await,
            Commands::Status { task_id } => cmd_status(&orchestrator, task_id, format),
            Commands::GetUnified { task_id } => cmd_get_unified(&orchestrator, task_id, format),
            Commands::GetFlat { task_id } => cmd_get_flat(&orchestrator, task_id, format),
            Commands::GetRebuilt { task_id } => cmd_get_rebuilt(&orchestrator, task_id, format),
            Commands::Cancel { task_id } => cmd_cancel(&orchestrator, task_id, format),
            Commands::Cleanup { after_hours } => cmd_cleanup(&orchestrator, *after_hours, format),
        }
    })
}

fn build_orchestrator(config: Config, db_path: &std::path::Path) -> Result<Arc<Orchestrator>> {
    let llm: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::new(
        env_or("LLM_BASE_URL", "https://api.openai.com/v1/chat/completions"),
        env_required("LLM_API_KEY")?,
        config.llm_model.clone(),
        config.llm_timeout,
    ));
    let search: Arc<dyn SearchClient> = Arc::new(HttpSearchClient::new(
        env_or("SEARCH_API_URL", "http://localhost:8080/search"),
        config.search_timeout,
    ));
    let store: Box<dyn TaskStore> = Box::new(SqliteStorage::open(db_path)?);
    Orchestrator::new(config, llm, search, store)
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_required(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        Error::Config(ConfigError::InvalidValue {
            key: key.to_string(),
            value: "(unset)".to_string(),
        })
    })
}

async fn cmd_submit(
    orchestrator: &Arc<Orchestrator>,
    file: &std::path::Path,
    agent: AgentKind,
    title: Option<String>,
    format: OutputFormat,
) -> Result<String> {
    let document_content = read_document_file(file)?;
    let request = SubmitRequest { document_content, document_title: title, agent };
    let task = orchestrator.submit(request, DeliveryMode::Sync).await?;
    Ok(format_task(&task, format))
}

async fn cmd_submit_async(
    orchestrator: &Arc<Orchestrator>,
    file: &std::path::Path,
    agent: AgentKind,
    title: Option<String>,
    format: OutputFormat,
) -> Result<String> {
    let document_content = read_document_file(file)?;
    let request = SubmitRequest { document_content, document_title: title, agent };
    let task = orchestrator.submit(request, DeliveryMode::Async).await?;
    Ok(format_task(&task, format))
}

async fn cmd_stream(orchestrator: &Arc<Orchestrator>, file: &std::path::Path, agent: AgentKind, title: Option<String>) -> Result<String> {
    let document_content = read_document_file(file)?;
    let request = SubmitRequest { document_content, document_title: title, agent };
    let (_task_id, mut events) = orchestrator.stream(request)?;

    let mut stdout = std::io::stdout();
    while let Some(event) = events.next().await {
        let _ = write!(stdout, "{}", event.to_sse());
        let _ = stdout.flush();
        if matches!(event, StreamEvent::End { .. }) {
            break;
        }
    }
    Ok(String::new())
}

fn cmd_status(orchestrator: &Orchestrator, task_id: &str, format: OutputFormat) -> Result<String> {
    let task = orchestrator.get_status(task_id)?;
    Ok(format_task(&task, format))
}

fn cmd_get_unified(orchestrator: &Orchestrator, task_id: &str, format: OutputFormat) -> Result<String> {
    let unified = orchestrator.get_unified(task_id)?;
    Ok(format_unified(&unified, format))
}

fn cmd_get_flat(orchestrator: &Orchestrator, task_id: &str, format: OutputFormat) -> Result<String> {
    let flat = orchestrator.get_flat(task_id)?;
    Ok(format_flat(&flat, format))
}

fn cmd_get_rebuilt(orchestrator: &Orchestrator, task_id: &str, format: OutputFormat) -> Result<String> {
    let rebuilt = orchestrator.get_rebuilt(task_id)?;
    Ok(format_rebuilt(rebuilt.as_ref(), format))
}

fn cmd_cancel(orchestrator: &Orchestrator, task_id: &str, format: OutputFormat) -> Result<String> {
    orchestrator.cancel(task_id)?;
    let task = orchestrator.get_status(task_id)?;
    Ok(format_task(&task, format))
}

fn cmd_cleanup(orchestrator: &Orchestrator, after_hours: Option<u64>, format: OutputFormat) -> Result<String> {
    let hours = after_hours.unwrap_or(24);
    let removed = orchestrator.cleanup(hours)?;
    Ok(format_cleanup_result(removed, format))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_to_default_when_unset() {
        // SAFETY: test-only env mutation, single-threaded test.
        unsafe {
            std::env::remove_var("REVIEW_PIPELINE_TEST_UNSET");
        }
        assert_eq!(env_or("REVIEW_PIPELINE_TEST_UNSET", "fallback"), "fallback");
    }

    #[test]
    fn env_required_errors_when_unset() {
        // SAFETY: test-only env mutation, single-threaded test.
        unsafe {
            std::env::remove_var("REVIEW_PIPELINE_TEST_REQUIRED");
        }
        assert!(env_required("REVIEW_PIPELINE_TEST_REQUIRED").is_err());
    }
}
