//! Task orchestrator: drives one agent run through analyze → modify →
//! finalize, in one of three delivery modes, per spec §4.9.
//!
//! Grounded on `shared/task_manager.py::TaskManager` for the state machine
//! and cleanup sweep, and
//! `router/routers/redundancy_agent_router.py::format_sse_message` for the
//! stream event wire shape. Concurrency is rewritten from the teacher's
//! `rayon`-based `ParallelChunker` (CPU-bound) to `tokio::sync::Semaphore`
//! + `JoinSet` (I/O-bound), per spec §9's pattern-rewrite note.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde_json::json;
use tokio::sync::{Semaphore, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agents::evidence::{EvidenceAnalyzer, EvidenceModifier, run_evidence_pipeline};
use crate::agents::redundancy::{RedundancyAnalyzer, RedundancyModifier};
use crate::agents::table::{TableAnalyzer, TableModifier};
use crate::agents::thesis::{ThesisAnalyzer, ThesisModifier};
use crate::agents::{ProgressHook, SectionModifier, run_modification_pipeline};
use crate::config::Config;
use crate::core::record::{FlatChapters, UnifiedSections};
use crate::core::task::{AgentKind, DeliveryMode, Task, TaskArtifacts, TaskResult, TaskStatus};
use crate::error::{Error, InputError, Result, TaskError};
use crate::evidence;
use crate::flat::build_flat_chapters;
use crate::io::{to_json_two_space, write_rebuilt_artifact, write_unified_artifact};
use crate::llm::LlmClient;
use crate::parser::{self, MaxLevel};
use crate::rebuilder;
use crate::search::SearchClient;
use crate::storage::TaskStore;

/// Submission beyond `MAX_WORKERS * QUEUE_DEPTH_MULTIPLIER` concurrently
/// running-or-queued sync tasks is rejected as `QueueFull`, per spec §5's
/// "503-equivalent" backpressure.
const QUEUE_DEPTH_MULTIPLIER: usize = 4;

/// A document submitted for review.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// The Markdown document text.
    pub document_content: String,
    /// Optional human-readable title, carried through for diagnostics only.
    pub document_title: Option<String>,
    /// Which agent should process this document.
    pub agent: AgentKind,
}

/// The rebuilt-document artifact `GetRebuilt` returns, per spec §6.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RebuiltDocument {
    /// The rebuilt Markdown content.
    pub content: String,
    /// Path to the persisted Markdown artifact.
    pub file_path: String,
}

/// One server-sent-event-shaped event, per spec §6's stream format.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Progress update.
    Progress {
        /// Coarse status label (`"processing"`).
        status: String,
        /// Human-readable progress message.
        message: String,
        /// `0..=100`.
        progress: u8,
    },
    /// Terminal success payload.
    Result {
        /// The flattened modification list.
        chapters: FlatChapters,
        /// One-line human summary.
        summary: String,
    },
    /// Stream terminator.
    End {
        /// `"completed"` or `"failed"`.
        status: String,
        /// Always 100 once `end` is emitted.
        progress: u8,
    },
    /// Task-fatal error.
    Error {
        /// Machine-stable error kind.
        error: String,
        /// Human-readable message.
        message: String,
    },
}

impl StreamEvent {
    const fn event_type(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Result { .. } => "result",
            Self::End { .. } => "end",
            Self::Error { .. } => "error",
        }
    }

    /// Renders this event as the two-line `event: <type>\ndata: <json>\n\n`
    /// text format spec §6 specifies, independent of any transport.
    #[must_use]
    pub fn to_sse(&self) -> String {
        let data = match self {
            Self::Progress { status, message, progress } => json!({"status": status, "message": message, "progress": progress}),
            Self::Result { chapters, summary } => json!({"chapters": chapters, "summary": summary}),
            Self::End { status, progress } => json!({"status": status, "progress": progress}),
            Self::Error { error, message } => json!({"error": error, "message": message}),
        };
        format!("event: {}\ndata: {data}\n\n", self.event_type())
    }
}

/// Drives one agent's analyze → modify → finalize pipeline across sync,
/// async, and stream delivery modes.
///
/// All task-table mutation goes through this struct's methods — the task
/// table itself is never exposed directly, matching spec §4.9's ownership
/// boundary.
pub struct Orchestrator {
    config: Config,
    llm: Arc<dyn LlmClient>,
    search: Arc<dyn SearchClient>,
    store: Mutex<Box<dyn TaskStore>>,
    artifacts: Mutex<HashMap<String, TaskArtifacts>>,
    cancels: Mutex<HashMap<String, CancellationToken>>,
    worker_semaphore: Arc<Semaphore>,
    in_flight: AtomicUsize,
    redundancy_analyzer: Arc<RedundancyAnalyzer>,
    redundancy_modifier: Arc<RedundancyModifier>,
    table_analyzer: Arc<TableAnalyzer>,
    table_modifier: Arc<TableModifier>,
    thesis_analyzer: Arc<ThesisAnalyzer>,
    thesis_modifier: Arc<ThesisModifier>,
    evidence_analyzer: Arc<EvidenceAnalyzer>,
    evidence_modifier: Arc<EvidenceModifier>,
}

impl Orchestrator {
    /// Builds an orchestrator, initializing `store`'s schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the task store cannot be initialized.
    pub fn new(config: Config, llm: Arc<dyn LlmClient>, search: Arc<dyn SearchClient>, mut store: Box<dyn TaskStore>) -> Result<Arc<Self>> {
        store.init()?;
        let worker_semaphore = Arc::new(Semaphore::new(config.max_workers.max(1)));
        Ok(Arc::new(Self {
            redundancy_analyzer: Arc::new(RedundancyAnalyzer::new(config.temperature, config.max_tokens)),
            redundancy_modifier: Arc::new(RedundancyModifier::new(config.temperature, config.max_tokens)),
            table_analyzer: Arc::new(TableAnalyzer::new(config.temperature, config.max_tokens)),
            table_modifier: Arc::new(TableModifier::new(config.temperature, config.max_tokens)),
            thesis_analyzer: Arc::new(ThesisAnalyzer::new(
                config.thesis_extraction_temperature,
                config.consistency_check_temperature,
                config.max_tokens,
            )),
            thesis_modifier: Arc::new(ThesisModifier::new(config.content_correction_temperature, config.max_tokens)),
            evidence_analyzer: Arc::new(EvidenceAnalyzer::new(config.temperature, config.max_tokens)),
            evidence_modifier: Arc::new(EvidenceModifier::new(config.temperature, config.max_tokens)),
            config,
            llm,
            search,
            store: Mutex::new(store),
            artifacts: Mutex::new(HashMap::new()),
            cancels: Mutex::new(HashMap::new()),
            worker_semaphore,
            in_flight: AtomicUsize::new(0),
        }))
    }

    /// Submits a document for sync or async review.
    ///
    /// Sync blocks until the task reaches a terminal state and returns its
    /// final snapshot; async spawns the task on the worker pool and returns
    /// the `pending` snapshot immediately. Use [`Orchestrator::stream`] for
    /// stream delivery.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] if the document is empty or exceeds the
    /// configured size cap for `mode`; returns [`TaskError::QueueFull`] for
    /// a sync submission once the queue-depth threshold is exceeded.
    pub async fn submit(self: &Arc<Self>, request: SubmitRequest, mode: DeliveryMode) -> Result<Task> {
        self.validate(&request, mode)?;

        let task_id = Uuid::new_v4().to_string();
        let task = Task::new(task_id.clone(), request.agent, mode);
        {
            let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
            store.insert(&task)?;
        }
        let cancel = CancellationToken::new();
        self.cancels.lock().unwrap_or_else(PoisonError::into_inner).insert(task_id.clone(), cancel.clone());

        match mode {
            DeliveryMode::Sync => {
                if self.queue_full() {
                    self.cancels.lock().unwrap_or_else(PoisonError::into_inner).remove(&task_id);
                    return Err(Error::Task(TaskError::QueueFull));
                }
                self.in_flight.fetch_add(1, Ordering::SeqCst);
                self.run(task_id.clone(), request.agent, request.document_content, cancel, None).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                self.cancels.lock().unwrap_or_else(PoisonError::into_inner).remove(&task_id);
                self.get_status(&task_id)
            }
            DeliveryMode::Async => {
                self.in_flight.fetch_add(1, Ordering::SeqCst);
                let this = Arc::clone(self);
                let spawned_id = task_id.clone();
                tokio::spawn(async move {
                    this.run(spawned_id.clone(), request.agent, request.document_content, cancel, None).await;
                    this.in_flight.fetch_sub(1, Ordering::SeqCst);
                    this.cancels.lock().unwrap_or_else(PoisonError::into_inner).remove(&spawned_id);
                });
                self.get_status(&task_id)
            }
            DeliveryMode::Stream => unreachable!("stream delivery goes through Orchestrator::stream"),
        }
    }

    /// Submits a document for stream delivery, returning its task id and a
    /// stream of [`StreamEvent`]s per spec §4.9/§6.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] if the document is empty or exceeds the
    /// configured size cap.
    pub fn stream(self: &Arc<Self>, request: SubmitRequest) -> Result<(String, UnboundedReceiverStream<StreamEvent>)> {
        self.validate(&request, DeliveryMode::Stream)?;

        let task_id = Uuid::new_v4().to_string();
        let task = Task::new(task_id.clone(), request.agent, DeliveryMode::Stream);
        {
            let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
            store.insert(&task)?;
        }
        let cancel = CancellationToken::new();
        self.cancels.lock().unwrap_or_else(PoisonError::into_inner).insert(task_id.clone(), cancel.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        let this = Arc::clone(self);
        let spawned_id = task_id.clone();
        tokio::spawn(async move {
            this.run(spawned_id.clone(), request.agent, request.document_content, cancel, Some(tx)).await;
            this.cancels.lock().unwrap_or_else(PoisonError::into_inner).remove(&spawned_id);
        });

        Ok((task_id, UnboundedReceiverStream::new(rx)))
    }

    /// Cancels a task cooperatively. Takes effect at the next analyzer/
    /// modifier boundary or between evidence-search claims, per spec §4.9.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if `task_id` is unknown or already
    /// terminal.
    pub fn cancel(&self, task_id: &str) -> Result<()> {
        let cancels = self.cancels.lock().unwrap_or_else(PoisonError::into_inner);
        match cancels.get(task_id) {
            Some(token) => {
                token.cancel();
                Ok(())
            }
            None => Err(Error::Task(TaskError::NotFound { task_id: task_id.to_string() })),
        }
    }

    /// Fetches a task's current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if `task_id` is unknown.
    pub fn get_status(&self, task_id: &str) -> Result<Task> {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        store.get(task_id)?.ok_or_else(|| Error::Task(TaskError::NotFound { task_id: task_id.to_string() }))
    }

    /// Fetches a completed task's `UnifiedSections` artifact.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if the task is unknown or has not
    /// yet produced this artifact.
    pub fn get_unified(&self, task_id: &str) -> Result<UnifiedSections> {
        let artifacts = self.artifacts.lock().unwrap_or_else(PoisonError::into_inner);
        artifacts
            .get(task_id)
            .and_then(|a| a.unified.clone())
            .ok_or_else(|| Error::Task(TaskError::NotFound { task_id: task_id.to_string() }))
    }

    /// Fetches a completed task's flat-chapters view.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if the task is unknown or has not
    /// yet produced this artifact.
    pub fn get_flat(&self, task_id: &str) -> Result<FlatChapters> {
        let artifacts = self.artifacts.lock().unwrap_or_else(PoisonError::into_inner);
        artifacts
            .get(task_id)
            .and_then(|a| a.flat.clone())
            .ok_or_else(|| Error::Task(TaskError::NotFound { task_id: task_id.to_string() }))
    }

    /// Fetches a completed task's rebuilt document, if it produced one.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if the task is unknown.
    pub fn get_rebuilt(&self, task_id: &str) -> Result<Option<RebuiltDocument>> {
        let artifacts = self.artifacts.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = artifacts.get(task_id) else {
            return Err(Error::Task(TaskError::NotFound { task_id: task_id.to_string() }));
        };
        let Some(content) = entry.rebuilt.clone() else {
            return Ok(None);
        };
        let file_path = self
            .get_status(task_id)?
            .result
            .and_then(|r| r.rebuilt_path)
            .unwrap_or_default();
        Ok(Some(RebuiltDocument { content, file_path }))
    }

    /// Sweeps completed/failed tasks whose terminal timestamp is older than
    /// `after_hours`, per spec §4.9's cleanup operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the sweep query fails.
    pub fn cleanup(&self, after_hours: u64) -> Result<usize> {
        let threshold = Utc::now() - chrono::Duration::hours(i64::try_from(after_hours).unwrap_or(i64::MAX));
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(store.sweep_completed_before(threshold)?)
    }

    fn validate(&self, request: &SubmitRequest, mode: DeliveryMode) -> Result<()> {
        if request.document_content.trim().is_empty() {
            return Err(Error::Input(InputError::EmptyDocument));
        }
        let cap = match mode {
            DeliveryMode::Sync => self.config.sync_document_cap,
            DeliveryMode::Async | DeliveryMode::Stream => self.config.async_document_cap,
        };
        if request.document_content.len() > cap {
            return Err(Error::Input(InputError::DocumentTooLarge { limit: cap }));
        }
        Ok(())
    }

    fn queue_full(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) >= self.config.max_workers.saturating_mul(QUEUE_DEPTH_MULTIPLIER)
    }

    /// Runs one task end to end, persisting progress/status transitions and
    /// emitting stream events as it goes. Never returns an error: task-fatal
    /// failures are absorbed into the task's terminal `failed` state, per
    /// spec §7.
    async fn run(
        self: &Arc<Self>,
        task_id: String,
        agent: AgentKind,
        document_content: String,
        cancel: CancellationToken,
        progress_tx: Option<mpsc::UnboundedSender<StreamEvent>>,
    ) {
        let outcome = tokio::time::timeout(
            self.config.task_timeout,
            self.execute(&task_id, agent, &document_content, &cancel, &progress_tx),
        )
        .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                self.fail_task(&task_id, &err.to_string());
                self.emit_terminal_error(&progress_tx, &err);
            }
            Err(_elapsed) => {
                cancel.cancel();
                let err = Error::Task(TaskError::TimedOut {
                    timeout_secs: self.config.task_timeout.as_secs(),
                });
                self.fail_task(&task_id, &err.to_string());
                self.emit_terminal_error(&progress_tx, &err);
            }
        }
    }

    async fn execute(
        self: &Arc<Self>,
        task_id: &str,
        agent: AgentKind,
        document_content: &str,
        cancel: &CancellationToken,
        progress_tx: &Option<mpsc::UnboundedSender<StreamEvent>>,
    ) -> Result<()> {
        let _permit = self.worker_semaphore.acquire().await.map_err(|_| Error::Task(TaskError::Cancelled))?;

        self.set_progress(task_id, 0, "task started")?;
        self.emit_progress(progress_tx, 0, "task started");

        let document = parser::parse(document_content, MaxLevel::H3, true);

        if cancel.is_cancelled() {
            return Err(Error::Task(TaskError::Cancelled));
        }
        self.set_progress(task_id, 10, "analyzer started")?;
        self.emit_progress(progress_tx, 10, "analyzer started");

        let unified = self.run_agent(agent, &document, cancel, task_id, progress_tx).await?;

        self.set_progress(task_id, 90, "modification done")?;
        self.emit_progress(progress_tx, 90, "modification done");

        if cancel.is_cancelled() {
            return Err(Error::Task(TaskError::Cancelled));
        }

        let flat = build_flat_chapters(&unified);
        let rebuilt = rebuilder::rebuild(document_content, &unified);

        self.set_progress(task_id, 95, "finalizing")?;
        self.emit_progress(progress_tx, 95, "finalizing");

        let now = Utc::now();
        let json = to_json_two_space(&unified).map_err(|e| Error::Task(TaskError::ArtifactWriteFailed { message: e.to_string() }))?;
        let unified_path = write_unified_artifact(&self.config.output_dir, task_id, now.timestamp(), &json).map_err(Error::Task)?;
        let rebuilt_path = write_rebuilt_artifact(&self.config.output_dir, task_id, now.timestamp(), &rebuilt).map_err(Error::Task)?;

        {
            let mut artifacts = self.artifacts.lock().unwrap_or_else(PoisonError::into_inner);
            artifacts.insert(
                task_id.to_string(),
                TaskArtifacts {
                    unified: Some(unified),
                    flat: Some(flat.clone()),
                    rebuilt: Some(rebuilt),
                },
            );
        }

        self.complete_task(
            task_id,
            TaskResult {
                unified_path: unified_path.display().to_string(),
                rebuilt_path: Some(rebuilt_path.display().to_string()),
            },
        )?;
        self.emit_progress(progress_tx, 100, "completed");
        self.emit_result_and_end(progress_tx, flat);

        Ok(())
    }

    async fn run_agent(
        self: &Arc<Self>,
        agent: AgentKind,
        document: &crate::core::section::ParsedDocument,
        cancel: &CancellationToken,
        task_id: &str,
        progress_tx: &Option<mpsc::UnboundedSender<StreamEvent>>,
    ) -> Result<UnifiedSections> {
        match agent {
            AgentKind::Redundancy => {
                let instructions = self.redundancy_analyzer.analyze(document, self.llm.as_ref(), cancel).await.map_err(Error::Llm)?;
                self.set_progress(task_id, 30, "analyzer done")?;
                self.emit_progress(progress_tx, 30, "analyzer done");
                if cancel.is_cancelled() {
                    return Err(Error::Task(TaskError::Cancelled));
                }
                self.set_progress(task_id, 40, "modification started")?;
                self.emit_progress(progress_tx, 40, "modification started");
                let modifier: Arc<dyn SectionModifier> = Arc::clone(&self.redundancy_modifier) as Arc<dyn SectionModifier>;
                let hook = self.progress_hook(task_id, progress_tx, 40, 90, "modification in progress");
                Ok(run_modification_pipeline(document, instructions, &modifier, &self.llm, self.config.n_mod, cancel, Some(hook)).await)
            }
            AgentKind::Table => {
                let instructions = self.table_analyzer.analyze(document, self.llm.as_ref(), cancel).await.map_err(Error::Llm)?;
                self.set_progress(task_id, 30, "analyzer done")?;
                self.emit_progress(progress_tx, 30, "analyzer done");
                if cancel.is_cancelled() {
                    return Err(Error::Task(TaskError::Cancelled));
                }
                self.set_progress(task_id, 40, "modification started")?;
                self.emit_progress(progress_tx, 40, "modification started");
                let modifier: Arc<dyn SectionModifier> = Arc::clone(&self.table_modifier) as Arc<dyn SectionModifier>;
                let hook = self.progress_hook(task_id, progress_tx, 40, 90, "modification in progress");
                Ok(run_modification_pipeline(document, instructions, &modifier, &self.llm, self.config.n_mod, cancel, Some(hook)).await)
            }
            AgentKind::Thesis => {
                let instructions = self.thesis_analyzer.analyze(document, self.llm.as_ref(), cancel).await.map_err(Error::Llm)?;
                self.set_progress(task_id, 30, "analyzer done")?;
                self.emit_progress(progress_tx, 30, "analyzer done");
                if cancel.is_cancelled() {
                    return Err(Error::Task(TaskError::Cancelled));
                }
                self.set_progress(task_id, 40, "modification started")?;
                self.emit_progress(progress_tx, 40, "modification started");
                let modifier: Arc<dyn SectionModifier> = Arc::clone(&self.thesis_modifier) as Arc<dyn SectionModifier>;
                let hook = self.progress_hook(task_id, progress_tx, 40, 90, "modification in progress");
                Ok(run_modification_pipeline(document, instructions, &modifier, &self.llm, self.config.n_mod, cancel, Some(hook)).await)
            }
            AgentKind::Evidence => {
                let claims = self.evidence_analyzer.detect_claims(document, self.llm.as_ref(), cancel).await.map_err(Error::Llm)?;
                self.set_progress(task_id, 30, "analyzer done")?;
                self.emit_progress(progress_tx, 30, "analyzer done");
                if cancel.is_cancelled() {
                    return Err(Error::Task(TaskError::Cancelled));
                }
                let claims = evidence::cap_claims(claims, self.config.n_claim_cap);
                let search_hook = self.progress_hook(task_id, progress_tx, 40, 65, "evidence search in progress");
                let results = evidence::search_all(&claims, &self.search, self.config.n_search, cancel, Some(search_hook)).await;
                self.set_progress(task_id, 65, "modification started")?;
                self.emit_progress(progress_tx, 65, "modification started");
                let modify_hook = self.progress_hook(task_id, progress_tx, 65, 90, "evidence modification in progress");
                Ok(run_evidence_pipeline(document, &claims, &results, &self.evidence_modifier, &self.llm, self.config.n_mod, cancel, Some(modify_hook)).await)
            }
        }
    }

    /// Builds a `(completed, total)` callback that interpolates progress
    /// linearly between `low` and `high` and reports it through both
    /// [`Orchestrator::set_progress`] and the stream channel, so per-section/
    /// per-claim completions move progress within the band instead of
    /// jumping straight from its start to its end (spec §4.9).
    fn progress_hook(self: &Arc<Self>, task_id: &str, progress_tx: &Option<mpsc::UnboundedSender<StreamEvent>>, low: u8, high: u8, label: &str) -> ProgressHook {
        let this = Arc::clone(self);
        let task_id = task_id.to_string();
        let progress_tx = progress_tx.clone();
        let label = label.to_string();
        Arc::new(move |completed: usize, total: usize| {
            let progress = if total == 0 {
                high
            } else {
                let frac = completed.min(total) as f64 / total as f64;
                let value = f64::from(low) + frac * f64::from(high - low);
                value.round().clamp(f64::from(low), f64::from(high)) as u8
            };
            let message = format!("{label} ({completed}/{total})");
            let _ = this.set_progress(&task_id, progress, &message);
            this.emit_progress(&progress_tx, progress, &message);
        })
    }

    fn set_progress(&self, task_id: &str, progress: u8, message: &str) -> Result<()> {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let mut task = store.get(task_id)?.ok_or_else(|| Error::Task(TaskError::NotFound { task_id: task_id.to_string() }))?;
        if task.started_at.is_none() {
            task.started_at = Some(Utc::now());
        }
        task.status = TaskStatus::Processing { progress };
        task.progress = progress;
        task.message = message.to_string();
        store.update(&task)?;
        Ok(())
    }

    fn complete_task(&self, task_id: &str, result: TaskResult) -> Result<()> {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let mut task = store.get(task_id)?.ok_or_else(|| Error::Task(TaskError::NotFound { task_id: task_id.to_string() }))?;
        task.status = TaskStatus::Completed;
        task.progress = 100;
        task.message = "completed".to_string();
        task.completed_at = Some(Utc::now());
        task.result = Some(result);
        store.update(&task)?;
        Ok(())
    }

    fn fail_task(&self, task_id: &str, error: &str) {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let Ok(Some(mut task)) = store.get(task_id) else {
            return;
        };
        task.status = TaskStatus::Failed;
        task.completed_at = Some(Utc::now());
        task.error = Some(error.to_string());
        task.message = error.to_string();
        let _ = store.update(&task);
    }

    fn emit_progress(&self, tx: &Option<mpsc::UnboundedSender<StreamEvent>>, progress: u8, message: &str) {
        if let Some(tx) = tx {
            let _ = tx.send(StreamEvent::Progress {
                status: "processing".to_string(),
                message: message.to_string(),
                progress,
            });
        }
    }

    fn emit_terminal_error(&self, tx: &Option<mpsc::UnboundedSender<StreamEvent>>, err: &Error) {
        if let Some(tx) = tx {
            let _ = tx.send(StreamEvent::Error {
                error: "task_error".to_string(),
                message: err.to_string(),
            });
            let _ = tx.send(StreamEvent::End {
                status: "failed".to_string(),
                progress: 100,
            });
        }
    }

    fn emit_result_and_end(&self, tx: &Option<mpsc::UnboundedSender<StreamEvent>>, chapters: FlatChapters) {
        if let Some(tx) = tx {
            let count = chapters.len();
            let _ = tx.send(StreamEvent::Result {
                chapters,
                summary: format!("{count} section(s) modified"),
            });
            let _ = tx.send(StreamEvent::End {
                status: "completed".to_string(),
                progress: 100,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FakeLlmClient;
    use crate::search::FakeSearchClient;
    use crate::storage::SqliteStorage;
    use tokio_stream::StreamExt;

    fn orchestrator_with(llm_responses: Vec<String>) -> Arc<Orchestrator> {
        let config = Config {
            output_dir: tempfile::tempdir().unwrap().keep(),
            ..Config::default()
        };
        let llm: Arc<dyn LlmClient> = Arc::new(FakeLlmClient::new(llm_responses));
        let search: Arc<dyn SearchClient> = Arc::new(FakeSearchClient::new(vec![]));
        let store: Box<dyn TaskStore> = Box::new(SqliteStorage::in_memory().unwrap());
        Orchestrator::new(config, llm, search, store).unwrap()
    }

    #[tokio::test]
    async fn empty_document_is_rejected_before_any_task_is_created() {
        let orchestrator = orchestrator_with(vec![]);
        let request = SubmitRequest {
            document_content: "   ".to_string(),
            document_title: None,
            agent: AgentKind::Redundancy,
        };
        let result = orchestrator.submit(request, DeliveryMode::Sync).await;
        assert!(matches!(result, Err(Error::Input(InputError::EmptyDocument))));
    }

    #[tokio::test]
    async fn sync_run_with_no_instructions_completes_with_empty_chapters() {
        let orchestrator = orchestrator_with(vec!["[]".to_string()]);
        let request = SubmitRequest {
            document_content: "# H1\n## H2\nbody\n".to_string(),
            document_title: None,
            agent: AgentKind::Redundancy,
        };
        let task = orchestrator.submit(request, DeliveryMode::Sync).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        let flat = orchestrator.get_flat(&task.task_id).unwrap();
        assert!(flat.is_empty());
    }

    #[tokio::test]
    async fn cancellation_before_analyzer_completes_yields_failed_with_no_artifacts() {
        let orchestrator = orchestrator_with(vec![]);
        let request = SubmitRequest {
            document_content: "# H1\n## H2\nbody\n".to_string(),
            document_title: None,
            agent: AgentKind::Redundancy,
        };
        let (task_id, mut events) = orchestrator.stream(request).unwrap();
        orchestrator.cancel(&task_id).unwrap();
        while let Some(event) = events.next().await {
            if matches!(event, StreamEvent::End { .. }) {
                break;
            }
        }
        let task = orchestrator.get_status(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        let entries = std::fs::read_dir(&orchestrator.config.output_dir).map(Iterator::count).unwrap_or(0);
        assert_eq!(entries, 0);
    }

    #[test]
    fn progress_event_renders_two_line_sse_shape() {
        let event = StreamEvent::Progress {
            status: "processing".to_string(),
            message: "analyzer started".to_string(),
            progress: 10,
        };
        let rendered = event.to_sse();
        assert!(rendered.starts_with("event: progress\ndata: "));
        assert!(rendered.ends_with("\n\n"));
        assert!(rendered.contains("\"progress\":10"));
    }
}
