//! Core domain models for the review pipeline.
//!
//! Pure data structures with no I/O dependencies: parsed document sections,
//! analyzer output (instructions and claims), per-section/per-claim
//! results, the unified-sections shape, and the task record the
//! orchestrator tracks end-to-end.

pub mod claim;
pub mod instruction;
pub mod record;
pub mod section;
pub mod task;

pub use claim::{ClaimType, EvidenceResult, EvidenceStatus, SearchHit, SourceRef, UnsupportedClaim};
pub use instruction::ModificationInstruction;
pub use record::{FlatChapter, FlatChapters, RecordStatus, SectionRecord, UnifiedSections};
pub use section::{ParsedDocument, PROLOGUE_TITLE};
pub use task::{AgentKind, DeliveryMode, Task, TaskStatus};
