//! Document input and artifact output helpers.
//!
//! Everything the orchestrator needs to cross a filesystem boundary:
//! reading a Markdown document for the CLI harness, validating UTF-8,
//! two-space-indent JSON serialization, and writing the persisted artifact
//! pair described in spec §6.

pub mod reader;
pub mod unicode;

pub use reader::{read_document_file, to_json_two_space, write_rebuilt_artifact, write_unified_artifact};
pub use unicode::{find_char_boundary, validate_utf8};
