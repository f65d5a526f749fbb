//! CLI layer for the review-pipeline runtime.
//!
//! Provides the command-line interface using clap: submit/stream a
//! document through one review agent, poll task status, and fetch the
//! persisted artifacts (unified sections, flat chapters, rebuilt
//! document).

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
