//! Document input and artifact output.
//!
//! Two directions of file I/O this crate actually performs: reading a
//! Markdown document from disk for the CLI harness (§6's concrete
//! collaborators don't include a request transport, so the binary reads
//! files directly instead), and writing the persisted artifact pair —
//! `UnifiedSections` JSON and an optional rebuilt Markdown — that
//! [`crate::orchestrator::Orchestrator`] produces on task completion.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::{StorageError, TaskError};
use crate::io::unicode::{find_char_boundary, validate_utf8};

/// Reads a Markdown document from `path` as UTF-8 text.
///
/// # Errors
///
/// Returns [`TaskError::ArtifactWriteFailed`] is not used here; I/O and
/// UTF-8 failures are surfaced as plain `std::io::Error`-shaped strings via
/// [`StorageError::Io`], matching how the CLI harness reports file problems
/// (this is not in the request path the orchestrator validates — see
/// [`crate::core::task`]'s `InputError` for that).
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid UTF-8.
pub fn read_document_file(path: impl AsRef<Path>) -> Result<String, StorageError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| StorageError::Io(format!("reading {}: {e}", path.display())))?;
    match validate_utf8(&bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(offset) => {
            let boundary = find_char_boundary(&String::from_utf8_lossy(&bytes), offset);
            Err(StorageError::Io(format!(
                "{} is not valid UTF-8 (first invalid byte near offset {boundary})",
                path.display()
            )))
        }
    }
}

/// Serializes `value` as JSON with a two-space indent, matching spec §6's
/// "UTF-8, two-space indent" artifact contract (the crate's default
/// `serde_json::to_string_pretty` uses four spaces).
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_two_space<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8(buf).unwrap_or_default())
}

/// Writes the `UnifiedSections` JSON artifact for `task_id` under
/// `output_dir`, named `{task_id}-{timestamp}.json` per spec §6 ("filenames
/// include `task_id` and a monotonic timestamp; no other naming contract").
///
/// # Errors
///
/// Returns [`TaskError::ArtifactWriteFailed`] if the directory cannot be
/// created or the file cannot be written.
pub fn write_unified_artifact(output_dir: &Path, task_id: &str, timestamp: i64, json: &str) -> Result<PathBuf, TaskError> {
    let path = artifact_path(output_dir, task_id, timestamp, "json");
    write_artifact(&path, json)?;
    Ok(path)
}

/// Writes the optional rebuilt-Markdown artifact for `task_id`, named
/// `{task_id}-{timestamp}.md`.
///
/// # Errors
///
/// Returns [`TaskError::ArtifactWriteFailed`] if the directory cannot be
/// created or the file cannot be written.
pub fn write_rebuilt_artifact(output_dir: &Path, task_id: &str, timestamp: i64, markdown: &str) -> Result<PathBuf, TaskError> {
    let path = artifact_path(output_dir, task_id, timestamp, "md");
    write_artifact(&path, markdown)?;
    Ok(path)
}

fn artifact_path(output_dir: &Path, task_id: &str, timestamp: i64, extension: &str) -> PathBuf {
    output_dir.join(format!("{task_id}-{timestamp}.{extension}"))
}

fn write_artifact(path: &Path, content: &str) -> Result<(), TaskError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| TaskError::ArtifactWriteFailed { message: e.to_string() })?;
    }
    std::fs::write(path, content).map_err(|e| TaskError::ArtifactWriteFailed { message: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Probe {
        a: u32,
        b: Vec<u32>,
    }

    #[test]
    fn two_space_indent_matches_contract() {
        let json = to_json_two_space(&Probe { a: 1, b: vec![2, 3] }).unwrap();
        assert!(json.contains("{\n  \"a\": 1,\n  \"b\": [\n    2,\n    3\n  ]\n}"));
    }

    #[test]
    fn reads_valid_utf8_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# H1\nbody\n").unwrap();
        let content = read_document_file(&path).unwrap();
        assert_eq!(content, "# H1\nbody\n");
    }

    #[test]
    fn rejects_invalid_utf8_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.md");
        std::fs::write(&path, [0x66, 0x6f, 0xff, 0x6f]).unwrap();
        assert!(read_document_file(&path).is_err());
    }

    #[test]
    fn writes_unified_artifact_under_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_unified_artifact(dir.path(), "t1", 1_700_000_000, "{}").unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), "t1-1700000000.json");
    }
}
