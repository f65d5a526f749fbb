//! Process-wide configuration, loaded from environment variables.
//!
//! Grounded on `cosmos-adapters::config`'s typed-accessor style and
//! `router/config.py::UnifiedConfig`'s property set, renamed to spec §6's
//! option names. Unknown environment variables are ignored; a recognized
//! variable holding an unparseable value is a [`ConfigError`].

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default chat model name, used when `LLM_MODEL` is unset.
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Default per-task wall-clock timeout, in seconds (spec §4.9).
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 600;

/// Default task-table sweep age, in hours (spec §3).
pub const DEFAULT_CLEANUP_AFTER_HOURS: u64 = 24;

/// Default async submission size cap, in bytes (spec §6).
pub const DEFAULT_ASYNC_DOCUMENT_CAP: usize = 1024 * 1024;

/// Default sync submission size cap, in bytes (spec §6).
pub const DEFAULT_SYNC_DOCUMENT_CAP: usize = 100 * 1024;

/// Process-wide configuration for the review pipeline runtime.
///
/// Every field corresponds to one of spec §6's enumerated recognized
/// options, plus the per-agent LLM sampling parameters the original system
/// exposed (`TEMPERATURE`/`MAX_TOKENS` and three per-agent overrides) as a
/// dropped-feature supplement from `router/config.py`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Chat-completion model name sent to the LLM client.
    pub llm_model: String,
    /// Per-call LLM timeout.
    pub llm_timeout: Duration,
    /// Retry attempts for transient LLM failures (spec §4.2 default 3).
    pub llm_retries: u32,
    /// Per-call web-search timeout.
    pub search_timeout: Duration,
    /// Global worker-pool size (spec §5's "Global concurrency").
    pub max_workers: usize,
    /// Per-task modifier concurrency (`N_mod`, spec §4.5 default 5).
    pub n_mod: usize,
    /// Per-task evidence-search concurrency (`N_search`, spec §4.6 default 5).
    pub n_search: usize,
    /// Per-run evidence claim cap (`N_claim_cap`, spec §4.6 default 25).
    pub n_claim_cap: usize,
    /// Per-task wall-clock timeout (spec §4.9 default 10 minutes).
    pub task_timeout: Duration,
    /// Task-table sweep age (spec §3 default 24h).
    pub cleanup_after_hours: u64,
    /// Directory persisted artifacts are written under (spec §6).
    pub output_dir: PathBuf,
    /// Default sampling temperature for analyzer/modifier calls.
    pub temperature: f32,
    /// Default max-tokens for analyzer/modifier calls.
    pub max_tokens: u32,
    /// Temperature override for the thesis agent's extraction call.
    pub thesis_extraction_temperature: f32,
    /// Temperature override for the thesis agent's consistency-check call.
    pub consistency_check_temperature: f32,
    /// Temperature override for the thesis agent's content-correction call.
    pub content_correction_temperature: f32,
    /// Submission size cap for async delivery, in bytes.
    pub async_document_cap: usize,
    /// Submission size cap for sync delivery, in bytes.
    pub sync_document_cap: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_timeout: Duration::from_secs(60),
            llm_retries: 3,
            search_timeout: Duration::from_secs(15),
            max_workers: 8,
            n_mod: 5,
            n_search: 5,
            n_claim_cap: 25,
            task_timeout: Duration::from_secs(DEFAULT_TASK_TIMEOUT_SECS),
            cleanup_after_hours: DEFAULT_CLEANUP_AFTER_HOURS,
            output_dir: PathBuf::from("./output"),
            temperature: 0.3,
            max_tokens: 2000,
            thesis_extraction_temperature: 0.2,
            consistency_check_temperature: 0.3,
            content_correction_temperature: 0.4,
            async_document_cap: DEFAULT_ASYNC_DOCUMENT_CAP,
            sync_document_cap: DEFAULT_SYNC_DOCUMENT_CAP,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// [`Config::default`] for anything unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a recognized variable holds
    /// a value that doesn't parse as its expected type.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            llm_model: env_string("LLM_MODEL", defaults.llm_model),
            llm_timeout: Duration::from_secs(env_u64("LLM_TIMEOUT_SEC", defaults.llm_timeout.as_secs())?),
            llm_retries: env_u32("LLM_RETRIES", defaults.llm_retries)?,
            search_timeout: Duration::from_secs(env_u64("SEARCH_TIMEOUT_SEC", defaults.search_timeout.as_secs())?),
            max_workers: env_usize("MAX_WORKERS", defaults.max_workers)?,
            n_mod: env_usize("N_MOD", defaults.n_mod)?,
            n_search: env_usize("N_SEARCH", defaults.n_search)?,
            n_claim_cap: env_usize("N_CLAIM_CAP", defaults.n_claim_cap)?,
            task_timeout: Duration::from_secs(env_u64("TASK_TIMEOUT_SEC", defaults.task_timeout.as_secs())?),
            cleanup_after_hours: env_u64("CLEANUP_AFTER_HOURS", defaults.cleanup_after_hours)?,
            output_dir: env_string("OUTPUT_DIR", defaults.output_dir.to_string_lossy().into_owned()).into(),
            temperature: env_f32("TEMPERATURE", defaults.temperature)?,
            max_tokens: env_u32("MAX_TOKENS", defaults.max_tokens)?,
            thesis_extraction_temperature: env_f32("THESIS_EXTRACTION_TEMPERATURE", defaults.thesis_extraction_temperature)?,
            consistency_check_temperature: env_f32("CONSISTENCY_CHECK_TEMPERATURE", defaults.consistency_check_temperature)?,
            content_correction_temperature: env_f32("CONTENT_CORRECTION_TEMPERATURE", defaults.content_correction_temperature)?,
            async_document_cap: env_usize("ASYNC_DOCUMENT_CAP_BYTES", defaults.async_document_cap)?,
            sync_document_cap: env_usize("SYNC_DOCUMENT_CAP_BYTES", defaults.sync_document_cap)?,
        })
    }
}

fn env_string(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
    parse_env(key, default)
}

fn env_u32(key: &str, default: u32) -> Result<u32, ConfigError> {
    parse_env(key, default)
}

fn env_usize(key: &str, default: usize) -> Result<usize, ConfigError> {
    parse_env(key, default)
}

fn env_f32(key: &str, default: f32) -> Result<f32, ConfigError> {
    parse_env(key, default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_defaults() {
        let config = Config::default();
        assert_eq!(config.n_mod, 5);
        assert_eq!(config.n_search, 5);
        assert_eq!(config.n_claim_cap, 25);
        assert_eq!(config.task_timeout, Duration::from_secs(600));
        assert_eq!(config.cleanup_after_hours, 24);
    }

    #[test]
    fn parse_env_rejects_garbage_values() {
        // SAFETY: test-only env mutation, single-threaded test.
        unsafe {
            env::set_var("REVIEW_PIPELINE_TEST_N_MOD", "not-a-number");
        }
        let result = parse_env::<usize>("REVIEW_PIPELINE_TEST_N_MOD", 5);
        unsafe {
            env::remove_var("REVIEW_PIPELINE_TEST_N_MOD");
        }
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn parse_env_falls_back_to_default_when_unset() {
        let result = parse_env::<usize>("REVIEW_PIPELINE_TEST_UNSET_VAR", 7);
        assert_eq!(result.unwrap(), 7);
    }
}
