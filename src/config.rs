//! Runtime configuration: temp root, cache backend selection, rate-limit
//! window, and default traversal caps, read from the environment with
//! sensible defaults.

use std::path::PathBuf;

use crate::defaults::{DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_FILES, DEFAULT_MAX_TOTAL_SIZE};

/// Backend selection for the digest cache. `InMemory` is the only backend
/// wired up in this repo; other variants are accepted from the environment
/// so a deployment can fail fast on an unimplemented choice rather than
/// silently falling back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    InMemory,
    Disabled,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Shared temporary directory under which every request's scratch
    /// directory is created.
    pub scratch_root: PathBuf,
    pub cache_backend: CacheBackend,
    pub cache_key_prefix: String,
    /// Rate-limit window, requests per client.
    pub rate_limit_per_minute: u32,
    /// Append-log of completed `owner/repo` lines the cleanup worker writes
    /// to. Defaults to `history.txt` under `scratch_root`.
    pub history_path: PathBuf,
    pub default_max_file_size: u64,
    pub default_max_files: usize,
    pub default_max_total_size: u64,
    pub github_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let scratch_root = std::env::var("REPODIGEST_SCRATCH_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());
        let history_path = std::env::var("REPODIGEST_HISTORY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| scratch_root.join("history.txt"));

        Self {
            history_path,
            cache_backend: match std::env::var("REPODIGEST_CACHE_BACKEND").as_deref() {
                Ok("memory") | Err(_) => CacheBackend::InMemory,
                Ok("disabled") => CacheBackend::Disabled,
                Ok(other) => {
                    tracing::warn!(backend = other, "unknown cache backend, disabling cache");
                    CacheBackend::Disabled
                }
            },
            cache_key_prefix: std::env::var("REPODIGEST_CACHE_PREFIX").unwrap_or_else(|_| "repodigest".to_string()),
            rate_limit_per_minute: std::env::var("REPODIGEST_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            default_max_file_size: std::env::var("REPODIGEST_MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_FILE_SIZE),
            default_max_files: std::env::var("REPODIGEST_MAX_FILES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_FILES),
            default_max_total_size: std::env::var("REPODIGEST_MAX_TOTAL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_TOTAL_SIZE),
            github_token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            scratch_root,
        }
    }
}
