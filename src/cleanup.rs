//! Scratch-directory cleanup worker: a long-running task, started only by
//! the HTTP server, that scans the shared temp root periodically and reaps
//! directories a crashed or cancelled request failed to remove through its
//! own unconditional cleanup (`ingest::cleanup_scratch`). Well-behaved
//! requests leave nothing for this worker to find; it is a backstop, not the
//! primary cleanup path.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::io::AsyncWriteExt;
use tracing::{error, warn};

use crate::defaults::{CLEANUP_SCAN_INTERVAL_SECS, CLEANUP_STALE_AGE_SECS};

/// Scan cadence.
pub const SCAN_INTERVAL: Duration = Duration::from_secs(CLEANUP_SCAN_INTERVAL_SECS);
/// Staleness threshold: a scratch directory older than this is considered abandoned.
pub const STALE_AGE: Duration = Duration::from_secs(CLEANUP_STALE_AGE_SECS);

/// Spawns the worker as a background task. Runs until the process exits;
/// a sweep failure is logged and does not halt the loop.
pub fn spawn(scratch_root: PathBuf, history_path: PathBuf) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SCAN_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = sweep(&scratch_root, &history_path).await {
                warn!(error = %e, root = %scratch_root.display(), "cleanup sweep failed");
            }
        }
    })
}

/// One scan pass: every directory directly under `scratch_root` older than
/// [`STALE_AGE`] has its owner/repo recorded (if discoverable) and is removed.
async fn sweep(scratch_root: &Path, history_path: &Path) -> std::io::Result<()> {
    let mut rd = match tokio::fs::read_dir(scratch_root).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        let Ok(file_type) = entry.file_type().await else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }
        if !is_stale(&entry).await {
            continue;
        }

        if let Some(owner_repo) = find_owner_repo(&path).await
            && let Err(e) = append_history(history_path, &owner_repo).await
        {
            error!(error = %e, path = %path.display(), "failed to append cleanup history");
        }

        if let Err(e) = tokio::fs::remove_dir_all(&path).await {
            error!(error = %e, path = %path.display(), "failed to remove stale scratch directory");
        }
    }
    Ok(())
}

async fn is_stale(entry: &tokio::fs::DirEntry) -> bool {
    let Ok(meta) = entry.metadata().await else {
        return false;
    };
    let Ok(modified) = meta.modified() else {
        return false;
    };
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age >= STALE_AGE)
        .unwrap_or(false)
}

/// Finds the first `*.txt` file directly under `dir` and extracts the
/// "Repository: owner/repo" line it is expected to carry. Returns `None` if
/// no such file or line exists — the directory is still removed, just
/// without a history entry.
async fn find_owner_repo(dir: &Path) -> Option<String> {
    let mut rd = tokio::fs::read_dir(dir).await.ok()?;
    while let Ok(Some(entry)) = rd.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        let Ok(text) = tokio::fs::read_to_string(&path).await else {
            continue;
        };
        if let Some(owner_repo) = extract_repository_line(&text) {
            return Some(owner_repo);
        }
    }
    None
}

fn extract_repository_line(text: &str) -> Option<String> {
    text.lines()
        .find_map(|line| line.strip_prefix("Repository: "))
        .map(|s| s.trim().to_string())
}

async fn append_history(history_path: &Path, owner_repo: &str) -> std::io::Result<()> {
    if let Some(parent) = history_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(history_path)
        .await?;
    file.write_all(format!("{owner_repo}\n").as_bytes()).await
}
