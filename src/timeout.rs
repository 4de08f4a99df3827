//! Concurrency and timeout harness: a scoped deadline around network and
//! clone work. The clone driver sets `kill_on_drop` on every `git` child it
//! spawns, so a timeout that drops the in-flight future also terminates the
//! subprocess rather than leaving it running in the background.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::defaults::DEFAULT_CLONE_TIMEOUT_SECS;
use crate::error::Error;

/// Default deadline applied to a clone when the caller doesn't override it.
pub fn default_deadline() -> Duration {
    Duration::from_secs(DEFAULT_CLONE_TIMEOUT_SECS)
}

/// Runs `fut` under `deadline`, mapping an elapsed timer to [`Error::TimedOut`].
/// A single deadline wraps the entire clone sequence (clone, sparse-checkout,
/// fetch, checkout, submodule update) rather than each step individually, so a
/// slow first step doesn't leave extra budget for a later one.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(?deadline, "operation exceeded deadline, cancelling");
            Err(Error::TimedOut(deadline))
        }
    }
}
