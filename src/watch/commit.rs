// src/watch/commit.rs

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::git::Repo;
use crate::metrics::{Metrics, ShaTracker};
use crate::watch::CommitHook;

/// Default poll interval for branch tips.
pub const COMMIT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Spawn a watcher over one (repo, branch).
///
/// Every iteration reads the branch tip; a changed, non-empty SHA fires
/// `hook` (the first SHA ever observed counts as a change). The current SHA
/// is recorded with the tracker every iteration, changed or not. Errors are
/// counted and logged, never terminal; cancellation is observed at the top
/// of each iteration.
pub fn spawn_commit_watcher(
    token: CancellationToken,
    repo_url: String,
    branch: String,
    repo: Repo,
    interval: Duration,
    tracker: Arc<ShaTracker>,
    metrics: Arc<Metrics>,
    hook: CommitHook,
) {
    let record = tracker.register(token.clone(), &repo_url, &branch);
    let git_reads = metrics.counter("GitReads");
    let git_errs = metrics.counter("GitErrs");

    tokio::spawn(async move {
        let mut last = String::new();

        loop {
            if token.is_cancelled() {
                return;
            }

            git_reads.inc(1);
            match repo.sha(&branch).await {
                Ok(sha) => {
                    if !sha.is_empty() && sha != last {
                        last = sha.clone();
                        (*hook)(sha).await;
                    }
                }
                Err(e) => {
                    git_errs.inc(1);
                    warn!(repo = %repo_url, branch = %branch, error = %e, "failed to read SHA");
                }
            }

            record(last.clone());

            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    });
}
