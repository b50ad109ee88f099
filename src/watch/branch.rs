// src/watch/branch.rs

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::git::Repo;
use crate::metrics::Metrics;
use crate::watch::BranchHook;

/// Default poll interval for the branch list.
pub const BRANCH_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn a watcher over the branch list of one repo.
///
/// On every successful, non-empty listing the hook receives the full current
/// list. Empty listings are treated as transient and swallowed. Errors are
/// counted and logged; the loop continues until the token fires.
pub fn spawn_branch_watcher(
    token: CancellationToken,
    repo: Repo,
    interval: Duration,
    metrics: Arc<Metrics>,
    hook: BranchHook,
) {
    let git_reads = metrics.counter("GitBranchReads");
    let git_errs = metrics.counter("GitBranchErrs");

    tokio::spawn(async move {
        loop {
            if token.is_cancelled() {
                return;
            }

            git_reads.inc(1);
            match repo.list_branches().await {
                Ok(branches) => {
                    if !branches.is_empty() {
                        (*hook)(branches);
                    }
                }
                Err(e) => {
                    git_errs.inc(1);
                    warn!(error = %e, "failed to read branches");
                }
            }

            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    });
}
