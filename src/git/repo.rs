// src/git/repo.rs

//! One local working clone, plus its background fetch loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{PlanwatchError, Result};
use crate::git::exec::GitExecutor;
use crate::metrics::{Counter, Metrics};

/// Directory name for a clone: URL-safe base64 of the URL, no padding.
pub fn workdir_name(url: &str) -> String {
    URL_SAFE_NO_PAD.encode(url.as_bytes())
}

struct Inner {
    exec: Arc<dyn GitExecutor>,
    workdir: PathBuf,

    /// Query operations hold this in read mode; the periodic
    /// `git fetch --all` holds it in write mode.
    lock: RwLock<()>,

    fetch_success: Counter,
    fetch_failure: Counter,
    sha_success: Counter,
    sha_failure: Counter,
    file_success: Counter,
    file_failure: Counter,
    branches_success: Counter,
    branches_failure: Counter,
}

/// Handle to one working clone. Cheap to clone; all handles share the tree
/// lock, so queries never race the background fetch.
#[derive(Clone)]
pub struct Repo {
    inner: Arc<Inner>,
}

impl Repo {
    /// Open (cloning if needed) the repository at `url` under `scratch_dir`,
    /// and start the background fetch loop on `interval`.
    ///
    /// Clone failure is returned to the caller; nothing is spawned in that
    /// case, so a later attempt can retry.
    pub async fn open(
        url: &str,
        scratch_dir: &std::path::Path,
        interval: Duration,
        exec: Arc<dyn GitExecutor>,
        metrics: Arc<Metrics>,
        token: CancellationToken,
    ) -> Result<Self> {
        let dir_name = workdir_name(url);
        let workdir = scratch_dir.join(&dir_name);

        if !workdir.exists() {
            exec.run(scratch_dir, &["git", "clone", url, &dir_name])
                .await?;
        }

        let repo = Self {
            inner: Arc::new(Inner {
                exec,
                workdir,
                lock: RwLock::new(()),
                fetch_success: metrics.counter("GitFetchAllSuccess"),
                fetch_failure: metrics.counter("GitFetchAllFailure"),
                sha_success: metrics.counter("GitSHASuccess"),
                sha_failure: metrics.counter("GitSHAFailure"),
                file_success: metrics.counter("GitFileSuccess"),
                file_failure: metrics.counter("GitFileFailure"),
                branches_success: metrics.counter("GitBranchesSuccess"),
                branches_failure: metrics.counter("GitBranchesFailure"),
            }),
        };

        repo.clone().spawn_fetch_loop(interval, token);

        Ok(repo)
    }

    /// `git rev-parse <branch>`; errors on subprocess failure or empty output.
    pub async fn sha(&self, branch: &str) -> Result<String> {
        let _guard = self.inner.lock.read().await;

        let result = self
            .inner
            .exec
            .run(&self.inner.workdir, &["git", "rev-parse", branch])
            .await;

        match result {
            Ok(lines) => match lines.first() {
                Some(sha) if !sha.is_empty() => {
                    self.inner.sha_success.inc(1);
                    Ok(sha.clone())
                }
                _ => {
                    self.inner.sha_failure.inc(1);
                    Err(PlanwatchError::Git(format!(
                        "rev-parse {branch} returned empty output"
                    )))
                }
            },
            Err(e) => {
                self.inner.sha_failure.inc(1);
                Err(PlanwatchError::Git(format!(
                    "|{}| {branch}: {e}",
                    self.inner.workdir.display()
                )))
            }
        }
    }

    /// `git show <sha>:<path>`, lines joined with `\n`.
    pub async fn file(&self, sha: &str, file_path: &str) -> Result<String> {
        let _guard = self.inner.lock.read().await;

        let spec = format!("{sha}:{file_path}");
        let result = self
            .inner
            .exec
            .run(&self.inner.workdir, &["git", "show", &spec])
            .await;

        match result {
            Ok(lines) => {
                self.inner.file_success.inc(1);
                Ok(lines.join("\n"))
            }
            Err(e) => {
                self.inner.file_failure.inc(1);
                Err(e)
            }
        }
    }

    /// `git branch -a`, trimmed, keeping only `remotes/origin` lines and
    /// discarding `->` HEAD aliases.
    pub async fn list_branches(&self) -> Result<Vec<String>> {
        let _guard = self.inner.lock.read().await;

        let result = self
            .inner
            .exec
            .run(&self.inner.workdir, &["git", "branch", "-a"])
            .await;

        match result {
            Ok(lines) => {
                self.inner.branches_success.inc(1);
                Ok(lines
                    .iter()
                    .map(|l| l.trim())
                    .filter(|l| l.starts_with("remotes/origin") && !l.contains("->"))
                    .map(|l| l.to_string())
                    .collect())
            }
            Err(e) => {
                self.inner.branches_failure.inc(1);
                Err(e)
            }
        }
    }

    fn spawn_fetch_loop(self, interval: Duration, token: CancellationToken) {
        tokio::spawn(async move {
            loop {
                if token.is_cancelled() {
                    debug!(dir = %self.inner.workdir.display(), "fetch loop stopping");
                    return;
                }

                {
                    let _guard = self.inner.lock.write().await;
                    match self
                        .inner
                        .exec
                        .run(&self.inner.workdir, &["git", "fetch", "--all"])
                        .await
                    {
                        Ok(_) => self.inner.fetch_success.inc(1),
                        Err(e) => {
                            self.inner.fetch_failure.inc(1);
                            warn!(
                                dir = %self.inner.workdir.display(),
                                error = %e,
                                "git fetch --all failed"
                            );
                        }
                    }
                }

                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        });
    }
}
