// src/git/registry.rs

//! Owns the local working clones: exactly one [`Repo`] per URL per process.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::errors::Result;
use crate::git::exec::GitExecutor;
use crate::git::repo::Repo;
use crate::metrics::Metrics;

/// Default fetch interval for source repositories.
pub const SOURCE_FETCH_INTERVAL: Duration = Duration::from_secs(15);

pub struct RepoRegistry {
    scratch_dir: PathBuf,
    exec: Arc<dyn GitExecutor>,
    metrics: Arc<Metrics>,
    token: CancellationToken,

    repos: Mutex<HashMap<String, Repo>>,
}

impl RepoRegistry {
    pub fn new(
        scratch_dir: PathBuf,
        exec: Arc<dyn GitExecutor>,
        metrics: Arc<Metrics>,
        token: CancellationToken,
    ) -> Self {
        Self {
            scratch_dir,
            exec,
            metrics,
            token,
            repos: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch or create the repo for `url` with the default fetch interval.
    pub async fn fetch_repo(&self, url: &str) -> Result<Repo> {
        self.fetch_repo_with_interval(url, SOURCE_FETCH_INTERVAL)
            .await
    }

    /// Fetch or create the repo for `url`, fetching on `interval`.
    ///
    /// The interval only applies when this call creates the entry; a repo
    /// that already exists keeps the interval it was created with.
    pub async fn fetch_repo_with_interval(&self, url: &str, interval: Duration) -> Result<Repo> {
        let mut repos = self.repos.lock().await;

        if let Some(repo) = repos.get(url) {
            return Ok(repo.clone());
        }

        let repo = Repo::open(
            url,
            &self.scratch_dir,
            interval,
            Arc::clone(&self.exec),
            Arc::clone(&self.metrics),
            self.token.child_token(),
        )
        .await?;
        repos.insert(url.to_string(), repo.clone());

        Ok(repo)
    }

    /// All repos created so far.
    pub async fn list_repos(&self) -> Vec<Repo> {
        self.repos.lock().await.values().cloned().collect()
    }
}
