// src/metrics/sha_tracker.rs

//! Records the most recently observed SHA per (repo, branch) pair.
//!
//! Commit watchers register here and call the returned recorder every poll
//! iteration. The `/v1/repos` introspection endpoint reads the snapshot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

/// One registered (repo, branch) observation slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub repo: String,
    pub branch: String,
    pub sha: String,
}

#[derive(Default)]
pub struct ShaTracker {
    entries: Arc<Mutex<HashMap<u64, RepoInfo>>>,
    next_key: AtomicU64,
}

/// Recorder handed to a watcher; call with the current SHA each iteration.
pub type ShaRecorder = Box<dyn Fn(String) + Send + Sync>;

impl ShaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observation slot for (repo, branch).
    ///
    /// The slot is removed when `token` is cancelled; updates after
    /// cancellation are dropped.
    pub fn register(&self, token: CancellationToken, repo: &str, branch: &str) -> ShaRecorder {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);

        {
            let mut entries = self.entries.lock().unwrap();
            entries.insert(
                key,
                RepoInfo {
                    repo: repo.to_string(),
                    branch: branch.to_string(),
                    sha: String::new(),
                },
            );
        }

        let entries = Arc::clone(&self.entries);
        {
            let entries = Arc::clone(&entries);
            let token = token.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                entries.lock().unwrap().remove(&key);
            });
        }

        Box::new(move |sha: String| {
            if token.is_cancelled() {
                return;
            }
            if let Some(info) = entries.lock().unwrap().get_mut(&key) {
                info.sha = sha;
            }
        })
    }

    /// Snapshot of all registered observation slots.
    pub fn repo_info(&self) -> Vec<RepoInfo> {
        self.entries.lock().unwrap().values().cloned().collect()
    }
}
