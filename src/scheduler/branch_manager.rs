// src/scheduler/branch_manager.rs

//! Per-branch lifecycle: one cancellation token per tracked branch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Callback that brings up the per-branch pipeline.
pub type OnBranchStart = Arc<dyn Fn(CancellationToken, String) + Send + Sync>;

pub struct BranchManager {
    parent: CancellationToken,
    on_start: OnBranchStart,
    tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl BranchManager {
    pub fn new(parent: CancellationToken, on_start: OnBranchStart) -> Self {
        Self {
            parent,
            on_start,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Start tracking a branch. Idempotent: a branch already present is a
    /// no-op, so the same branch is never started twice without an
    /// intervening [`remove`](Self::remove).
    pub fn add(&self, branch: &str) {
        let token = {
            let mut tokens = self.tokens.lock().unwrap();
            if tokens.contains_key(branch) {
                return;
            }

            let token = self.parent.child_token();
            tokens.insert(branch.to_string(), token.clone());
            token
        };

        info!(branch = %branch, "tracking branch");
        (*self.on_start)(token, branch.to_string());
    }

    /// Stop tracking a branch, cancelling everything under it.
    pub fn remove(&self, branch: &str) {
        let token = self.tokens.lock().unwrap().remove(branch);
        if let Some(token) = token {
            info!(branch = %branch, "dropping branch");
            token.cancel();
        }
    }
}
