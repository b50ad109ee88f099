// src/git/exec.rs

//! Subprocess adapter for the local `git` binary.
//!
//! Everything the engine knows about git goes through [`GitExecutor`], so
//! tests can substitute a scripted fake and never touch a real repository.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::errors::{PlanwatchError, Result};

/// Runs a command in a working directory and returns stdout split into lines.
#[async_trait]
pub trait GitExecutor: Send + Sync {
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<Vec<String>>;
}

/// Production executor: spawns the real `git` binary.
///
/// `GIT_TERMINAL_PROMPT=0` is set so a missing credential fails the command
/// instead of hanging the poll loop on a password prompt.
#[derive(Default)]
pub struct SystemGitExecutor;

impl SystemGitExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GitExecutor for SystemGitExecutor {
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<Vec<String>> {
        debug!(dir = %dir.display(), ?args, "running git");

        let output = Command::new(args[0])
            .args(&args[1..])
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|e| PlanwatchError::Git(format!("failed to spawn {:?}: {e}", args)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlanwatchError::Git(format!(
                "{:?} exited with {}: {}",
                args,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().map(|l| l.to_string()).collect())
    }
}
