// src/scheduler/submission.rs

//! The task submission record.
//!
//! Each platform task is named `base64(JSON {sha, branch, task_index})`; the
//! platform's task listing is the only cross-process state consulted for
//! deduplication, so this blob is the whole contract.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::errors::{PlanwatchError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStamp {
    pub sha: String,
    pub branch: String,
    /// Absent in records written by older processes; dedup only needs
    /// (sha, branch).
    #[serde(default)]
    pub task_index: usize,
}

impl TaskStamp {
    pub fn new(sha: &str, branch: &str, task_index: usize) -> Self {
        Self {
            sha: sha.to_string(),
            branch: branch.to_string(),
            task_index,
        }
    }

    /// Encode as the platform task name.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| PlanwatchError::Platform(format!("failed to encode task name: {e}")))?;
        Ok(STANDARD.encode(json))
    }

    /// Decode a platform task name. `None` for anything that is not a valid
    /// record (foreign tasks share the namespace).
    pub fn decode(name: &str) -> Option<Self> {
        let bytes = STANDARD.decode(name).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}
