//! Scripted git executor.
//!
//! Responses are keyed by git subcommand (`rev-parse`, `branch`, `show`,
//! `clone`, `fetch`). Queued responses are consumed first; after the queue
//! drains, the sticky default for the subcommand answers every call.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use planwatch::errors::{PlanwatchError, Result};
use planwatch::git::GitExecutor;

type Scripted = std::result::Result<Vec<String>, String>;

#[derive(Default)]
pub struct ScriptedGit {
    queued: Mutex<HashMap<String, VecDeque<Scripted>>>,
    defaults: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot successful response for a subcommand.
    pub fn push_response(&self, subcommand: &str, lines: &[&str]) {
        self.queued
            .lock()
            .unwrap()
            .entry(subcommand.to_string())
            .or_default()
            .push_back(Ok(lines.iter().map(|l| l.to_string()).collect()));
    }

    /// Queue a one-shot error for a subcommand.
    pub fn push_error(&self, subcommand: &str, message: &str) {
        self.queued
            .lock()
            .unwrap()
            .entry(subcommand.to_string())
            .or_default()
            .push_back(Err(message.to_string()));
    }

    /// Set the sticky default response for a subcommand.
    pub fn set_default(&self, subcommand: &str, lines: &[&str]) {
        self.defaults.lock().unwrap().insert(
            subcommand.to_string(),
            Ok(lines.iter().map(|l| l.to_string()).collect()),
        );
    }

    /// Every invocation seen so far, as full argv vectors.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of invocations of one subcommand.
    pub fn call_count(&self, subcommand: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|args| args.get(1).map(String::as_str) == Some(subcommand))
            .count()
    }
}

#[async_trait]
impl GitExecutor for ScriptedGit {
    async fn run(&self, _dir: &Path, args: &[&str]) -> Result<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .push(args.iter().map(|a| a.to_string()).collect());

        let subcommand = args.get(1).copied().unwrap_or_default().to_string();

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&subcommand)
            .and_then(|q| q.pop_front());

        let scripted = match queued {
            Some(scripted) => scripted,
            None => self
                .defaults
                .lock()
                .unwrap()
                .get(&subcommand)
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new())),
        };

        scripted.map_err(PlanwatchError::Git)
    }
}
