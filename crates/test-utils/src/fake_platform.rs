//! Recording task creator: captures submissions, serves a scripted task
//! list, and can be told to fail.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use planwatch::errors::{PlanwatchError, Result};
use planwatch::scheduler::TaskCreator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTask {
    pub command: String,
    pub name: String,
    pub app_guid: String,
}

#[derive(Default)]
pub struct RecordingTaskCreator {
    created: Mutex<Vec<CreatedTask>>,
    listed: Mutex<Vec<String>>,
    fail_create: AtomicBool,
    fail_list: AtomicBool,
}

impl RecordingTaskCreator {
    pub fn new() -> Self {
        Self::default()
    }

    /// What `list_tasks` should return.
    pub fn set_listed(&self, names: Vec<String>) {
        *self.listed.lock().unwrap() = names;
    }

    /// Make every `create_task` call fail until reset.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make every `list_tasks` call fail until reset.
    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<CreatedTask> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskCreator for RecordingTaskCreator {
    async fn create_task(&self, command: &str, name: &str, app_guid: &str) -> Result<()> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(PlanwatchError::Platform("scripted create failure".into()));
        }

        self.created.lock().unwrap().push(CreatedTask {
            command: command.to_string(),
            name: name.to_string(),
            app_guid: app_guid.to_string(),
        });
        Ok(())
    }

    async fn list_tasks(&self, _app_guid: &str) -> Result<Vec<String>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(PlanwatchError::Platform("scripted list failure".into()));
        }

        Ok(self.listed.lock().unwrap().clone())
    }
}
