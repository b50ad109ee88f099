// src/scheduler/branch_scheduler.rs

//! Reconciles the observed branch list against the tracked set.

use std::sync::{Arc, Mutex};

use crate::scheduler::branch_manager::BranchManager;

pub struct BranchScheduler {
    manager: Arc<BranchManager>,
    current: Mutex<Vec<String>>,
}

impl BranchScheduler {
    pub fn new(manager: Arc<BranchManager>) -> Self {
        Self {
            manager,
            current: Mutex::new(Vec::new()),
        }
    }

    /// Reconcile against a fresh branch listing.
    ///
    /// New branches are added strictly before vanished branches are removed,
    /// and the whole reconciliation is serialised under one lock.
    pub fn set_branches(&self, branches: Vec<String>) {
        let mut current = self.current.lock().unwrap();

        for branch in &branches {
            if !current.contains(branch) {
                self.manager.add(branch);
            }
        }

        for branch in current.iter() {
            if !branches.contains(branch) {
                self.manager.remove(branch);
            }
        }

        *current = branches;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn scheduler_with_log() -> (BranchScheduler, Arc<Mutex<Vec<String>>>) {
        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let add_log = Arc::clone(&log);
        let manager = Arc::new(BranchManager::new(
            CancellationToken::new(),
            Arc::new(move |_token, branch| {
                add_log.lock().unwrap().push(format!("add:{branch}"));
            }),
        ));

        (BranchScheduler::new(manager), log)
    }

    #[test]
    fn adds_new_branches_once() {
        let (sched, log) = scheduler_with_log();

        sched.set_branches(vec!["remotes/origin/a".to_string()]);
        sched.set_branches(vec!["remotes/origin/a".to_string()]);

        assert_eq!(*log.lock().unwrap(), ["add:remotes/origin/a"]);
    }

    #[test]
    fn vanished_branches_are_removed() {
        let (sched, log) = scheduler_with_log();

        sched.set_branches(vec![
            "remotes/origin/a".to_string(),
            "remotes/origin/b".to_string(),
        ]);
        sched.set_branches(vec!["remotes/origin/b".to_string()]);

        // Removing "a" re-adding nothing: the add log stays as-is.
        assert_eq!(
            *log.lock().unwrap(),
            ["add:remotes/origin/a", "add:remotes/origin/b"]
        );

        // Re-listing "a" adds it again, proving the removal took.
        sched.set_branches(vec![
            "remotes/origin/a".to_string(),
            "remotes/origin/b".to_string(),
        ]);
        assert_eq!(
            *log.lock().unwrap(),
            [
                "add:remotes/origin/a",
                "add:remotes/origin/b",
                "add:remotes/origin/a"
            ]
        );
    }

    #[test]
    fn empty_list_clears_everything() {
        let (sched, log) = scheduler_with_log();

        sched.set_branches(vec!["remotes/origin/a".to_string()]);
        sched.set_branches(vec![]);
        sched.set_branches(vec!["remotes/origin/a".to_string()]);

        assert_eq!(
            *log.lock().unwrap(),
            ["add:remotes/origin/a", "add:remotes/origin/a"]
        );
    }
}
