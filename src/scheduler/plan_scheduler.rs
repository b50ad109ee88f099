// src/scheduler/plan_scheduler.rs

//! Reconciles the plans declared on one branch against the running set.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::model::MetaPlan;
use crate::scheduler::ident::plan_key;
use crate::scheduler::plan_manager::PlanManager;

pub struct PlanScheduler {
    manager: Arc<PlanManager>,
    current: Mutex<Vec<MetaPlan>>,
}

impl PlanScheduler {
    pub fn new(manager: Arc<PlanManager>) -> Self {
        Self {
            manager,
            current: Mutex::new(Vec::new()),
        }
    }

    /// Reconcile against a freshly loaded plan list.
    ///
    /// Plans are compared by canonical identity: unknown identities are
    /// added, vanished identities are removed, persisting identities are
    /// left untouched. A consumed `do_once` plan stays in the tracked list,
    /// so it re-arms only when its definition (identity) changes.
    pub async fn set_plans(&self, plans: Vec<MetaPlan>) {
        let mut current = self.current.lock().await;

        for meta in &plans {
            let key = plan_key(meta);
            if current.iter().any(|c| plan_key(c) == key) {
                continue;
            }
            self.manager.add(meta.clone()).await;
        }

        for old in current.iter() {
            let key = plan_key(old);
            if !plans.iter().any(|p| plan_key(p) == key) {
                self.manager.remove(old);
            }
        }

        *current = plans;
    }
}
