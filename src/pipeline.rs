// src/pipeline.rs

//! Per-branch plan pipeline.
//!
//! For one branch of the configuration repository: re-read the plan YAML
//! whenever that branch's SHA changes, and reconcile the branch's plan
//! manager against the declared plans.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::loader::{load_plan_file, meta_plans};
use crate::errors::PlanwatchError;
use crate::git::{Repo, RepoRegistry};
use crate::metrics::{Metrics, ShaTracker};
use crate::scheduler::{
    Interconnect, ParameterStore, PlanManager, PlanScheduler, TaskCreator, WatcherFactory,
};
use crate::watch::{spawn_commit_watcher, CommitHook};

/// Everything a branch pipeline needs; one instance serves all branches.
pub struct Pipeline {
    pub app_guid: String,
    pub config_repo_url: String,
    pub plan_path: String,

    pub config_repo: Repo,
    pub registry: Arc<RepoRegistry>,
    pub tasks: Arc<dyn TaskCreator>,
    pub params: ParameterStore,
    pub tracker: Arc<ShaTracker>,
    pub staging: Arc<dyn Interconnect>,
    pub metrics: Arc<Metrics>,

    /// Cancelled to abort the engine loud on an invalid plan configuration.
    pub root: CancellationToken,

    /// Set before `root` is cancelled so the process can exit non-zero.
    pub config_failure: Arc<AtomicBool>,

    /// Poll interval for source repo branch tips.
    pub commit_poll_interval: Duration,
    /// Poll interval for the configuration repo's plan file.
    pub config_poll_interval: Duration,
}

impl Pipeline {
    /// Bring up the pipeline for one branch; everything it spawns lives
    /// under `token`.
    pub fn start_branch(self: &Arc<Self>, token: CancellationToken, branch: String) {
        info!(branch = %branch, "watching branch");

        let manager = Arc::new(PlanManager::new(
            token.clone(),
            self.app_guid.clone(),
            branch.clone(),
            Arc::clone(&self.tasks),
            Arc::clone(&self.registry),
            Arc::clone(&self.params),
            Arc::clone(&self.staging),
            self.watcher_factory(),
            &self.metrics,
        ));
        let scheduler = Arc::new(PlanScheduler::new(manager));

        let successful_config = self.metrics.counter("SuccessfulConfig");
        let failed_config = self.metrics.counter("FailedConfig");

        let pipeline = Arc::clone(self);
        let hook_branch = branch.clone();
        let hook: CommitHook = Arc::new(move |sha: String| {
            let pipeline = Arc::clone(&pipeline);
            let scheduler = Arc::clone(&scheduler);
            let branch = hook_branch.clone();
            let successful_config = successful_config.clone();
            let failed_config = failed_config.clone();

            Box::pin(async move {
                let file = match load_plan_file(&pipeline.config_repo, &sha, &pipeline.plan_path)
                    .await
                {
                    Ok(file) => file,
                    Err(e @ (PlanwatchError::Config(_) | PlanwatchError::Yaml(_))) => {
                        // A malformed or invalid plan file can never be run
                        // faithfully; abort the engine rather than silently
                        // dropping plans.
                        error!(branch = %branch, sha = %sha, error = %e, "invalid plan configuration");
                        failed_config.inc(1);
                        pipeline.config_failure.store(true, Ordering::SeqCst);
                        pipeline.root.cancel();
                        return;
                    }
                    Err(e) => {
                        // Transient fetch failure; keep the plans from the
                        // last good configuration.
                        failed_config.inc(1);
                        warn!(branch = %branch, sha = %sha, error = %e, "failed to load plan file");
                        return;
                    }
                };

                successful_config.inc(1);
                let metas = meta_plans(file, &pipeline.config_repo_url);
                scheduler.set_plans(metas).await;
            })
        });

        spawn_commit_watcher(
            token,
            self.config_repo_url.clone(),
            branch,
            self.config_repo.clone(),
            self.config_poll_interval,
            Arc::clone(&self.tracker),
            Arc::clone(&self.metrics),
            hook,
        );
    }

    /// Production commit watcher factory for plan-referenced repos.
    fn watcher_factory(self: &Arc<Self>) -> WatcherFactory {
        let pipeline = Arc::clone(self);
        Arc::new(move |token, repo_url, branch, repo, hook| {
            spawn_commit_watcher(
                token,
                repo_url,
                branch,
                repo,
                pipeline.commit_poll_interval,
                Arc::clone(&pipeline.tracker),
                Arc::clone(&pipeline.metrics),
                hook,
            );
        })
    }
}
