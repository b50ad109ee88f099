// src/scheduler/plan_manager.rs

//! The scheduler core: owns the lifecycle of plans on one branch, fans out
//! commit watchers per referenced repo, dedupes against the platform's task
//! list, and launches task chains with staged input/output hand-off.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::model::MetaPlan;
use crate::errors::Result;
use crate::git::{Repo, RepoRegistry};
use crate::metrics::{Counter, Metrics};
use crate::scheduler::ident::{plan_key, PlanKey};
use crate::scheduler::script::{build_task_script, StagingEndpoint};
use crate::scheduler::submission::TaskStamp;
use crate::watch::CommitHook;

/// Looks up `((KEY))` parameter references; `None` means "omit".
pub type ParameterStore = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Facade over the platform's task API.
#[async_trait]
pub trait TaskCreator: Send + Sync {
    async fn create_task(&self, command: &str, name: &str, app_guid: &str) -> Result<()>;

    async fn list_tasks(&self, app_guid: &str) -> Result<Vec<String>>;
}

/// Allocates transient staging endpoints tied to a cancellation token.
pub trait Interconnect: Send + Sync {
    fn init_interconnect(&self, token: &CancellationToken) -> String;
}

/// Starts a commit watcher for (repo, branch) firing `hook` on new SHAs.
///
/// Injectable so tests can fire commits without polling real repositories.
pub type WatcherFactory =
    Arc<dyn Fn(CancellationToken, String, String, Repo, CommitHook) + Send + Sync>;

pub struct PlanManager {
    app_guid: String,
    branch: String,

    /// Branch-level token; plan tokens are children of this.
    parent: CancellationToken,

    tasks: Arc<dyn TaskCreator>,
    registry: Arc<RepoRegistry>,
    params: ParameterStore,
    staging: Arc<dyn Interconnect>,
    start_watcher: WatcherFactory,

    successful_tasks: Counter,
    failed_tasks: Counter,
    deduped_tasks: Counter,
    failed_repos: Counter,

    entries: Mutex<HashMap<PlanKey, CancellationToken>>,
}

impl PlanManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        parent: CancellationToken,
        app_guid: String,
        branch: String,
        tasks: Arc<dyn TaskCreator>,
        registry: Arc<RepoRegistry>,
        params: ParameterStore,
        staging: Arc<dyn Interconnect>,
        start_watcher: WatcherFactory,
        metrics: &Metrics,
    ) -> Self {
        Self {
            parent,
            app_guid,
            branch,
            tasks,
            registry,
            params,
            staging,
            start_watcher,
            successful_tasks: metrics.counter("SuccessfulTasks"),
            failed_tasks: metrics.counter("FailedTasks"),
            deduped_tasks: metrics.counter("DedupedTasks"),
            failed_repos: metrics.counter("FailedRepos"),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register a plan and start one commit watcher per referenced repo.
    ///
    /// Idempotent per canonical identity. A repo that cannot be fetched
    /// aborts this plan's setup; other plans are unaffected.
    pub async fn add(self: &Arc<Self>, meta: MetaPlan) {
        let key = plan_key(&meta);

        let token = {
            let mut entries = self.entries.lock().unwrap();
            if entries.contains_key(&key) {
                return;
            }
            let token = self.parent.child_token();
            entries.insert(key.clone(), token.clone());
            token
        };

        info!(plan = %meta.plan.name, branch = %self.branch, "registering plan");

        // Serialises commit events arriving from different repos referenced
        // by the same plan.
        let run_lock = Arc::new(tokio::sync::Mutex::new(()));

        for url in meta.plan.repo_paths.values() {
            let repo = match self.registry.fetch_repo(url).await {
                Ok(repo) => repo,
                Err(e) => {
                    self.failed_repos.inc(1);
                    warn!(repo = %url, error = %e, "failed to fetch repo; aborting plan setup");
                    return;
                }
            };

            let manager = Arc::clone(self);
            let hook_meta = meta.clone();
            let hook_lock = Arc::clone(&run_lock);
            let hook: CommitHook = Arc::new(move |sha: String| {
                let manager = Arc::clone(&manager);
                let meta = hook_meta.clone();
                let run_lock = Arc::clone(&hook_lock);
                Box::pin(async move {
                    manager.run_plan_for_sha(&meta, &run_lock, &sha).await;
                })
            });

            (*self.start_watcher)(
                token.clone(),
                url.clone(),
                self.branch.clone(),
                repo,
                hook,
            );
        }
    }

    /// Deregister a plan, cancelling its commit watchers.
    pub fn remove(&self, meta: &MetaPlan) {
        self.check_and_remove(&plan_key(meta), true);
    }

    /// Returns false if the plan is not registered. When `remove` is true
    /// and the plan is registered, the registration is taken out and its
    /// token cancelled.
    fn check_and_remove(&self, key: &PlanKey, remove: bool) -> bool {
        let mut entries = self.entries.lock().unwrap();

        if !remove {
            return entries.contains_key(key);
        }

        match entries.remove(key) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Execute one commit event for one plan.
    async fn run_plan_for_sha(
        &self,
        meta: &MetaPlan,
        run_lock: &tokio::sync::Mutex<()>,
        sha: &str,
    ) {
        // Gate: drop events for plans cancelled between callback scheduling
        // and execution. A do_once plan consumes its registration here so no
        // later commit on any of its repos re-triggers it.
        if !self.check_and_remove(&plan_key(meta), meta.do_once) {
            return;
        }

        match self.is_duplicate(sha).await {
            Ok(true) => {
                info!(sha = %sha, branch = %self.branch, "skipping already-submitted commit");
                self.deduped_tasks.inc(1);
                return;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(sha = %sha, error = %e, "failed deduping tasks; aborting commit event");
                return;
            }
        }

        let _guard = run_lock.lock().await;

        // The run token owns every staging endpoint allocated below; the
        // drop guard tears them down when this function returns. It hangs
        // off the branch token rather than the plan token so a consumed
        // do_once registration does not kill its own staging mid-run.
        let run_token = self.parent.child_token();
        let _run_guard = run_token.clone().drop_guard();

        let Some((inputs, outputs)) = self.build_io_chain(meta, &run_token) else {
            return;
        };

        for (i, task) in meta.plan.tasks.iter().enumerate() {
            if !task.branch_guard.is_empty() && task.branch_guard != self.branch {
                info!(
                    sha = %sha,
                    branch = %self.branch,
                    guard = %task.branch_guard,
                    "branch guard unmatched; skipping task"
                );
                continue;
            }

            let staged_in = inputs[i].as_ref();
            let staged_out = outputs[i].as_ref();
            if !self.submit_task(meta, task, i, sha, staged_in, staged_out).await {
                return;
            }
        }
    }

    /// Compute per-task input/output staging for one run.
    ///
    /// `None` as a whole means the chain shape is broken (a task wants input
    /// the previous task never produces); validation rejects that statically,
    /// so hitting it here is a defect worth a loud log.
    fn build_io_chain(
        &self,
        meta: &MetaPlan,
        run_token: &CancellationToken,
    ) -> Option<(Vec<Option<StagingEndpoint>>, Vec<Option<StagingEndpoint>>)> {
        let mut inputs: Vec<Option<StagingEndpoint>> = Vec::new();
        let mut outputs: Vec<Option<StagingEndpoint>> = Vec::new();

        for (i, task) in meta.plan.tasks.iter().enumerate() {
            let prev_output = i.checked_sub(1).and_then(|p| outputs[p].clone());

            let input = match prev_output {
                Some(prev) if !task.input.is_empty() => Some(StagingEndpoint {
                    url: prev.url,
                    name: task.input.clone(),
                    from_name: prev.name,
                }),
                Some(_) => None,
                None if task.input.is_empty() => None,
                None => {
                    error!(
                        plan = %meta.plan.name,
                        task = %task.name,
                        input = %task.input,
                        "task declares an input but the previous task has no output"
                    );
                    return None;
                }
            };
            inputs.push(input);

            let output = if task.output.is_empty() {
                None
            } else {
                Some(StagingEndpoint {
                    url: self.staging.init_interconnect(run_token),
                    name: task.output.clone(),
                    from_name: String::new(),
                })
            };
            outputs.push(output);
        }

        Some((inputs, outputs))
    }

    /// Submit one task; returns false when the chain must stop.
    async fn submit_task(
        &self,
        meta: &MetaPlan,
        task: &crate::config::model::Task,
        task_index: usize,
        sha: &str,
        input: Option<&StagingEndpoint>,
        output: Option<&StagingEndpoint>,
    ) -> bool {
        info!(sha = %sha, branch = %self.branch, task_index, "starting task");

        let name = match TaskStamp::new(sha, &self.branch, task_index).encode() {
            Ok(name) => name,
            Err(e) => {
                warn!(sha = %sha, error = %e, "failed to encode task name");
                return false;
            }
        };

        let params = Arc::clone(&self.params);
        let script = build_task_script(
            &meta.plan,
            task,
            &self.branch,
            &move |key: &str| (*params)(key),
            input,
            output,
        );

        match self
            .tasks
            .create_task(&script, &name, &self.app_guid)
            .await
        {
            Ok(()) => {
                info!(sha = %sha, branch = %self.branch, task_index, "task submitted");
                self.successful_tasks.inc(1);
                true
            }
            Err(e) => {
                warn!(sha = %sha, branch = %self.branch, task_index, error = %e, "task submission failed");
                self.failed_tasks.inc(1);
                false
            }
        }
    }

    /// True when the platform already has a task for (branch, sha).
    async fn is_duplicate(&self, sha: &str) -> Result<bool> {
        let names = self.tasks.list_tasks(&self.app_guid).await?;

        Ok(names
            .iter()
            .filter_map(|name| TaskStamp::decode(name))
            .any(|stamp| stamp.branch == self.branch && stamp.sha == sha))
    }
}
