//! Plan reconciliation on one branch: identity-keyed add/remove through the
//! plan scheduler.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use planwatch::config::MetaPlan;
use planwatch::git::RepoRegistry;
use planwatch::metrics::Metrics;
use planwatch::scheduler::{ParameterStore, PlanManager, PlanScheduler, WatcherFactory};
use planwatch::watch::CommitHook;

use planwatch_test_utils::builders::{PlanBuilder, TaskBuilder};
use planwatch_test_utils::fake_git::ScriptedGit;
use planwatch_test_utils::fake_platform::RecordingTaskCreator;
use planwatch_test_utils::fake_staging::FakeInterconnect;
use planwatch_test_utils::init_tracing;

struct ReconcileHarness {
    scheduler: PlanScheduler,
    hooks: Arc<Mutex<Vec<(String, CommitHook)>>>,
    watcher_tokens: Arc<Mutex<Vec<CancellationToken>>>,
    _scratch: tempfile::TempDir,
}

fn reconcile_harness() -> ReconcileHarness {
    init_tracing();

    let metrics = Arc::new(Metrics::new());
    let token = CancellationToken::new();
    let scratch = tempfile::tempdir().unwrap();

    let registry = Arc::new(RepoRegistry::new(
        scratch.path().to_path_buf(),
        Arc::new(ScriptedGit::new()),
        Arc::clone(&metrics),
        token.clone(),
    ));

    let hooks: Arc<Mutex<Vec<(String, CommitHook)>>> = Arc::new(Mutex::new(Vec::new()));
    let watcher_tokens: Arc<Mutex<Vec<CancellationToken>>> = Arc::new(Mutex::new(Vec::new()));

    let factory: WatcherFactory = {
        let hooks = Arc::clone(&hooks);
        let watcher_tokens = Arc::clone(&watcher_tokens);
        Arc::new(move |watch_token, url, _branch, _repo, hook| {
            watcher_tokens.lock().unwrap().push(watch_token);
            hooks.lock().unwrap().push((url, hook));
        })
    };

    let manager = Arc::new(PlanManager::new(
        token,
        "app-guid".to_string(),
        "remotes/origin/master".to_string(),
        Arc::new(RecordingTaskCreator::new()) as _,
        registry,
        Arc::new(|_: &str| None) as ParameterStore,
        Arc::new(FakeInterconnect::new()) as _,
        factory,
        &metrics,
    ));

    ReconcileHarness {
        scheduler: PlanScheduler::new(manager),
        hooks,
        watcher_tokens,
        _scratch: scratch,
    }
}

fn plan(name: &str, parameter: &str) -> MetaPlan {
    PlanBuilder::new(name)
        .repo("a", "git://x/a")
        .task(
            TaskBuilder::new("echo hi")
                .parameter("MODE", parameter)
                .build(),
        )
        .build_meta(false)
}

impl ReconcileHarness {
    fn watcher_count(&self) -> usize {
        self.hooks.lock().unwrap().len()
    }
}

#[tokio::test]
async fn persisting_plans_are_added_once() {
    let h = reconcile_harness();

    h.scheduler.set_plans(vec![plan("p", "fast")]).await;
    h.scheduler.set_plans(vec![plan("p", "fast")]).await;
    h.scheduler.set_plans(vec![plan("p", "fast")]).await;

    assert_eq!(h.watcher_count(), 1);
}

#[tokio::test]
async fn vanished_plans_are_cancelled() {
    let h = reconcile_harness();

    h.scheduler.set_plans(vec![plan("p", "fast")]).await;
    h.scheduler.set_plans(vec![]).await;

    assert!(h.watcher_tokens.lock().unwrap()[0].is_cancelled());
}

#[tokio::test]
async fn identity_change_swaps_the_entry() {
    let h = reconcile_harness();

    h.scheduler.set_plans(vec![plan("p", "fast")]).await;
    h.scheduler.set_plans(vec![plan("p", "slow")]).await;

    // The old identity is torn down; the new one runs.
    assert_eq!(h.watcher_count(), 2);
    let tokens = h.watcher_tokens.lock().unwrap();
    assert!(tokens[0].is_cancelled());
    assert!(!tokens[1].is_cancelled());
}

#[tokio::test]
async fn consumed_do_once_plans_are_not_rearmed_for_the_same_identity() {
    let h = reconcile_harness();

    let meta = PlanBuilder::new("self")
        .repo("config", "git://x/config")
        .task(TaskBuilder::new("echo once").build())
        .build_meta(true);

    h.scheduler.set_plans(vec![meta.clone()]).await;
    assert_eq!(h.watcher_count(), 1);

    // The plan consumes its registration on its first commit.
    let hook = h.hooks.lock().unwrap()[0].1.clone();
    (*hook)("SHA1".to_string()).await;

    // A later config SHA re-lists the same plan definition; it stays
    // consumed.
    h.scheduler.set_plans(vec![meta.clone()]).await;
    assert_eq!(h.watcher_count(), 1);
}
