// src/watch/mod.rs

//! Polling watchers over the git facade.
//!
//! A commit watcher polls one (repo, branch) tip and fires a hook when the
//! SHA changes; a branch watcher polls the branch list of one repo. Both run
//! as spawned tasks until their cancellation token fires, and both absorb
//! transient git errors by retrying at the next interval.

pub mod branch;
pub mod commit;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use branch::spawn_branch_watcher;
pub use commit::spawn_commit_watcher;

/// Hook invoked with the new SHA whenever a watched branch tip changes.
///
/// The watcher awaits the returned future before polling again, so a plan
/// run blocks its own watcher but never anyone else's.
pub type CommitHook =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Hook invoked with the full branch list on every successful poll.
pub type BranchHook = Arc<dyn Fn(Vec<String>) + Send + Sync>;
