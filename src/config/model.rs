// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level plan configuration as read from the YAML file in the
/// configuration repository:
///
/// ```yaml
/// plans:
///   - name: build-and-deploy
///     repo_paths:
///       app: git://host/app
///     tasks:
///       - name: build
///         command: make all
///         output: artifacts
///       - name: deploy
///         command: ./deploy.sh
///         input: artifacts
///         parameters:
///           TARGET: ((DEPLOY_TARGET))
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanFile {
    #[serde(default)]
    pub plans: Vec<Plan>,
}

/// A named, ordered pipeline of tasks plus the repos it watches.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Plan {
    #[serde(default)]
    pub name: String,

    /// alias -> git URL. A plan with no repos is skipped.
    #[serde(default)]
    pub repo_paths: BTreeMap<String, String>,

    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// One shell-script invocation within a plan.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Task {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub command: String,

    /// Directory name this task expects from the previous task's output.
    #[serde(default)]
    pub input: String,

    /// Directory name this task produces for the next task.
    #[serde(default)]
    pub output: String,

    /// Values of the form `((KEY))` resolve through the parameter store;
    /// anything else is exported literally.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    /// If set and unequal to the executing branch, the task is skipped.
    #[serde(default)]
    pub branch_guard: String,
}

/// A plan plus its trigger-once marker.
///
/// `do_once` is true iff the plan references the configuration repository
/// itself, so that the plan definition changing does not endlessly re-run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaPlan {
    pub plan: Plan,
    pub do_once: bool,
}
