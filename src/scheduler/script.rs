// src/scheduler/script.rs

//! Task body construction.
//!
//! The body is a POSIX shell script and is the entire contract with the
//! platform: clones, input staging, parameter exports, the verbatim command,
//! and output upload are all baked in at build time. Shell quoting is
//! deliberately minimal; operators must trust the plan YAML.

use crate::config::model::{Plan, Task};

/// How one task's output becomes the next task's input.
///
/// `from_name` is only meaningful on the input side: it is the directory
/// name the producing task uploaded, which may differ from the name this
/// task expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingEndpoint {
    pub url: String,
    pub name: String,
    pub from_name: String,
}

/// Build the full task body.
///
/// Segment order is fixed: clones, input staging, parameter exports, output
/// dir pre-creation, the command, output upload.
pub fn build_task_script(
    plan: &Plan,
    task: &Task,
    branch: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
    input: Option<&StagingEndpoint>,
    output: Option<&StagingEndpoint>,
) -> String {
    let mut clones = String::new();
    for url in plan.repo_paths.values() {
        let dir = basename(url);
        clones.push_str(&format!(
            r#"
rm -rf {dir}
git clone {url}

pushd {dir}
  # Checkout may fail on repos that lack this branch; the default branch is
  # used in that case.
  set +e
  git checkout {branch}
  set -e

  git submodule update --init --recursive
popd
"#
        ));
    }

    let gather_input = match input {
        Some(input) => format!(
            r#"
set -ex
pushd /home/vcap/app
  wget {url} -O input.tgz --quiet
  ls -alh
  tar -xzf input.tgz
  if [ '{from}' != '{name}' ]; then
    mv {from} {name}
  fi
popd
set +ex
"#,
            url = input.url,
            from = input.from_name,
            name = input.name,
        ),
        None => String::new(),
    };

    let mut parameters = String::new();
    for (k, v) in &task.parameters {
        if let Some(key) = v.strip_prefix("((").and_then(|s| s.strip_suffix("))")) {
            // Unresolved lookups are silently omitted.
            if let Some(resolved) = lookup(key) {
                parameters.push_str(&format!("export {k}={resolved}\n"));
            }
            continue;
        }
        parameters.push_str(&format!("export {k}={v}\n"));
    }

    let (mk_output, gather_output) = match output {
        Some(output) => (
            format!(
                r#"
set -e
pushd /home/vcap/app
  mkdir {name}
popd
set +e
"#,
                name = output.name,
            ),
            format!(
                r#"
set -e
pushd /home/vcap/app
  tar -czf output.tgz {name}
  ls -alh
  curl -s -X POST {url} --data-binary @output.tgz
popd
set +e
"#,
                name = output.name,
                url = output.url,
            ),
        ),
        None => (String::new(), String::new()),
    };

    format!(
        r#"#!/bin/bash
set -ex

# Clones
{clones}

# Input
{gather_input}

# Parameters
{parameters}

# Make output dirs
{mk_output}

{command}

# Output
{gather_output}
"#,
        command = task.command,
    )
}

/// Final path component of a repo URL, trailing slashes stripped.
fn basename(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
