// src/config/loader.rs

//! Loads the plan YAML out of the configuration repository at a given SHA.

use crate::config::model::{MetaPlan, PlanFile};
use crate::config::validate::validate_plan_file;
use crate::errors::Result;
use crate::git::Repo;

/// Read and validate the plan file at `plan_path` as of `sha`.
pub async fn load_plan_file(repo: &Repo, sha: &str, plan_path: &str) -> Result<PlanFile> {
    let contents = repo.file(sha, plan_path).await?;
    let file: PlanFile = serde_yaml::from_str(&contents)?;
    validate_plan_file(&file)?;
    Ok(file)
}

/// Turn a plan file into the MetaPlans the scheduler consumes.
///
/// - Plans with no `repo_paths` are silently skipped.
/// - `do_once` is set iff the plan references the configuration repository
///   itself.
pub fn meta_plans(file: PlanFile, config_repo_url: &str) -> Vec<MetaPlan> {
    file.plans
        .into_iter()
        .filter(|p| !p.repo_paths.is_empty())
        .map(|plan| {
            let do_once = plan.repo_paths.values().any(|url| url == config_repo_url);
            MetaPlan { plan, do_once }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{Plan, Task};

    fn plan(name: &str, repo_url: Option<&str>) -> Plan {
        Plan {
            name: name.to_string(),
            repo_paths: repo_url
                .map(|u| [("a".to_string(), u.to_string())].into())
                .unwrap_or_default(),
            tasks: vec![Task {
                command: "echo hi".to_string(),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn skips_plans_without_repos() {
        let file = PlanFile {
            plans: vec![plan("empty", None), plan("real", Some("git://x/a"))],
        };
        let metas = meta_plans(file, "git://config/repo");
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].plan.name, "real");
        assert!(!metas[0].do_once);
    }

    #[test]
    fn flags_config_repo_plans_do_once() {
        let file = PlanFile {
            plans: vec![plan("self", Some("git://config/repo"))],
        };
        let metas = meta_plans(file, "git://config/repo");
        assert_eq!(metas.len(), 1);
        assert!(metas[0].do_once);
    }
}
