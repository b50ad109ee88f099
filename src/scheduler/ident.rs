// src/scheduler/ident.rs

//! Canonical plan identity.
//!
//! Plan and task values include unordered maps, so equality is defined over
//! a sorted, comma-joined multiset of the semantic fields. Two MetaPlans are
//! the same plan iff their canonical strings match.

use crate::config::model::MetaPlan;

/// Canonical identity of a plan; used as the key for active plan entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey(String);

impl PlanKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Compute the canonical identity: `{plan.name}` ∪ flattened `repo_paths`
/// entries ∪ per task `(command, name, "k=v" parameters)`, sorted and joined
/// with commas.
pub fn plan_key(meta: &MetaPlan) -> PlanKey {
    let mut parts = vec![meta.plan.name.clone()];

    for (alias, url) in &meta.plan.repo_paths {
        parts.push(alias.clone());
        parts.push(url.clone());
    }

    for task in &meta.plan.tasks {
        parts.push(task.command.clone());
        parts.push(task.name.clone());
        for (k, v) in &task.parameters {
            parts.push(format!("{k}={v}"));
        }
    }

    parts.sort();
    PlanKey(parts.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{Plan, Task};

    fn meta(name: &str, params: &[(&str, &str)]) -> MetaPlan {
        MetaPlan {
            plan: Plan {
                name: name.to_string(),
                repo_paths: [("a".to_string(), "git://x/a".to_string())].into(),
                tasks: vec![Task {
                    name: "t".to_string(),
                    command: "echo hi".to_string(),
                    parameters: params
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                    ..Default::default()
                }],
            },
            do_once: false,
        }
    }

    #[test]
    fn identical_plans_share_a_key() {
        assert_eq!(
            plan_key(&meta("p", &[("A", "1"), ("B", "2")])),
            plan_key(&meta("p", &[("B", "2"), ("A", "1")])),
        );
    }

    #[test]
    fn different_parameters_differ() {
        assert_ne!(
            plan_key(&meta("p", &[("A", "1")])),
            plan_key(&meta("p", &[("A", "2")])),
        );
    }

    #[test]
    fn different_names_differ() {
        assert_ne!(plan_key(&meta("p", &[])), plan_key(&meta("q", &[])));
    }

    #[test]
    fn do_once_does_not_affect_identity() {
        let mut a = meta("p", &[]);
        let b = meta("p", &[]);
        a.do_once = true;
        assert_eq!(plan_key(&a), plan_key(&b));
    }
}
