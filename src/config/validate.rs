// src/config/validate.rs

//! Semantic validation of a parsed plan file.
//!
//! Anything rejected here is a configuration error: the engine aborts loud
//! rather than running a plan it cannot execute faithfully.

use crate::config::model::{Plan, PlanFile};
use crate::errors::{PlanwatchError, Result};

/// Validate every plan in the file.
///
/// - A task with an empty `command` is invalid.
/// - A task that declares an `input` when the previous task has no `output`
///   can never be staged; the chain shape is rejected up front.
///
/// Plans with empty `repo_paths` are legal (they are skipped at the pipeline
/// layer), and the first task may never declare an `input`.
pub fn validate_plan_file(file: &PlanFile) -> Result<()> {
    for plan in &file.plans {
        validate_plan(plan)?;
    }
    Ok(())
}

fn validate_plan(plan: &Plan) -> Result<()> {
    for (i, task) in plan.tasks.iter().enumerate() {
        if task.command.is_empty() {
            return Err(PlanwatchError::Config(format!(
                "plan {:?}: task {:?} (index {i}) has an empty command",
                plan.name, task.name
            )));
        }

        if task.input.is_empty() {
            continue;
        }

        let prev_output = i
            .checked_sub(1)
            .and_then(|p| plan.tasks.get(p))
            .map(|t| t.output.as_str())
            .unwrap_or("");

        if prev_output.is_empty() {
            return Err(PlanwatchError::Config(format!(
                "plan {:?}: task {:?} (index {i}) declares input {:?} but the previous task has no output",
                plan.name, task.name, task.input
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::Task;

    fn plan_with_tasks(tasks: Vec<Task>) -> PlanFile {
        PlanFile {
            plans: vec![Plan {
                name: "p".to_string(),
                repo_paths: [("a".to_string(), "git://x/a".to_string())].into(),
                tasks,
            }],
        }
    }

    #[test]
    fn accepts_valid_chain() {
        let file = plan_with_tasks(vec![
            Task {
                command: "make art".to_string(),
                output: "out".to_string(),
                ..Default::default()
            },
            Task {
                command: "deploy art".to_string(),
                input: "art".to_string(),
                ..Default::default()
            },
        ]);
        assert!(validate_plan_file(&file).is_ok());
    }

    #[test]
    fn rejects_empty_command() {
        let file = plan_with_tasks(vec![Task::default()]);
        assert!(matches!(
            validate_plan_file(&file),
            Err(PlanwatchError::Config(_))
        ));
    }

    #[test]
    fn rejects_input_without_previous_output() {
        let file = plan_with_tasks(vec![
            Task {
                command: "one".to_string(),
                ..Default::default()
            },
            Task {
                command: "two".to_string(),
                input: "art".to_string(),
                ..Default::default()
            },
        ]);
        assert!(matches!(
            validate_plan_file(&file),
            Err(PlanwatchError::Config(_))
        ));
    }

    #[test]
    fn rejects_input_on_first_task() {
        let file = plan_with_tasks(vec![Task {
            command: "one".to_string(),
            input: "art".to_string(),
            ..Default::default()
        }]);
        assert!(validate_plan_file(&file).is_err());
    }

    #[test]
    fn output_without_next_input_is_fine() {
        let file = plan_with_tasks(vec![
            Task {
                command: "one".to_string(),
                output: "out".to_string(),
                ..Default::default()
            },
            Task {
                command: "two".to_string(),
                ..Default::default()
            },
        ]);
        assert!(validate_plan_file(&file).is_ok());
    }
}
