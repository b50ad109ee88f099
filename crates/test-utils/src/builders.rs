//! Builders for plan and task fixtures.

use planwatch::config::{MetaPlan, Plan, Task};

pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            task: Task {
                command: command.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.task.name = name.to_string();
        self
    }

    pub fn input(mut self, input: &str) -> Self {
        self.task.input = input.to_string();
        self
    }

    pub fn output(mut self, output: &str) -> Self {
        self.task.output = output.to_string();
        self
    }

    pub fn parameter(mut self, key: &str, value: &str) -> Self {
        self.task
            .parameters
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn branch_guard(mut self, guard: &str) -> Self {
        self.task.branch_guard = guard.to_string();
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

pub struct PlanBuilder {
    plan: Plan,
}

impl PlanBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            plan: Plan {
                name: name.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn repo(mut self, alias: &str, url: &str) -> Self {
        self.plan
            .repo_paths
            .insert(alias.to_string(), url.to_string());
        self
    }

    pub fn task(mut self, task: Task) -> Self {
        self.plan.tasks.push(task);
        self
    }

    pub fn build(self) -> Plan {
        self.plan
    }

    pub fn build_meta(self, do_once: bool) -> MetaPlan {
        MetaPlan {
            plan: self.plan,
            do_once,
        }
    }
}
