//! Workflow and task model.

use std::collections::HashMap;

use drover_core::{DroverError, Result};

/// Status of a workflow task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work: an input dispatched to a named agent once every
/// dependency has completed.
#[derive(Debug, Clone)]
pub struct WorkflowTask {
    pub id: String,
    pub agent_id: String,
    pub input: String,
    /// Ids of tasks that must be `Completed` before this one may run.
    pub dependencies: Vec<String>,
    pub status: TaskStatus,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl WorkflowTask {
    pub fn new(
        id: impl Into<String>,
        agent_id: impl Into<String>,
        input: impl Into<String>,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            input: input.into(),
            dependencies,
            status: TaskStatus::Pending,
            result: None,
            error: None,
        }
    }
}

/// A directed acyclic set of tasks distributed across agents.
///
/// Results and errors are recorded per task id as the orchestrator runs the
/// workflow; the optional final task designates which task's outcome is the
/// workflow's answer.
#[derive(Debug, Default)]
pub struct Workflow {
    pub tasks: Vec<WorkflowTask>,
    pub results: HashMap<String, String>,
    pub errors: HashMap<String, String>,
    pub final_task_id: Option<String>,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. A second task with an already-used id is rejected:
    /// silently replacing it would drop edges pointing at the first
    /// definition.
    pub fn add_task(
        &mut self,
        id: impl Into<String>,
        agent_id: impl Into<String>,
        input: impl Into<String>,
        dependencies: Vec<String>,
    ) -> Result<()> {
        let id = id.into();
        if self.tasks.iter().any(|t| t.id == id) {
            return Err(DroverError::IllegalState(format!(
                "workflow already contains a task with id '{id}'"
            )));
        }
        self.tasks
            .push(WorkflowTask::new(id, agent_id, input, dependencies));
        Ok(())
    }

    /// Designate the task whose outcome is the workflow's final answer.
    pub fn set_final_task(&mut self, id: impl Into<String>) {
        self.final_task_id = Some(id.into());
    }

    pub fn task(&self, id: &str) -> Option<&WorkflowTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub(crate) fn task_mut(&mut self, id: &str) -> Option<&mut WorkflowTask> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Check every declared dependency against the task set.
    pub(crate) fn validate_dependencies(&self) -> Result<()> {
        for task in &self.tasks {
            for dependency in &task.dependencies {
                if self.task(dependency).is_none() {
                    return Err(DroverError::DanglingDependency {
                        task: task.id.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
