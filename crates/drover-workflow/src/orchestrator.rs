//! Dependency-ordered workflow execution.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use drover_core::{DroverError, RequestContext, Result};

use crate::handoff::parse_handoff;
use crate::registry::AgentRegistry;
use crate::workflow::{TaskStatus, Workflow, WorkflowTask};

/// Longest chain of handoffs one task will follow before the current
/// output is taken as final.
const MAX_HANDOFFS: usize = 5;

type Completion = (String, std::result::Result<String, String>);

/// Executes workflows over a registry of agents.
///
/// Scheduling is a completion-driven readiness scan: every task with no
/// unfinished dependencies runs concurrently; when a worker finishes, the
/// coordinator records its outcome and scans for newly-ready tasks. Tasks
/// downstream of a failure stay pending forever — that is the
/// partial-failure policy, not an error, unless the final task itself can
/// never run.
pub struct Orchestrator {
    registry: AgentRegistry,
    max_concurrency: Option<usize>,
}

impl Orchestrator {
    pub fn new(registry: AgentRegistry) -> Self {
        Self {
            registry,
            max_concurrency: None,
        }
    }

    /// Cap the number of concurrently running tasks. Unbounded by default;
    /// the cap changes scheduling pressure, never semantics.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max.max(1));
        self
    }

    /// Execute the workflow to quiescence and return the final task's
    /// result.
    ///
    /// The workflow is mutated in place: task statuses, per-task results
    /// and errors remain inspectable afterwards. Returns the final task's
    /// result when it completed, its error when it failed
    /// (`TaskFailed`), `WorkflowStalled` when it can never run, and an
    /// empty string when no final task was declared.
    pub async fn execute(&self, ctx: &RequestContext, workflow: &mut Workflow) -> Result<String> {
        workflow.validate_dependencies()?;
        ctx.ensure_active()?;

        let run_ctx = ctx.scope();
        let capacity = workflow.tasks.len().max(1);
        let (tx, mut rx) = mpsc::channel::<Completion>(capacity);
        let semaphore = self
            .max_concurrency
            .map(|max| Arc::new(Semaphore::new(max)));

        info!(tasks = workflow.tasks.len(), "executing workflow");
        let mut in_flight = 0usize;

        // Seed: every task without dependencies is ready immediately.
        let seeds: Vec<usize> = workflow
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.dependencies.is_empty())
            .map(|(i, _)| i)
            .collect();
        for index in seeds {
            let input = workflow.tasks[index].input.clone();
            self.spawn_worker(&run_ctx, &workflow.tasks[index], input, &tx, &semaphore);
            workflow.tasks[index].status = TaskStatus::Running;
            in_flight += 1;
        }

        while in_flight > 0 {
            let Some((task_id, outcome)) = rx.recv().await else {
                break;
            };
            in_flight -= 1;

            if let Some(task) = workflow.task_mut(&task_id) {
                match outcome {
                    Ok(result) => {
                        debug!(task = %task_id, "workflow task completed");
                        task.status = TaskStatus::Completed;
                        task.result = Some(result.clone());
                        workflow.results.insert(task_id.clone(), result);
                    }
                    Err(message) => {
                        warn!(task = %task_id, error = %message, "workflow task failed");
                        task.status = TaskStatus::Failed;
                        task.error = Some(message.clone());
                        workflow.errors.insert(task_id.clone(), message);
                    }
                }
            }

            // Readiness scan: anything pending whose dependencies are all
            // completed can start now. Tasks with a failed dependency are
            // left pending.
            let ready: Vec<usize> = workflow
                .tasks
                .iter()
                .enumerate()
                .filter(|(_, task)| {
                    task.status == TaskStatus::Pending
                        && task.dependencies.iter().all(|dep| {
                            workflow
                                .task(dep)
                                .is_some_and(|d| d.status == TaskStatus::Completed)
                        })
                })
                .map(|(i, _)| i)
                .collect();

            for index in ready {
                let input = compose_input(workflow, &workflow.tasks[index]);
                self.spawn_worker(&run_ctx, &workflow.tasks[index], input, &tx, &semaphore);
                workflow.tasks[index].status = TaskStatus::Running;
                in_flight += 1;
            }
        }

        // Workers are done or unreachable; stop anything still holding the
        // scope.
        run_ctx.cancel();

        self.resolve(workflow)
    }

    fn spawn_worker(
        &self,
        run_ctx: &RequestContext,
        task: &WorkflowTask,
        input: String,
        tx: &mpsc::Sender<Completion>,
        semaphore: &Option<Arc<Semaphore>>,
    ) {
        let ctx = run_ctx.child();
        let registry = self.registry.clone();
        let task_id = task.id.clone();
        let agent_id = task.agent_id.clone();
        let tx = tx.clone();
        let semaphore = semaphore.clone();

        debug!(task = %task_id, agent = %agent_id, "spawning workflow task");
        tokio::spawn(async move {
            let _permit = match &semaphore {
                Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
                None => None,
            };
            let outcome = run_task(&ctx, &registry, &agent_id, input).await;
            // Buffered to the task count, so the send never blocks.
            let _ = tx.send((task_id, outcome)).await;
        });
    }

    /// Turn the terminal workflow state into the caller's answer.
    fn resolve(&self, workflow: &Workflow) -> Result<String> {
        let pending: Vec<&WorkflowTask> = workflow
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .collect();

        if !pending.is_empty() {
            let mut reasons = Vec::new();
            let mut unsatisfiable = false;
            for task in &pending {
                let failed_dep = task.dependencies.iter().find(|dep| {
                    workflow
                        .task(dep)
                        .is_some_and(|d| d.status == TaskStatus::Failed)
                });
                match failed_dep {
                    Some(dep) => {
                        reasons.push(format!("task '{}' blocked on failed dependency '{dep}'", task.id));
                    }
                    None => {
                        unsatisfiable = true;
                        reasons.push(format!(
                            "task '{}' waits on dependencies that can never finish",
                            task.id
                        ));
                    }
                }
            }
            for reason in &reasons {
                warn!(reason = %reason, "workflow left work pending");
            }

            let final_is_pending = workflow
                .final_task_id
                .as_deref()
                .and_then(|id| workflow.task(id))
                .is_some_and(|t| t.status == TaskStatus::Pending);
            if final_is_pending || unsatisfiable {
                return Err(DroverError::WorkflowStalled(reasons.join("; ")));
            }
        }

        match workflow.final_task_id.as_deref() {
            None => Ok(String::new()),
            Some(final_id) => {
                if let Some(message) = workflow.errors.get(final_id) {
                    return Err(DroverError::TaskFailed {
                        task: final_id.to_string(),
                        message: message.clone(),
                    });
                }
                workflow.results.get(final_id).cloned().ok_or_else(|| {
                    DroverError::WorkflowStalled(format!("final task '{final_id}' never ran"))
                })
            }
        }
    }
}

/// Run one task: resolve the agent, follow handoff directives, and map the
/// outcome to a completion message.
async fn run_task(
    ctx: &RequestContext,
    registry: &AgentRegistry,
    agent_id: &str,
    input: String,
) -> std::result::Result<String, String> {
    let Some(mut agent) = registry.get(agent_id) else {
        return Err(format!("agent not found: {agent_id}"));
    };

    let mut hops = 0;
    loop {
        if ctx.cancelled() {
            return Err("request cancelled".to_string());
        }

        let output = match agent.run(ctx, &input).await {
            Ok(output) => output,
            Err(err) => return Err(format!("agent execution failed: {err}")),
        };

        let Some(handoff) = parse_handoff(&output) else {
            return Ok(output);
        };
        if hops >= MAX_HANDOFFS {
            warn!(agent = %agent.name(), "handoff chain exceeded its depth limit");
            return Ok(output);
        }
        let Some(next) = registry.get(&handoff.agent_id) else {
            warn!(target = %handoff.agent_id, "handoff target is not registered");
            return Ok(output);
        };

        info!(from = %agent.name(), to = %handoff.agent_id, reason = %handoff.reason, "following handoff");
        agent = next;
        hops += 1;
        // The same turn input is dispatched to the handoff target.
    }
}

/// A worker's prompt: the task input followed by the results of its
/// successful dependencies, in declared order.
fn compose_input(workflow: &Workflow, task: &WorkflowTask) -> String {
    let mut input = task.input.clone();
    for dep in &task.dependencies {
        if let Some(result) = workflow.results.get(dep) {
            input.push_str(&format!("\n\nResult from {dep}: {result}"));
        }
    }
    input
}
