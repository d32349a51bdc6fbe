//! Approval-gated plan execution.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use drover_core::{DroverError, RequestContext, Result, Tool};

use crate::plan::{ExecutionPlan, PlanStatus};

/// Runs approved plans step by step.
///
/// Steps execute sequentially in declared order. There is no retry or skip
/// policy at this level; retries belong to individual tools or the LLM
/// adapter. Cancellation is observed before every step.
pub struct PlanExecutor {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl PlanExecutor {
    pub fn new(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        Self {
            tools: tools
                .into_iter()
                .map(|t| (t.name().to_string(), t))
                .collect(),
        }
    }

    /// Execute an approved plan, mutating its status through the lifecycle.
    ///
    /// Refuses to run unless the user approved the plan; calling on an
    /// already-terminal plan returns `IllegalState` without touching any
    /// tool.
    pub async fn execute(&self, ctx: &RequestContext, plan: &mut ExecutionPlan) -> Result<String> {
        if plan.status.is_terminal() {
            return Err(DroverError::IllegalState(format!(
                "plan {} already finished with status {}",
                plan.task_id, plan.status
            )));
        }
        if !plan.user_approved {
            return Err(DroverError::IllegalState(format!(
                "plan {} has not been approved by the user",
                plan.task_id
            )));
        }

        plan.transition(PlanStatus::Executing)?;
        info!(task_id = %plan.task_id, steps = plan.steps.len(), "executing plan");

        let mut records = Vec::with_capacity(plan.steps.len());
        let steps = plan.steps.clone();
        for (i, step) in steps.iter().enumerate() {
            if let Err(err) = ctx.ensure_active() {
                plan.transition(PlanStatus::Cancelled)?;
                return Err(err);
            }

            let Some(tool) = self.tools.get(&step.tool_name) else {
                warn!(task_id = %plan.task_id, tool = %step.tool_name, "plan step names an unknown tool");
                plan.transition(PlanStatus::Failed)?;
                return Err(DroverError::UnknownTool(step.tool_name.clone()));
            };

            match tool.execute(ctx, &step.input).await {
                Ok(result) => {
                    records.push(format!("Step {} ({}): {}", i + 1, step.description, result));
                }
                Err(err) => {
                    warn!(
                        task_id = %plan.task_id,
                        step = i + 1,
                        tool = %step.tool_name,
                        error = %err,
                        "plan step failed"
                    );
                    plan.transition(PlanStatus::Failed)?;
                    return Err(DroverError::ToolExecution {
                        tool: step.tool_name.clone(),
                        message: format!(
                            "step {} ({}) failed: {err}",
                            i + 1,
                            step.description
                        ),
                    });
                }
            }
        }

        plan.transition(PlanStatus::Completed)?;
        info!(task_id = %plan.task_id, "plan completed");
        Ok(format!(
            "Execution plan completed successfully!\n\n{}",
            records.join("\n\n")
        ))
    }

    /// Cancel a plan. Terminal plans cannot be cancelled.
    pub fn cancel(&self, plan: &mut ExecutionPlan) -> Result<()> {
        plan.transition(PlanStatus::Cancelled)
    }

    /// Current status of a plan.
    pub fn status(&self, plan: &ExecutionPlan) -> PlanStatus {
        plan.status
    }
}
