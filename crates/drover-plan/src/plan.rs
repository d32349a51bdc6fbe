//! Plan entities, lifecycle states and the wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use uuid::Uuid;

use drover_core::{DroverError, Result};

/// Lifecycle state of an execution plan.
///
/// Transitions form a closed table; [`ExecutionPlan::transition`] is the
/// only way to change status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    AwaitingApproval,
    Approved,
    Executing,
    Completed,
    Failed,
    Cancelled,
}

impl PlanStatus {
    /// Whether the plan can never leave this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlanStatus::Completed | PlanStatus::Failed | PlanStatus::Cancelled
        )
    }

    /// Whether `self → to` is an allowed transition.
    pub fn can_transition(&self, to: PlanStatus) -> bool {
        use PlanStatus::*;
        match (self, to) {
            (Draft, AwaitingApproval) => true,
            (AwaitingApproval, Approved) => true,
            // User modification sends the plan back to draft.
            (AwaitingApproval, Draft) => true,
            (Approved, Executing) => true,
            (Executing, Completed) => true,
            (Executing, Failed) => true,
            // Any non-terminal state may be cancelled.
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::AwaitingApproval => "awaiting_approval",
            PlanStatus::Approved => "approved",
            PlanStatus::Executing => "executing",
            PlanStatus::Completed => "completed",
            PlanStatus::Failed => "failed",
            PlanStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a plan: a tool invocation with its input and parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub tool_name: String,
    pub description: String,
    pub input: String,
    #[serde(default)]
    pub parameters: Map<String, serde_json::Value>,
}

/// An ordered sequence of tool invocations proposed by the LLM, stored for
/// user approval before execution. Steps run in declared order; plans are
/// linear (no inter-step dependencies).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub task_id: String,
    pub description: String,
    pub steps: Vec<PlanStep>,
    pub user_approved: bool,
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionPlan {
    /// Create a draft plan with a fresh task id.
    pub fn new(description: impl Into<String>, steps: Vec<PlanStep>) -> Self {
        let now = Utc::now();
        Self {
            task_id: Uuid::new_v4().to_string(),
            description: description.into(),
            steps,
            user_approved: false,
            status: PlanStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the plan to `to`, enforcing the transition table. Advances
    /// `updated_at` on success.
    pub fn transition(&mut self, to: PlanStatus) -> Result<()> {
        if !self.status.can_transition(to) {
            return Err(DroverError::IllegalState(format!(
                "plan {} cannot move from {} to {}",
                self.task_id, self.status, to
            )));
        }
        self.status = to;
        self.touch();
        Ok(())
    }

    /// Record a mutation timestamp; `updated_at` never precedes `created_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.created_at);
    }
}

/// The JSON body the generator asks the LLM to produce.
#[derive(Debug, Deserialize)]
struct PlanDocument {
    description: String,
    steps: Vec<PlanStep>,
}

/// Render a plan for display to the user.
pub fn render_plan(plan: &ExecutionPlan) -> String {
    let mut out = format!(
        "# Execution Plan: {}\n\nTask ID: {}\nStatus: {}\n\n",
        plan.description, plan.task_id, plan.status
    );

    for (i, step) in plan.steps.iter().enumerate() {
        out.push_str(&format!(
            "## Step {}: {}\nTool: {}\nInput: {}\n",
            i + 1,
            step.description,
            step.tool_name,
            step.input
        ));
        if !step.parameters.is_empty() {
            out.push_str("Parameters:\n");
            for (key, value) in &step.parameters {
                out.push_str(&format!("  {}: {}\n", key, render_value(value)));
            }
        }
        out.push('\n');
    }

    out
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a plan out of an LLM response.
///
/// The model is instructed to answer with a single JSON object but often
/// wraps it in prose; the parser locates the outermost object by brace
/// matching (string-aware) and deserializes it. `existing` carries identity
/// forward on modification: task id and creation time are preserved.
pub fn parse_plan_response(response: &str, existing: Option<&ExecutionPlan>) -> Result<ExecutionPlan> {
    let body = extract_json_object(response).ok_or_else(|| {
        DroverError::PlanParse("no JSON object found in the model response".into())
    })?;

    let document: PlanDocument = serde_json::from_str(body)
        .map_err(|e| DroverError::PlanParse(format!("invalid plan JSON: {e}")))?;

    if document.steps.is_empty() {
        return Err(DroverError::PlanParse("plan contains no steps".into()));
    }
    for (i, step) in document.steps.iter().enumerate() {
        if step.tool_name.is_empty() {
            return Err(DroverError::PlanParse(format!(
                "step {} is missing a tool name",
                i + 1
            )));
        }
    }

    let mut plan = ExecutionPlan::new(document.description, document.steps);
    if let Some(existing) = existing {
        plan.task_id = existing.task_id.clone();
        plan.created_at = existing.created_at;
        plan.touch();
    }
    Ok(plan)
}

/// Locate the outermost JSON object in `text`, tolerating surrounding prose.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
