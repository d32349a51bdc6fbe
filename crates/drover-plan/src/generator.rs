//! Plan generation and modification via the LLM.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use drover_core::{DroverError, GenerateOptions, Llm, RequestContext, Result, Tool};
use drover_tools::json_schema;

use crate::plan::{parse_plan_response, render_plan, ExecutionPlan};

const PLAN_INSTRUCTIONS: &str = r#"Create an execution plan for the request above using only the available tools.

Respond with a single JSON object and nothing else, in exactly this shape:
{
  "description": "<one-line summary of the plan>",
  "steps": [
    {
      "toolName": "<name of a listed tool>",
      "description": "<what this step accomplishes>",
      "input": "<the input passed to the tool>",
      "parameters": { }
    }
  ]
}

Every toolName must be one of the available tools. Steps run in order."#;

/// Produces plans from user requests by prompting the LLM for a JSON plan
/// and parsing the response, and rewrites existing plans on user feedback.
pub struct PlanGenerator {
    llm: Arc<dyn Llm>,
    tools: Vec<Arc<dyn Tool>>,
    system_prompt: Option<String>,
}

impl PlanGenerator {
    pub fn new(
        llm: Arc<dyn Llm>,
        tools: Vec<Arc<dyn Tool>>,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            llm,
            tools,
            system_prompt,
        }
    }

    /// Generate a fresh draft plan for a user request.
    ///
    /// Any step naming a tool outside the generator's toolset fails the
    /// whole plan with `PlanParse`; an unusable plan is never returned.
    pub async fn generate(&self, ctx: &RequestContext, request: &str) -> Result<ExecutionPlan> {
        let prompt = format!(
            "User request:\n{request}\n\n{}\n\n{PLAN_INSTRUCTIONS}",
            self.tool_catalog()
        );

        debug!(tools = self.tools.len(), "generating execution plan");
        let response = self.llm.generate(ctx, &prompt, &self.options()).await?;
        let plan = parse_plan_response(&response, None)?;
        self.validate_tools(&plan)?;
        Ok(plan)
    }

    /// Produce a new plan from an existing one plus free-form user feedback.
    /// The task id is preserved, `user_approved` resets and the status
    /// returns to draft; the result is a whole plan, not a diff.
    pub async fn modify(
        &self,
        ctx: &RequestContext,
        plan: &ExecutionPlan,
        feedback: &str,
    ) -> Result<ExecutionPlan> {
        let prompt = format!(
            "Here is the current execution plan:\n\n{}\nThe user asked for these changes:\n{feedback}\n\n{}\n\n{PLAN_INSTRUCTIONS}",
            render_plan(plan),
            self.tool_catalog()
        );

        debug!(task_id = %plan.task_id, "modifying execution plan");
        let response = self.llm.generate(ctx, &prompt, &self.options()).await?;
        let modified = parse_plan_response(&response, Some(plan))?;
        self.validate_tools(&modified)?;
        Ok(modified)
    }

    fn options(&self) -> GenerateOptions {
        let mut opts = GenerateOptions::new();
        if let Some(system) = &self.system_prompt {
            opts = opts.with_system_message(system.clone());
        }
        opts
    }

    fn tool_catalog(&self) -> String {
        let mut catalog = String::from("Available tools:\n");
        for tool in &self.tools {
            let schema = json_schema(tool.as_ref());
            catalog.push_str(&format!(
                "- {}: {}\n  parameters: {}\n",
                tool.name(),
                tool.description(),
                json!(schema)
            ));
        }
        catalog
    }

    fn validate_tools(&self, plan: &ExecutionPlan) -> Result<()> {
        for step in &plan.steps {
            if !self.tools.iter().any(|t| t.name() == step.tool_name) {
                return Err(DroverError::PlanParse(format!(
                    "plan references unknown tool '{}'",
                    step.tool_name
                )));
            }
        }
        Ok(())
    }
}
