//! The per-turn agent runtime.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn, Instrument};

use drover_core::{
    DroverError, GenerateOptions, Llm, LlmConfig, McpServer, Memory, Message, MessageQuery,
    RequestContext, ResponseFormat, Result, Tool,
};
use drover_guardrails::GuardrailPipeline;
use drover_mcp::RemoteTool;
use drover_plan::{render_plan, ExecutionPlan, PlanExecutor, PlanGenerator, PlanStatus, PlanStore};

use crate::config::{
    generate_config_from_system_prompt, substitute_variables, AgentConfig, TaskConfig, TaskConfigs,
};
use crate::directive::{PlanAction, PlanDirective};

const DEFAULT_NAME: &str = "agent";

/// Phrases that indicate the user is asking about the agent itself rather
/// than posing a task.
const ROLE_QUERIES: &[&str] = &[
    "what are you",
    "who are you",
    "what is your role",
    "what do you do",
    "what can you do",
    "what is your purpose",
    "what is your function",
    "tell me about yourself",
    "introduce yourself",
    "what are your capabilities",
    "what are you designed to do",
    "what's your job",
    "what kind of assistant are you",
    "your role",
    "your expertise",
    "what are you expert in",
    "what are you specialized in",
    "your specialty",
    "what's your specialty",
];

/// An agent: one LLM plus optional memory, tools, MCP servers and
/// guardrails behind a single per-turn [`run`](Agent::run) operation.
///
/// When tools are available and plan approval is required (the default), a
/// turn produces an execution plan that the user approves, modifies or
/// cancels in a later turn via plan directives; with approval disabled the
/// turn goes straight to the LLM with tools attached.
pub struct Agent {
    name: String,
    llm: Arc<dyn Llm>,
    memory: Option<Arc<dyn Memory>>,
    tools: Vec<Arc<dyn Tool>>,
    mcp_servers: Vec<Arc<dyn McpServer>>,
    org_id: Option<String>,
    guardrails: Option<GuardrailPipeline>,
    system_prompt: Option<String>,
    require_plan_approval: bool,
    response_format: Option<ResponseFormat>,
    llm_config: Option<LlmConfig>,
    plan_store: PlanStore,
    generated_agent_config: Option<AgentConfig>,
    generated_task_configs: TaskConfigs,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("org_id", &self.org_id)
            .field("system_prompt", &self.system_prompt)
            .field("require_plan_approval", &self.require_plan_approval)
            .field("response_format", &self.response_format)
            .field("llm_config", &self.llm_config)
            .field("tools", &self.tools.len())
            .field("mcp_servers", &self.mcp_servers.len())
            .finish()
    }
}

/// Builder for [`Agent`]. The LLM is the only required option.
#[derive(Default)]
pub struct AgentBuilder {
    name: Option<String>,
    llm: Option<Arc<dyn Llm>>,
    memory: Option<Arc<dyn Memory>>,
    tools: Vec<Arc<dyn Tool>>,
    mcp_servers: Vec<Arc<dyn McpServer>>,
    org_id: Option<String>,
    guardrails: Option<GuardrailPipeline>,
    system_prompt: Option<String>,
    require_plan_approval: bool,
    response_format: Option<ResponseFormat>,
    llm_config: Option<LlmConfig>,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            require_plan_approval: true,
            ..Self::default()
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn Llm>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn with_mcp_server(mut self, server: Arc<dyn McpServer>) -> Self {
        self.mcp_servers.push(server);
        self
    }

    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    pub fn with_guardrails(mut self, guardrails: GuardrailPipeline) -> Self {
        self.guardrails = Some(guardrails);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Apply a persona configuration as the system prompt.
    pub fn with_agent_config(
        self,
        config: &AgentConfig,
        variables: &HashMap<String, String>,
    ) -> Self {
        let prompt = crate::config::format_system_prompt(config, variables);
        self.with_system_prompt(prompt)
    }

    pub fn with_require_plan_approval(mut self, require: bool) -> Self {
        self.require_plan_approval = require;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn with_llm_config(mut self, config: LlmConfig) -> Self {
        self.llm_config = Some(config);
        self
    }

    /// Build the agent. Fails when no LLM was configured.
    pub fn build(self) -> Result<Agent> {
        let llm = self
            .llm
            .ok_or_else(|| DroverError::Config("an LLM is required to build an agent".into()))?;

        Ok(Agent {
            name: self.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            llm,
            memory: self.memory,
            tools: self.tools,
            mcp_servers: self.mcp_servers,
            org_id: self.org_id,
            guardrails: self.guardrails,
            system_prompt: self.system_prompt,
            require_plan_approval: self.require_plan_approval,
            response_format: self.response_format,
            llm_config: self.llm_config,
            plan_store: PlanStore::new(),
            generated_agent_config: None,
            generated_task_configs: TaskConfigs::new(),
        })
    }

    /// Build the agent, then ask the LLM to derive a persona and example
    /// tasks from the system prompt. Auto-configuration failure is
    /// non-fatal: the agent is returned as built.
    pub async fn build_with_auto_config(self, ctx: &RequestContext) -> Result<Agent> {
        let mut agent = self.build()?;
        let Some(system_prompt) = agent.system_prompt.clone() else {
            return Ok(agent);
        };

        match generate_config_from_system_prompt(ctx, agent.llm.as_ref(), &system_prompt).await {
            Ok((agent_config, task_configs)) => {
                let mut tasks = TaskConfigs::new();
                for (i, mut task) in task_configs.into_iter().enumerate() {
                    task.agent = agent.name.clone();
                    tasks.insert(format!("auto_task_{}", i + 1), task);
                }
                agent.generated_agent_config = Some(agent_config);
                agent.generated_task_configs = tasks;
            }
            Err(err) => {
                warn!(agent = %agent.name, error = %err, "auto-configuration failed, continuing without it");
            }
        }
        Ok(agent)
    }
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The persona derived by auto-configuration, if it ran.
    pub fn generated_agent_config(&self) -> Option<&AgentConfig> {
        self.generated_agent_config.as_ref()
    }

    /// The example tasks derived by auto-configuration, if it ran.
    pub fn generated_task_configs(&self) -> &TaskConfigs {
        &self.generated_task_configs
    }

    /// Fetch a stored plan by task id.
    pub fn plan_by_task_id(&self, task_id: &str) -> Option<ExecutionPlan> {
        self.plan_store.get_by_task_id(task_id)
    }

    /// Snapshot of all stored plans.
    pub fn plans(&self) -> Vec<ExecutionPlan> {
        self.plan_store.list()
    }

    /// Run one turn.
    pub async fn run(&self, ctx: &RequestContext, input: &str) -> Result<String> {
        let span = tracing::info_span!("agent_run", agent = %self.name);
        self.run_turn(ctx, input).instrument(span).await
    }

    async fn run_turn(&self, ctx: &RequestContext, input: &str) -> Result<String> {
        // A configured org id fills in for a missing tenant so memory and
        // vector scoping keep working.
        let ctx = match (&self.org_id, ctx.has_tenant()) {
            (Some(org_id), false) => ctx.child().with_tenant(org_id.clone()),
            _ => ctx.child(),
        };

        if let Some(memory) = &self.memory {
            memory.add_message(&ctx, Message::user(input)).await?;
        }

        let input = match &self.guardrails {
            Some(guardrails) => guardrails.process_input(&ctx, input)?,
            None => input.to_string(),
        };

        if let Some(directive) = PlanDirective::parse(&input) {
            return self.handle_plan_directive(&ctx, directive).await;
        }

        if self.system_prompt.is_some() && is_role_query(&input) {
            let response = self.role_response(&ctx).await;
            if let Some(memory) = &self.memory {
                memory
                    .add_message(&ctx, Message::assistant(response.clone()))
                    .await?;
            }
            return Ok(response);
        }

        let tools = self.collect_tools(&ctx).await;

        let response = if !tools.is_empty() && self.require_plan_approval {
            self.run_with_plan(&ctx, &input, tools).await?
        } else {
            self.run_direct(&ctx, &input, tools).await?
        };

        let response = match &self.guardrails {
            Some(guardrails) => guardrails.process_output(&ctx, &response)?,
            None => response,
        };

        if let Some(memory) = &self.memory {
            memory
                .add_message(&ctx, Message::assistant(response.clone()))
                .await?;
        }

        Ok(response)
    }

    /// Local tools plus whatever the configured MCP servers currently
    /// advertise. A server that fails to list is skipped, not fatal.
    async fn collect_tools(&self, ctx: &RequestContext) -> Vec<Arc<dyn Tool>> {
        let mut tools = self.tools.clone();

        for server in &self.mcp_servers {
            match server.list_tools(ctx).await {
                Ok(descriptors) => {
                    for descriptor in descriptors {
                        tools.push(Arc::new(RemoteTool::new(descriptor, server.clone()))
                            as Arc<dyn Tool>);
                    }
                }
                Err(err) => {
                    warn!(agent = %self.name, error = %err, "failed to collect MCP tools, continuing without them");
                }
            }
        }

        tools
    }

    async fn run_with_plan(
        &self,
        ctx: &RequestContext,
        input: &str,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Result<String> {
        let generator =
            PlanGenerator::new(self.llm.clone(), tools, self.system_prompt.clone());
        let mut plan = generator.generate(ctx, input).await?;
        plan.transition(PlanStatus::AwaitingApproval)?;

        info!(agent = %self.name, task_id = %plan.task_id, steps = plan.steps.len(), "plan generated, awaiting approval");
        let rendered = render_plan(&plan);
        self.plan_store.store(plan);

        Ok(format!(
            "I've created an execution plan for your request:\n\n{rendered}\nDo you approve this plan? You can modify it if needed."
        ))
    }

    async fn run_direct(
        &self,
        ctx: &RequestContext,
        input: &str,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Result<String> {
        // With memory attached, the prompt is the running transcript; the
        // current input is already its last line.
        let prompt = match &self.memory {
            Some(memory) => {
                let history = memory.messages(ctx, MessageQuery::all()).await?;
                history
                    .iter()
                    .map(|m| format!("{}: {}", m.role, m.content))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            None => input.to_string(),
        };

        let opts = self.generate_options();
        if tools.is_empty() {
            self.llm.generate(ctx, &prompt, &opts).await
        } else {
            self.llm.generate_with_tools(ctx, &prompt, &tools, &opts).await
        }
    }

    fn generate_options(&self) -> GenerateOptions {
        let mut opts = GenerateOptions::new();
        if let Some(config) = &self.llm_config {
            opts = opts.with_config(config.clone());
        }
        if let Some(system) = &self.system_prompt {
            opts = opts.with_system_message(system.clone());
        }
        if let Some(format) = &self.response_format {
            opts = opts.with_response_format(format.clone());
        }
        opts
    }

    async fn handle_plan_directive(
        &self,
        ctx: &RequestContext,
        directive: PlanDirective,
    ) -> Result<String> {
        let plan = self
            .plan_store
            .get_by_task_id(&directive.task_id)
            .ok_or_else(|| {
                DroverError::IllegalState(format!(
                    "plan with task id {} not found",
                    directive.task_id
                ))
            })?;

        debug!(agent = %self.name, task_id = %plan.task_id, action = ?directive.action, "handling plan directive");
        match directive.action {
            PlanAction::Approve => self.approve_plan(ctx, plan).await,
            PlanAction::Modify => self.modify_plan(ctx, plan, &directive.feedback).await,
            PlanAction::Cancel => self.cancel_plan(plan),
            PlanAction::Status => Ok(format!(
                "Current plan status: {}\n\n{}",
                plan.status,
                render_plan(&plan)
            )),
        }
    }

    async fn approve_plan(&self, ctx: &RequestContext, mut plan: ExecutionPlan) -> Result<String> {
        plan.user_approved = true;
        plan.transition(PlanStatus::Approved)?;

        if let Some(memory) = &self.memory {
            memory
                .add_message(
                    ctx,
                    Message::user("I approve the plan. Please proceed with execution."),
                )
                .await?;
        }

        let executor = PlanExecutor::new(self.collect_tools(ctx).await);
        let outcome = executor.execute(ctx, &mut plan).await;
        // The plan's terminal status is preserved either way.
        self.plan_store.store(plan);
        let result = outcome?;

        if let Some(memory) = &self.memory {
            memory
                .add_message(ctx, Message::assistant(result.clone()))
                .await?;
        }

        Ok(result)
    }

    async fn modify_plan(
        &self,
        ctx: &RequestContext,
        plan: ExecutionPlan,
        feedback: &str,
    ) -> Result<String> {
        if let Some(memory) = &self.memory {
            memory
                .add_message(
                    ctx,
                    Message::user(format!("I'd like to modify the plan: {feedback}")),
                )
                .await?;
        }

        let generator = PlanGenerator::new(
            self.llm.clone(),
            self.collect_tools(ctx).await,
            self.system_prompt.clone(),
        );
        let mut modified = generator.modify(ctx, &plan, feedback).await?;
        modified.transition(PlanStatus::AwaitingApproval)?;

        let rendered = render_plan(&modified);
        self.plan_store.store(modified);

        let response = format!(
            "I've updated the execution plan based on your feedback:\n\n{rendered}\nDo you approve this plan? You can modify it further if needed."
        );
        if let Some(memory) = &self.memory {
            memory
                .add_message(ctx, Message::assistant(response.clone()))
                .await?;
        }
        Ok(response)
    }

    fn cancel_plan(&self, mut plan: ExecutionPlan) -> Result<String> {
        plan.transition(PlanStatus::Cancelled)?;
        self.plan_store.store(plan);
        Ok("Plan cancelled. What would you like to do instead?".to_string())
    }

    /// First-person self-description, synthesized by the LLM from the
    /// system prompt. Falls back to a static line when the LLM fails.
    async fn role_response(&self, ctx: &RequestContext) -> String {
        let Some(system_prompt) = &self.system_prompt else {
            return "I'm an AI assistant designed to help you with various tasks and answer your questions. How can I assist you today?".to_string();
        };

        let prompt = format!(
            r#"Based on the following system prompt that defines your role and capabilities,
generate a brief, natural-sounding response (3-5 sentences) introducing yourself to a user who asked what you can do.
You are named "{name}".
Do not directly quote from the system prompt, but create a conversational first-person response that captures your
purpose, expertise, and how you can help. The response should feel like a natural conversation, not like reading documentation.

System prompt:
{system_prompt}

Your response should:
1. Introduce yourself using first-person perspective, mentioning your name ("{name}")
2. Briefly explain your specialization or purpose
3. Mention 2-3 key areas you can help with
4. End with a friendly question about how you can assist the user

Response:"#,
            name = self.name
        );

        let opts = GenerateOptions::new().with_system_message(system_prompt.clone());
        match self.llm.generate(ctx, &prompt, &opts).await {
            Ok(response) => response,
            Err(err) => {
                warn!(agent = %self.name, error = %err, "role response generation failed, using fallback");
                format!(
                    "I'm {}, an AI assistant based on the role defined in my system prompt. How can I help you today?",
                    self.name
                )
            }
        }
    }

    /// Run a named task from its configuration: substitute `{var}`
    /// placeholders into the description, run the turn, and write the
    /// response to the task's output file when one is declared.
    pub async fn execute_task_from_config(
        &self,
        ctx: &RequestContext,
        task_name: &str,
        task_configs: &TaskConfigs,
        variables: &HashMap<String, String>,
    ) -> Result<String> {
        let task = task_configs.get(task_name).ok_or_else(|| {
            DroverError::Config(format!("task '{task_name}' not found in configuration"))
        })?;

        let description = substitute_variables(&task.description, variables);
        let result = self.run(ctx, &description).await?;

        if let Some(output_file) = &task.output_file {
            let path = substitute_variables(output_file, variables);
            write_output_file(&path, &result)?;
            info!(agent = %self.name, task = task_name, path = %path, "task output written");
        }

        Ok(result)
    }
}

/// Write a task result atomically with mode 0600: the content lands in a
/// temporary file that is persisted over the target path.
fn write_output_file(path: &str, content: &str) -> Result<()> {
    let target = std::path::Path::new(path);
    let dir = target.parent().filter(|p| !p.as_os_str().is_empty());

    let mut builder = tempfile::Builder::new();
    builder.prefix(".drover-task");
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile_in("."),
    }
    .map_err(|e| DroverError::Config(format!("cannot create output file for '{path}': {e}")))?;

    file.write_all(content.as_bytes())
        .map_err(|e| DroverError::Config(format!("cannot write output file '{path}': {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                DroverError::Config(format!("cannot set permissions on '{path}': {e}"))
            })?;
    }

    file.persist(target)
        .map_err(|e| DroverError::Config(format!("cannot persist output file '{path}': {e}")))?;
    Ok(())
}

fn is_role_query(input: &str) -> bool {
    let lowered = input.to_lowercase();
    ROLE_QUERIES.iter().any(|query| lowered.contains(query))
}

#[async_trait]
impl drover_core::Agent for Agent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &RequestContext, input: &str) -> Result<String> {
        Agent::run(self, ctx, input).await
    }
}
