//! # Drover
//!
//! An agent execution core: per-turn agents that couple an LLM with
//! memory, tools (local and MCP), guardrails and human-approved execution
//! plans, plus a workflow orchestrator that composes several agents into a
//! dependency-ordered task graph.
//!
//! This facade re-exports the workspace crates; depend on it for the whole
//! framework or on the individual `drover-*` crates for a slimmer build.
//!
//! ## Example
//!
//! ```rust,ignore
//! use drover::{Agent, GuardrailPipeline, RequestContext};
//!
//! let agent = Agent::builder()
//!     .with_llm(llm)
//!     .with_memory(memory)
//!     .with_tool(calculator)
//!     .with_system_prompt("You are a careful research assistant.")
//!     .build()?;
//!
//! let ctx = RequestContext::new()
//!     .with_tenant("acme")
//!     .with_conversation("conv-1");
//! let reply = agent.run(&ctx, "Compute 6*7.").await?;
//! ```

pub use drover_core::{
    Agent as AgentHandle, DroverError, GenerateOptions, Guardrail, GuardrailAction, Llm,
    LlmConfig, McpServer, McpToolDescriptor, Memory, Message, MessageQuery, ParameterSpec,
    ReasoningMode, RequestContext, ResponseFormat, Result, Role, Tool, Verdict,
};

pub use drover_agent::{
    format_system_prompt, load_agent_configs, load_agent_configs_from_dir, load_task_configs,
    load_task_configs_from_dir, substitute_variables, Agent, AgentBuilder, AgentConfig,
    AgentConfigs, PlanAction, PlanDirective, TaskConfig, TaskConfigs,
};

pub use drover_guardrails::{
    ContentFilter, GuardrailPipeline, PiiFilter, TokenCounter, TokenLimit, ToolRestriction,
    TruncateMode, WordCounter,
};

pub use drover_llm::{
    ChatCompletion, ChatMessage, ChatProvider, ChatRequest, LlmAdapter, RetryPolicy,
    ToolCallRequest,
};

pub use drover_memory::{ConversationBuffer, KeyScheme};

pub use drover_mcp::{HttpServerConfig, McpClient, RemoteTool, StdioServerConfig};

pub use drover_plan::{
    parse_plan_response, render_plan, ExecutionPlan, PlanExecutor, PlanGenerator, PlanStatus,
    PlanStep, PlanStore,
};

pub use drover_tools::{json_schema, parameters_from_schema, ToolRegistry};

pub use drover_workflow::{
    parse_handoff, AgentRegistry, Handoff, Orchestrator, TaskStatus, Workflow, WorkflowTask,
};
