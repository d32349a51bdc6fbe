//! # Drover Agent
//!
//! The per-turn agent runtime: an [`Agent`] couples an LLM, optional
//! memory, tools (local and MCP), guardrails and a system prompt into a
//! single `run` operation, with plan generation and human approval gating
//! tool use. YAML-based agent and task configuration lives in
//! [`config`].

pub mod agent;
pub mod config;
pub mod directive;

pub use agent::{Agent, AgentBuilder};
pub use config::{
    format_system_prompt, load_agent_configs, load_agent_configs_from_dir, load_task_configs,
    load_task_configs_from_dir, substitute_variables, AgentConfig, AgentConfigs, TaskConfig,
    TaskConfigs,
};
pub use directive::{PlanAction, PlanDirective};
