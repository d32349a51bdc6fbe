//! The LLM capability and its generation options.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::Result;
use crate::tool::Tool;

/// Coarse hint controlling how much of its reasoning the model is asked to
/// show. Providers without a structured reasoning parameter apply this by
/// rewriting the system message, uniformly across providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningMode {
    #[default]
    None,
    Minimal,
    Comprehensive,
}

impl ReasoningMode {
    /// The instruction appended to the system message, if any.
    pub fn instruction(&self) -> Option<&'static str> {
        match self {
            ReasoningMode::None => None,
            ReasoningMode::Minimal => {
                Some("When responding, briefly explain your thought process.")
            }
            ReasoningMode::Comprehensive => Some(
                "When responding, please think step-by-step and explain your \
                 complete reasoning process in detail.",
            ),
        }
    }

    /// Apply this mode to an optional system message: appends the instruction
    /// to an existing message, or promotes the instruction to be the message.
    pub fn apply(&self, system_message: Option<&str>) -> Option<String> {
        match (system_message, self.instruction()) {
            (Some(msg), Some(extra)) => Some(format!("{msg}\n\n{extra}")),
            (Some(msg), None) => Some(msg.to_string()),
            (None, Some(extra)) => Some(extra.to_string()),
            (None, None) => None,
        }
    }
}

/// Structured output request: a named JSON schema the provider is asked to
/// conform to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    pub name: String,
    pub schema: serde_json::Value,
}

/// Sampling configuration for a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    #[serde(default)]
    pub reasoning: ReasoningMode,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop_sequences: Vec::new(),
            reasoning: ReasoningMode::default(),
        }
    }
}

/// Options for a single generation call.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub config: LlmConfig,
    pub system_message: Option<String>,
    pub response_format: Option<ResponseFormat>,
    /// Tenant hint forwarded to providers that attribute usage per caller.
    pub tenant_hint: Option<String>,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: LlmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn with_reasoning(mut self, mode: ReasoningMode) -> Self {
        self.config.reasoning = mode;
        self
    }

    pub fn with_tenant_hint(mut self, tenant: impl Into<String>) -> Self {
        self.tenant_hint = Some(tenant.into());
        self
    }

    /// The system message after applying the reasoning mode.
    pub fn effective_system_message(&self) -> Option<String> {
        self.config.reasoning.apply(self.system_message.as_deref())
    }
}

/// A large language model provider.
#[async_trait]
pub trait Llm: Send + Sync {
    /// Generate text for a prompt.
    async fn generate(
        &self,
        ctx: &RequestContext,
        prompt: &str,
        opts: &GenerateOptions,
    ) -> Result<String>;

    /// Generate text with a set of tools the model may call. The adapter
    /// drives the tool-call loop to completion and returns the final text.
    async fn generate_with_tools(
        &self,
        ctx: &RequestContext,
        prompt: &str,
        tools: &[Arc<dyn Tool>],
        opts: &GenerateOptions,
    ) -> Result<String>;

    /// Name of the provider, e.g. for logs.
    fn name(&self) -> &str;
}
