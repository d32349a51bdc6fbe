//! The tool capability.
//!
//! Tools extend an agent beyond text generation: calculators, search, file
//! access, remote MCP capabilities. A tool is a value: callers never mutate
//! its internal state, so one instance can be shared behind an [`Arc`]
//! between the registry, the plan executor and the LLM adapter.
//!
//! [`Arc`]: std::sync::Arc

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::Result;

/// Declared specification of a single tool parameter.
///
/// Parameter maps use [`BTreeMap`] so that schemas derived from them are
/// deterministic across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// JSON type of the parameter ("string", "number", "boolean", ...).
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Closed set of admissible values, when the parameter is enumerated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<serde_json::Value>>,
    /// Element spec for array-typed parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterSpec>>,
}

impl ParameterSpec {
    /// A required parameter of the given type.
    pub fn required(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            required: true,
            default: None,
            allowed_values: None,
            items: None,
        }
    }

    /// An optional parameter of the given type.
    pub fn optional(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(kind, description)
        }
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_allowed_values(mut self, values: Vec<serde_json::Value>) -> Self {
        self.allowed_values = Some(values);
        self
    }

    pub fn with_items(mut self, items: ParameterSpec) -> Self {
        self.items = Some(Box::new(items));
        self
    }
}

/// An externally callable capability with a declared parameter schema.
///
/// `execute` receives a JSON object of arguments serialized as a string (the
/// form the LLM tool-call protocol produces); `run` is the older entry point
/// taking free-form input. Both exist for backward compatibility and default
/// to each other, so implementations override exactly one.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the registry and the tool-call protocol route on.
    fn name(&self) -> &str;

    /// Human-readable description surfaced to the LLM.
    fn description(&self) -> &str;

    /// Declared parameters, keyed by parameter name.
    fn parameters(&self) -> BTreeMap<String, ParameterSpec> {
        BTreeMap::new()
    }

    /// Execute the tool with a JSON argument string.
    async fn execute(&self, ctx: &RequestContext, args: &str) -> Result<String> {
        self.run(ctx, args).await
    }

    /// Execute the tool with free-form input. Equivalent to [`Self::execute`].
    async fn run(&self, ctx: &RequestContext, input: &str) -> Result<String> {
        self.execute(ctx, input).await
    }
}
