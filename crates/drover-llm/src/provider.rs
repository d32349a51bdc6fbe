//! The low-level chat-provider seam.
//!
//! Concrete clients (OpenAI-compatible, Anthropic, local runtimes) implement
//! [`ChatProvider`]; everything above it — option handling, retries, the
//! tool-call loop — lives in the [`adapter`](crate::adapter) and is shared by
//! all providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use drover_core::{LlmConfig, RequestContext, ResponseFormat, Result, Role};

/// One tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned call id; tool results are keyed back to it.
    pub id: String,
    pub name: String,
    /// Arguments as a JSON object serialized to a string.
    pub arguments: String,
}

/// One message in a provider conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// For `tool` messages: the call id this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// For `tool` messages: the tool that produced the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// For `assistant` messages: tool calls the model made in this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_name: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// The assistant turn that requested the given tool calls.
    pub fn assistant_with_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCallRequest>,
    ) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// A tool-result message linked to its originating call.
    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            tool_name: Some(tool_name.into()),
            ..Self::new(Role::Tool, content)
        }
    }
}

/// A full request to the provider.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// JSON-Schema descriptions of the tools the model may call.
    pub tool_schemas: Vec<serde_json::Value>,
    pub config: LlmConfig,
    pub response_format: Option<ResponseFormat>,
    /// Tenant attribution hint, when the provider supports one.
    pub tenant_hint: Option<String>,
}

/// The provider's reply to one request: final text, or tool calls to run,
/// or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatCompletion {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatCompletion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: String::new(),
            tool_calls,
        }
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run one completion round trip.
    async fn chat(&self, ctx: &RequestContext, request: ChatRequest) -> Result<ChatCompletion>;

    /// Provider name for logs and [`drover_core::Llm::name`].
    fn name(&self) -> &str;
}
