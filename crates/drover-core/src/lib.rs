//! # Drover Core
//!
//! Core traits and types for the Drover agent framework: the request context
//! envelope, the shared error taxonomy, and the capability traits (LLM, tool,
//! guardrail, memory, MCP server, agent) that the other crates implement and
//! compose.

pub mod agent;
pub mod context;
pub mod error;
pub mod guardrail;
pub mod llm;
pub mod mcp;
pub mod memory;
pub mod message;
pub mod tool;

pub use agent::Agent;
pub use context::RequestContext;
pub use error::{DroverError, Result};
pub use guardrail::{Guardrail, GuardrailAction, Verdict};
pub use llm::{GenerateOptions, Llm, LlmConfig, ReasoningMode, ResponseFormat};
pub use mcp::{McpServer, McpToolDescriptor};
pub use memory::{Memory, MessageQuery};
pub use message::{Message, Role};
pub use tool::{ParameterSpec, Tool};
