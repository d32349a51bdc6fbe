//! # Drover LLM
//!
//! The provider-agnostic half of text generation: a low-level [`ChatProvider`]
//! seam concrete clients implement, the [`LlmAdapter`] that turns any provider
//! into a full [`drover_core::Llm`] (driving the tool-call loop, including
//! parallel fan-out of batched tool calls), and the exponential-backoff
//! [`RetryPolicy`] applied to transient provider failures.

pub mod adapter;
pub mod provider;
pub mod retry;

pub use adapter::LlmAdapter;
pub use provider::{ChatCompletion, ChatMessage, ChatProvider, ChatRequest, ToolCallRequest};
pub use retry::RetryPolicy;
