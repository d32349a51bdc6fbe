//! # Drover Guardrails
//!
//! Policy filters applied to request and response text around every LLM
//! call: a composable [`GuardrailPipeline`] plus the standard rails
//! (content filter, PII filter, token limit, tool restriction).

pub mod content_filter;
pub mod pii_filter;
pub mod pipeline;
pub mod token_limit;
pub mod tool_restriction;

pub use content_filter::ContentFilter;
pub use pii_filter::PiiFilter;
pub use pipeline::GuardrailPipeline;
pub use token_limit::{TokenCounter, TokenLimit, TruncateMode, WordCounter};
pub use tool_restriction::ToolRestriction;
