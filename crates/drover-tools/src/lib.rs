//! # Drover Tools
//!
//! The tool registry agents and executors resolve tool names against, and
//! the JSON-Schema derivation that turns declared parameter specs into the
//! schema objects the LLM tool-call protocol expects.

pub mod registry;
pub mod schema;

pub use registry::ToolRegistry;
pub use schema::{json_schema, parameters_from_schema};
