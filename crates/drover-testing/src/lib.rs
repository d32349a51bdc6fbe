//! # Drover Testing
//!
//! Reusable mocks for exercising agents without a real provider: scripted
//! LLMs and chat providers, counting and sleeping tools. Production code
//! never depends on this crate; test suites across the workspace do.

pub mod mock_llm;
pub mod mock_tools;

pub use mock_llm::{ScriptedLlm, ScriptedProvider, StaticLlm};
pub use mock_tools::{FailingTool, MockTool};
