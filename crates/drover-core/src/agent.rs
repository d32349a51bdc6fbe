//! The agent capability.
//!
//! This is the seam the workflow orchestrator schedules over: anything that
//! can take one turn of input and produce a response. The full runtime lives
//! in `drover-agent`; orchestration code depends only on this trait.

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::Result;

/// A runtime object that couples an LLM, optional memory, tools and
/// guardrails into a single per-turn operation.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Name identifying the agent, e.g. in workflow task assignments.
    fn name(&self) -> &str;

    /// Run one turn: take the user input, produce the response.
    async fn run(&self, ctx: &RequestContext, input: &str) -> Result<String>;
}
