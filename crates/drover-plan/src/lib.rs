//! # Drover Plan
//!
//! The plan lifecycle: an LLM proposes an ordered sequence of tool
//! invocations, the plan is stored awaiting human approval, and on approval
//! the executor runs it step by step under the guarded status machine.

pub mod executor;
pub mod generator;
pub mod plan;
pub mod store;

pub use executor::PlanExecutor;
pub use generator::PlanGenerator;
pub use plan::{parse_plan_response, render_plan, ExecutionPlan, PlanStatus, PlanStep};
pub use store::PlanStore;
