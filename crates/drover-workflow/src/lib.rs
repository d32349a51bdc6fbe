//! # Drover Workflow
//!
//! The multi-agent orchestrator: a [`Workflow`] is a DAG of tasks assigned
//! to registered agents; the [`Orchestrator`] runs ready tasks concurrently,
//! feeds dependency results forward, tolerates partial failure, and detects
//! stalls.

pub mod handoff;
pub mod orchestrator;
pub mod registry;
pub mod workflow;

pub use handoff::{parse_handoff, Handoff};
pub use orchestrator::Orchestrator;
pub use registry::AgentRegistry;
pub use workflow::{TaskStatus, Workflow, WorkflowTask};
