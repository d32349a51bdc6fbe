//! Workspace-wide error taxonomy.

use thiserror::Error;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, DroverError>;

/// Errors surfaced by the agent execution core.
///
/// These are kinds, not provider-specific types: adapters translate their
/// underlying failures into the matching kind so that policy code (retry,
/// guardrails, plan lifecycle) can dispatch on them.
#[derive(Debug, Error)]
pub enum DroverError {
    /// A required option was missing at construction time.
    #[error("configuration error: {0}")]
    Config(String),

    /// The provider rejected the caller's credentials. Never retried.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network-level failure talking to a provider or tool. Retried per policy.
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider backpressure. Retried with backoff.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The provider returned content that could not be parsed. Not retried.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A guardrail with the Block action rejected the text.
    #[error("blocked by guardrail '{guardrail}'")]
    GuardrailBlocked { guardrail: String },

    /// Plan JSON was invalid or referenced an unknown tool.
    #[error("failed to parse execution plan: {0}")]
    PlanParse(String),

    /// A tool name did not resolve in the registry at execution time.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// An operation was attempted in a state that forbids it, e.g. executing
    /// an unapproved plan or cancelling a terminal one.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A tool invocation failed; carries the tool name and the underlying
    /// message. The plan executor annotates the step index on top.
    #[error("tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// A workflow task failed; surfaced when that task is the final one.
    #[error("task '{task}' failed: {message}")]
    TaskFailed { task: String, message: String },

    /// A workflow task declared a dependency on an id that does not exist.
    #[error("task '{task}' depends on unknown task '{dependency}'")]
    DanglingDependency { task: String, dependency: String },

    /// The workflow can make no further progress.
    #[error("workflow stalled: {0}")]
    WorkflowStalled(String),

    /// A tenant id was required but absent from the request context.
    #[error("no tenant id found in request context")]
    NoTenant,

    /// The request context was cancelled or its deadline passed.
    #[error("request cancelled")]
    Cancelled,
}

impl DroverError {
    /// Whether the retry policy may re-attempt the failed operation.
    ///
    /// Only transient transport failures and provider backpressure qualify;
    /// schema-validation, auth and content-policy errors never do.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DroverError::Transport(_) | DroverError::RateLimited(_)
        )
    }

    /// Stable code suitable for structured logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            DroverError::Config(_) => "CONFIG_ERROR",
            DroverError::Auth(_) => "AUTH_ERROR",
            DroverError::Transport(_) => "TRANSPORT_ERROR",
            DroverError::RateLimited(_) => "RATE_LIMITED",
            DroverError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            DroverError::GuardrailBlocked { .. } => "GUARDRAIL_BLOCKED",
            DroverError::PlanParse(_) => "PLAN_PARSE_ERROR",
            DroverError::UnknownTool(_) => "UNKNOWN_TOOL",
            DroverError::IllegalState(_) => "ILLEGAL_STATE",
            DroverError::ToolExecution { .. } => "TOOL_EXECUTION_ERROR",
            DroverError::TaskFailed { .. } => "TASK_FAILED",
            DroverError::DanglingDependency { .. } => "DANGLING_DEPENDENCY",
            DroverError::WorkflowStalled(_) => "WORKFLOW_STALLED",
            DroverError::NoTenant => "NO_TENANT",
            DroverError::Cancelled => "CANCELLED",
        }
    }
}

impl From<serde_json::Error> for DroverError {
    fn from(err: serde_json::Error) -> Self {
        DroverError::MalformedResponse(err.to_string())
    }
}

impl From<std::io::Error> for DroverError {
    fn from(err: std::io::Error) -> Self {
        DroverError::Transport(err.to_string())
    }
}
