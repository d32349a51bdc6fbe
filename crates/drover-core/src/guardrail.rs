//! The guardrail capability.
//!
//! Guardrails inspect and possibly transform request and response text.
//! Each guardrail reports whether it triggered and the (possibly modified)
//! text; what happens next is decided by its [`GuardrailAction`].

use crate::context::RequestContext;
use crate::error::Result;

/// What a pipeline does when a guardrail triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardrailAction {
    /// Replace the offending content with the guardrail's sentinel and
    /// continue with the modified text.
    Redact,
    /// Abort the operation with a `GuardrailBlocked` error.
    Block,
    /// Record the violation and continue with the original text.
    Log,
}

/// Outcome of a single guardrail check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the guardrail matched.
    pub triggered: bool,
    /// The text after this guardrail's rewrite (equal to the input when not
    /// triggered).
    pub text: String,
}

impl Verdict {
    /// The guardrail did not match; the text passes through unchanged.
    pub fn pass(text: impl Into<String>) -> Self {
        Self {
            triggered: false,
            text: text.into(),
        }
    }

    /// The guardrail matched and produced a rewritten text.
    pub fn triggered(text: impl Into<String>) -> Self {
        Self {
            triggered: true,
            text: text.into(),
        }
    }
}

/// A policy object over the capability set `{check_request, check_response}`.
pub trait Guardrail: Send + Sync {
    /// Name used in logs and in `GuardrailBlocked` errors.
    fn name(&self) -> &str;

    /// The action applied when this guardrail triggers.
    fn action(&self) -> GuardrailAction;

    /// Check user input before it reaches the LLM.
    fn check_request(&self, ctx: &RequestContext, text: &str) -> Result<Verdict>;

    /// Check model output before it reaches the user.
    fn check_response(&self, ctx: &RequestContext, text: &str) -> Result<Verdict>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_constructors() {
        let pass = Verdict::pass("ok");
        assert!(!pass.triggered);
        assert_eq!(pass.text, "ok");

        let hit = Verdict::triggered("****");
        assert!(hit.triggered);
        assert_eq!(hit.text, "****");
    }
}
