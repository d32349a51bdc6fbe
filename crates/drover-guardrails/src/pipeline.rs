//! Ordered guardrail pipeline.

use std::sync::Arc;

use tracing::warn;

use drover_core::{DroverError, Guardrail, GuardrailAction, RequestContext, Result};

/// An ordered sequence of guardrails applied to input and output text.
///
/// Guardrails compose left-to-right: a `Redact` rail hands its rewritten
/// text to the next rail, so the final text reflects cumulative redactions.
/// A triggered `Block` rail short-circuits the pipeline with a
/// `GuardrailBlocked` error; a triggered `Log` rail records the violation
/// and passes the original text through.
#[derive(Clone, Default)]
pub struct GuardrailPipeline {
    rails: Vec<Arc<dyn Guardrail>>,
}

impl GuardrailPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rails(rails: Vec<Arc<dyn Guardrail>>) -> Self {
        Self { rails }
    }

    /// Append a guardrail to the pipeline.
    pub fn with_rail(mut self, rail: Arc<dyn Guardrail>) -> Self {
        self.rails.push(rail);
        self
    }

    pub fn len(&self) -> usize {
        self.rails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rails.is_empty()
    }

    /// Apply every rail's request check to user input.
    pub fn process_input(&self, ctx: &RequestContext, text: &str) -> Result<String> {
        self.process(ctx, text, Direction::Request)
    }

    /// Apply every rail's response check to model output.
    pub fn process_output(&self, ctx: &RequestContext, text: &str) -> Result<String> {
        self.process(ctx, text, Direction::Response)
    }

    fn process(&self, ctx: &RequestContext, text: &str, direction: Direction) -> Result<String> {
        let mut current = text.to_string();

        for rail in &self.rails {
            let verdict = match direction {
                Direction::Request => rail.check_request(ctx, &current)?,
                Direction::Response => rail.check_response(ctx, &current)?,
            };
            if !verdict.triggered {
                continue;
            }

            match rail.action() {
                GuardrailAction::Redact => {
                    warn!(
                        guardrail = rail.name(),
                        direction = direction.as_str(),
                        "guardrail triggered, content redacted"
                    );
                    current = verdict.text;
                }
                GuardrailAction::Block => {
                    warn!(
                        guardrail = rail.name(),
                        direction = direction.as_str(),
                        "guardrail triggered, request blocked"
                    );
                    return Err(DroverError::GuardrailBlocked {
                        guardrail: rail.name().to_string(),
                    });
                }
                GuardrailAction::Log => {
                    warn!(
                        guardrail = rail.name(),
                        direction = direction.as_str(),
                        "guardrail triggered, violation logged"
                    );
                }
            }
        }

        Ok(current)
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Request,
    Response,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }
}

impl std::fmt::Debug for GuardrailPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.rails.iter().map(|r| r.name()).collect();
        f.debug_struct("GuardrailPipeline")
            .field("rails", &names)
            .finish()
    }
}
