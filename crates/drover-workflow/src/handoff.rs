//! Handoff directives in agent output.

use regex::Regex;
use std::sync::OnceLock;

/// A handoff an agent requested by ending its output with
/// `[HANDOFF:<agent_id>:<reason>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub agent_id: String,
    pub reason: String,
}

fn handoff_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\[HANDOFF:([^:\]]+):([^\]]*)\]\s*$").expect("static pattern")
    })
}

/// Parse a trailing handoff directive from an agent's final output.
pub fn parse_handoff(output: &str) -> Option<Handoff> {
    let captures = handoff_regex().captures(output)?;
    Some(Handoff {
        agent_id: captures[1].trim().to_string(),
        reason: captures[2].trim().to_string(),
    })
}
