//! Plan-lifecycle directives embedded in user input.
//!
//! A turn like `approve plan 3f2a…` targets a stored plan instead of
//! starting a new one. The grammar is
//! `<action> plan <task-id> [: <feedback>]` with
//! `action ∈ {approve, modify, cancel, status}`, case-insensitive on the
//! action. Anything that does not match falls through to the normal turn
//! flow.

use regex::Regex;
use std::sync::OnceLock;

/// The lifecycle operation a directive requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Approve,
    Modify,
    Cancel,
    Status,
}

/// A parsed plan directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanDirective {
    pub action: PlanAction,
    pub task_id: String,
    /// Free-form text after the `:`; feedback for `modify`.
    pub feedback: String,
}

fn directive_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?is)^\s*(approve|modify|cancel|status)\s+plan\s+([A-Za-z0-9-]+)\s*(?::\s*(.*?))?\s*$")
            .expect("static pattern")
    })
}

impl PlanDirective {
    /// Try to read a directive out of a turn's input.
    pub fn parse(input: &str) -> Option<Self> {
        let captures = directive_regex().captures(input)?;
        let action = match captures[1].to_ascii_lowercase().as_str() {
            "approve" => PlanAction::Approve,
            "modify" => PlanAction::Modify,
            "cancel" => PlanAction::Cancel,
            "status" => PlanAction::Status,
            _ => return None,
        };
        Some(Self {
            action,
            task_id: captures[2].to_string(),
            feedback: captures
                .get(3)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_action() {
        for (text, action) in [
            ("approve plan abc-123", PlanAction::Approve),
            ("modify plan abc-123: add a step", PlanAction::Modify),
            ("cancel plan abc-123", PlanAction::Cancel),
            ("status plan abc-123", PlanAction::Status),
        ] {
            let directive = PlanDirective::parse(text).unwrap();
            assert_eq!(directive.action, action);
            assert_eq!(directive.task_id, "abc-123");
        }
    }

    #[test]
    fn action_is_case_insensitive() {
        let directive = PlanDirective::parse("APPROVE PLAN ABC-123").unwrap();
        assert_eq!(directive.action, PlanAction::Approve);
        assert_eq!(directive.task_id, "ABC-123");
    }

    #[test]
    fn feedback_follows_the_colon() {
        let directive =
            PlanDirective::parse("modify plan 42: swap steps one\nand two").unwrap();
        assert_eq!(directive.feedback, "swap steps one\nand two");
    }

    #[test]
    fn missing_feedback_is_empty() {
        let directive = PlanDirective::parse("approve plan 42").unwrap();
        assert!(directive.feedback.is_empty());
    }

    #[test]
    fn ordinary_turns_do_not_parse() {
        assert!(PlanDirective::parse("what is the capital of France?").is_none());
        assert!(PlanDirective::parse("approve the plan please").is_none());
        assert!(PlanDirective::parse("approve plan").is_none());
        assert!(PlanDirective::parse("discard plan 42").is_none());
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let directive = PlanDirective::parse("  approve plan 42  ").unwrap();
        assert_eq!(directive.task_id, "42");
    }
}
