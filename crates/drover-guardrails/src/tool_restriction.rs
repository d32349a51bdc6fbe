//! Tool allow-list guardrail.

use regex::Regex;

use drover_core::{Guardrail, GuardrailAction, RequestContext, Result, Verdict};

/// Restricts which tools a request may reference.
///
/// Tool references are extracted with a `use tool <name>` pattern; a
/// reference outside the allow-list is rewritten to
/// `use tool [RESTRICTED TOOL: {name} is not allowed]`. Responses are never
/// checked; the restriction applies to requests only.
pub struct ToolRestriction {
    allowed_tools: Vec<String>,
    action: GuardrailAction,
    regex: Regex,
}

impl ToolRestriction {
    pub fn new(allowed_tools: Vec<String>, action: GuardrailAction) -> Self {
        Self {
            allowed_tools,
            action,
            regex: Regex::new(r"(?i)use\s+tool\s+([a-z0-9_]+)").expect("static pattern"),
        }
    }

    fn is_allowed(&self, tool_name: &str) -> bool {
        self.allowed_tools
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(tool_name))
    }
}

impl Guardrail for ToolRestriction {
    fn name(&self) -> &str {
        "tool_restriction"
    }

    fn action(&self) -> GuardrailAction {
        self.action
    }

    fn check_request(&self, _ctx: &RequestContext, text: &str) -> Result<Verdict> {
        let mut triggered = false;
        let mut modified = text.to_string();

        for capture in self.regex.captures_iter(text) {
            let full_match = capture.get(0).map(|m| m.as_str()).unwrap_or_default();
            let tool_name = capture.get(1).map(|m| m.as_str()).unwrap_or_default();
            if tool_name.is_empty() || self.is_allowed(tool_name) {
                continue;
            }

            triggered = true;
            modified = modified.replace(
                full_match,
                &format!(
                    "use tool [RESTRICTED TOOL: {} is not allowed]",
                    tool_name.to_lowercase()
                ),
            );
        }

        if triggered {
            Ok(Verdict::triggered(modified))
        } else {
            Ok(Verdict::pass(text))
        }
    }

    fn check_response(&self, _ctx: &RequestContext, text: &str) -> Result<Verdict> {
        Ok(Verdict::pass(text))
    }
}
