//! Personally-identifiable-information filter.

use regex::Regex;

use drover_core::{Guardrail, GuardrailAction, RequestContext, Result, Verdict};

/// Redacts common PII shapes: email addresses, phone numbers, US social
/// security numbers, credit card numbers and IPv4 addresses.
///
/// Each match is replaced with `[REDACTED {category}]`. Patterns run in a
/// fixed order so cumulative rewrites are deterministic, and the replacement
/// text never re-matches any pattern, making redaction idempotent.
pub struct PiiFilter {
    patterns: Vec<(&'static str, Regex)>,
    action: GuardrailAction,
}

impl PiiFilter {
    pub fn new(action: GuardrailAction) -> Self {
        let patterns = vec![
            (
                "credit_card",
                Regex::new(r"\b\d{4}[- ]?\d{4}[- ]?\d{4}[- ]?\d{4}\b").expect("static pattern"),
            ),
            (
                "email",
                Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
                    .expect("static pattern"),
            ),
            (
                "ip_address",
                Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").expect("static pattern"),
            ),
            (
                "phone",
                Regex::new(r"\b(\+\d{1,2}\s)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}\b")
                    .expect("static pattern"),
            ),
            (
                "ssn",
                Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("static pattern"),
            ),
        ];

        Self { patterns, action }
    }

    fn check(&self, text: &str) -> Verdict {
        let mut modified = text.to_string();
        let mut triggered = false;

        for (category, pattern) in &self.patterns {
            if pattern.is_match(&modified) {
                triggered = true;
                let replacement = format!("[REDACTED {category}]");
                modified = pattern.replace_all(&modified, replacement.as_str()).into_owned();
            }
        }

        if triggered {
            Verdict::triggered(modified)
        } else {
            Verdict::pass(text)
        }
    }
}

impl Guardrail for PiiFilter {
    fn name(&self) -> &str {
        "pii_filter"
    }

    fn action(&self) -> GuardrailAction {
        self.action
    }

    fn check_request(&self, _ctx: &RequestContext, text: &str) -> Result<Verdict> {
        Ok(self.check(text))
    }

    fn check_response(&self, _ctx: &RequestContext, text: &str) -> Result<Verdict> {
        Ok(self.check(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_emails_and_ssns() {
        let f = PiiFilter::new(GuardrailAction::Redact);
        let ctx = RequestContext::new();

        let verdict = f
            .check_request(&ctx, "Reach me at jo@example.com, SSN 123-45-6789.")
            .unwrap();
        assert!(verdict.triggered);
        assert_eq!(
            verdict.text,
            "Reach me at [REDACTED email], SSN [REDACTED ssn]."
        );
    }

    #[test]
    fn redacts_card_numbers_before_phone_pattern_sees_them() {
        let f = PiiFilter::new(GuardrailAction::Redact);
        let ctx = RequestContext::new();

        let verdict = f
            .check_response(&ctx, "card 4111 1111 1111 1111 on file")
            .unwrap();
        assert!(verdict.triggered);
        assert_eq!(verdict.text, "card [REDACTED credit_card] on file");
    }

    #[test]
    fn clean_text_passes_unchanged() {
        let f = PiiFilter::new(GuardrailAction::Redact);
        let ctx = RequestContext::new();

        let verdict = f.check_request(&ctx, "nothing personal here").unwrap();
        assert!(!verdict.triggered);
        assert_eq!(verdict.text, "nothing personal here");
    }

    #[test]
    fn redaction_is_idempotent() {
        let f = PiiFilter::new(GuardrailAction::Redact);
        let ctx = RequestContext::new();

        let once = f
            .check_request(&ctx, "ping 10.0.0.1 and mail root@host.example")
            .unwrap()
            .text;
        let twice = f.check_request(&ctx, &once).unwrap();
        assert!(!twice.triggered);
        assert_eq!(twice.text, once);
    }
}
