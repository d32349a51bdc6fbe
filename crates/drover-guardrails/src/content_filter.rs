//! Blocked-word content filter.

use regex::Regex;

use drover_core::{DroverError, Guardrail, GuardrailAction, RequestContext, Result, Verdict};

const REPLACEMENT: &str = "****";

/// Filters a configured list of banned terms from requests and responses.
///
/// Matching is case-insensitive and bounded to whole words. Triggered text
/// has every match replaced with `****`, which never re-matches, so applying
/// the filter twice yields the same output.
#[derive(Debug)]
pub struct ContentFilter {
    blocked_words: Vec<String>,
    action: GuardrailAction,
    regex: Regex,
}

impl ContentFilter {
    /// Build a filter over the given banned terms.
    ///
    /// Terms are escaped before being joined into the match pattern, so
    /// regex metacharacters in a term match literally.
    pub fn new(blocked_words: Vec<String>, action: GuardrailAction) -> Result<Self> {
        if blocked_words.iter().all(|w| w.is_empty()) {
            return Err(DroverError::Config(
                "content filter needs at least one non-empty blocked word".into(),
            ));
        }

        let pattern = blocked_words
            .iter()
            .filter(|w| !w.is_empty())
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&format!(r"(?i)\b({pattern})\b"))
            .map_err(|e| DroverError::Config(format!("invalid content filter pattern: {e}")))?;

        Ok(Self {
            blocked_words,
            action,
            regex,
        })
    }

    /// The configured banned terms.
    pub fn blocked_words(&self) -> &[String] {
        &self.blocked_words
    }

    fn check(&self, text: &str) -> Verdict {
        if self.regex.is_match(text) {
            Verdict::triggered(self.regex.replace_all(text, REPLACEMENT).into_owned())
        } else {
            Verdict::pass(text)
        }
    }
}

impl Guardrail for ContentFilter {
    fn name(&self) -> &str {
        "content_filter"
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

    fn filter(words: &[&str]) -> ContentFilter {
        ContentFilter::new(
            words.iter().map(|w| w.to_string()).collect(),
            GuardrailAction::Redact,
        )
        .unwrap()
    }

    #[test]
    fn replaces_whole_words_case_insensitively() {
        let f = filter(&["forbidden", "banned"]);
        let ctx = RequestContext::new();

        let verdict = f.check_request(&ctx, "This is FORBIDDEN and banned.").unwrap();
        assert!(verdict.triggered);
        assert_eq!(verdict.text, "This is **** and ****.");
    }

    #[test]
    fn does_not_match_inside_words() {
        let f = filter(&["ban"]);
        let ctx = RequestContext::new();

        let verdict = f.check_request(&ctx, "urban banter").unwrap();
        assert!(!verdict.triggered);
        assert_eq!(verdict.text, "urban banter");
    }

    #[test]
    fn redaction_is_idempotent() {
        let f = filter(&["forbidden"]);
        let ctx = RequestContext::new();

        let once = f.check_request(&ctx, "a forbidden word").unwrap().text;
        let twice = f.check_request(&ctx, &once).unwrap();
        assert!(!twice.triggered);
        assert_eq!(twice.text, once);
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let f = filter(&["data.base"]);
        let ctx = RequestContext::new();

        let hit = f.check_response(&ctx, "our data.base is down").unwrap();
        assert!(hit.triggered);

        // An unescaped '.' would match any character here.
        let miss = f.check_response(&ctx, "our dataXbase is down").unwrap();
        assert!(!miss.triggered);
    }

    #[test]
    fn empty_word_list_is_a_config_error() {
        let err = ContentFilter::new(vec![], GuardrailAction::Block).unwrap_err();
        assert_eq!(err.kind(), "CONFIG_ERROR");
    }
}
