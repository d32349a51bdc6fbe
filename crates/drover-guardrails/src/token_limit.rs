//! Approximate token-limit guardrail.

use drover_core::{Guardrail, GuardrailAction, RequestContext, Result, Verdict};

/// Counts tokens in a piece of text.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Whitespace-word approximation of a tokenizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Which part of over-long text survives truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TruncateMode {
    /// Keep the tail.
    Start,
    /// Keep equal-size head and tail around an ellipsis.
    Middle,
    /// Keep the head, append an ellipsis.
    #[default]
    End,
}

/// Truncates text exceeding a token budget.
///
/// Truncation operates on whole words, so word boundaries are always
/// preserved; text at or below the limit passes unchanged.
pub struct TokenLimit {
    max_tokens: usize,
    counter: Box<dyn TokenCounter>,
    action: GuardrailAction,
    mode: TruncateMode,
}

impl TokenLimit {
    /// Limit with the default word counter and `End` truncation.
    pub fn new(max_tokens: usize, action: GuardrailAction) -> Self {
        Self {
            max_tokens,
            counter: Box::new(WordCounter),
            action,
            mode: TruncateMode::default(),
        }
    }

    pub fn with_counter(mut self, counter: Box<dyn TokenCounter>) -> Self {
        self.counter = counter;
        self
    }

    pub fn with_mode(mut self, mode: TruncateMode) -> Self {
        self.mode = mode;
        self
    }

    fn check(&self, text: &str) -> Verdict {
        if self.counter.count_tokens(text) <= self.max_tokens {
            return Verdict::pass(text);
        }
        Verdict::triggered(self.truncate(text))
    }

    fn truncate(&self, text: &str) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= self.max_tokens {
            return text.to_string();
        }

        match self.mode {
            TruncateMode::Start => words[words.len() - self.max_tokens..].join(" "),
            TruncateMode::Middle => {
                let half = self.max_tokens / 2;
                format!(
                    "{} ... {}",
                    words[..half].join(" "),
                    words[words.len() - half..].join(" ")
                )
            }
            TruncateMode::End => format!("{} ...", words[..self.max_tokens].join(" ")),
        }
    }
}

impl Guardrail for TokenLimit {
    fn name(&self) -> &str {
        "token_limit"
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

    fn limit(max: usize, mode: TruncateMode) -> TokenLimit {
        TokenLimit::new(max, GuardrailAction::Redact).with_mode(mode)
    }

    #[test]
    fn text_under_the_limit_is_unchanged() {
        let rail = limit(10, TruncateMode::End);
        let ctx = RequestContext::new();

        let verdict = rail.check_request(&ctx, "short enough").unwrap();
        assert!(!verdict.triggered);
        assert_eq!(verdict.text, "short enough");
    }

    #[test]
    fn end_mode_keeps_the_head() {
        let rail = limit(3, TruncateMode::End);
        let ctx = RequestContext::new();

        let verdict = rail.check_request(&ctx, "one two three four five").unwrap();
        assert!(verdict.triggered);
        assert_eq!(verdict.text, "one two three ...");
    }

    #[test]
    fn start_mode_keeps_the_tail() {
        let rail = limit(2, TruncateMode::Start);
        let ctx = RequestContext::new();

        let verdict = rail.check_request(&ctx, "one two three four five").unwrap();
        assert_eq!(verdict.text, "four five");
    }

    #[test]
    fn middle_mode_keeps_both_ends() {
        let rail = limit(4, TruncateMode::Middle);
        let ctx = RequestContext::new();

        let verdict = rail
            .check_response(&ctx, "a b c d e f g h")
            .unwrap();
        assert_eq!(verdict.text, "a b ... g h");
    }

    #[test]
    fn truncation_preserves_word_boundaries() {
        let rail = limit(2, TruncateMode::End);
        let ctx = RequestContext::new();

        let verdict = rail
            .check_request(&ctx, "alpha bravo charlie delta")
            .unwrap();
        for word in verdict.text.split_whitespace() {
            assert!(["alpha", "bravo", "..."].contains(&word));
        }
    }
}
