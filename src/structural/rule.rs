#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fmt, sync::Arc};

use anyhow::{Context, Result};
use regex::Regex;

/// Predicate evaluated against the submission's source text.
type RulePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync + 'static>;

/// A pure check on source text, with the messages shown when it does not hold.
#[derive(Clone)]
pub struct Rule {
    /// Returns true when the source satisfies the rule.
    predicate:    RulePredicate,
    /// What the learner should have written.
    expected:     String,
    /// What is reported when the predicate fails.
    fail_message: String,
}

impl Rule {
    /// Creates a rule from an arbitrary predicate.
    pub fn new<F>(predicate: F, expected: impl Into<String>, fail_message: impl Into<String>) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate:    Arc::new(predicate),
            expected:     expected.into(),
            fail_message: fail_message.into(),
        }
    }

    /// A rule that holds when `regex` matches somewhere in the source.
    pub fn matching(
        regex: Regex,
        expected: impl Into<String>,
        fail_message: impl Into<String>,
    ) -> Self {
        Self::new(move |code| regex.is_match(code), expected, fail_message)
    }

    /// Compiles `pattern` and wraps it with [`Rule::matching`].
    pub fn pattern(
        pattern: &str,
        expected: impl Into<String>,
        fail_message: impl Into<String>,
    ) -> Result<Self> {
        let regex =
            Regex::new(pattern).with_context(|| format!("Invalid rule pattern: {pattern}"))?;
        Ok(Self::matching(regex, expected, fail_message))
    }

    /// A rule that holds when `needle` occurs verbatim in the source.
    pub fn contains(
        needle: impl Into<String>,
        expected: impl Into<String>,
        fail_message: impl Into<String>,
    ) -> Self {
        let needle = needle.into();
        Self::new(move |code| code.contains(needle.as_str()), expected, fail_message)
    }

    /// Evaluates the rule against `code`.
    pub fn check(&self, code: &str) -> bool {
        (self.predicate)(code)
    }

    /// What the learner should have written.
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Message reported when the rule fails.
    pub fn fail_message(&self) -> &str {
        &self.fail_message
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("expected", &self.expected)
            .field("fail_message", &self.fail_message)
            .finish()
    }
}
