#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use bon::Builder;
use serde::{Deserialize, Serialize};

/// Summary shown when every test case passes.
pub const ALL_PASSED: &str = "All tests passed! Great job!";

#[derive(Debug, Clone, Default, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(on(String, into))]
/// Verdict for a single test case
pub struct TestResult {
    /// * `description`: copied from the test case
    #[builder(getter)]
    pub description: String,
    /// * `passed`: whether the case passed
    #[builder(default)]
    pub passed:      bool,
    /// * `expected`: what the grader looked for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected:    Option<String>,
    /// * `actual`: what the grader found instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual:      Option<String>,
}

impl TestResult {
    /// A passing result carrying only the description.
    pub fn pass(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            passed:      true,
            expected:    None,
            actual:      None,
        }
    }

    /// A failing result with what was expected and what was found.
    pub fn fail(
        description: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            passed:      false,
            expected:    Some(expected.into()),
            actual:      Some(actual.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// The uniform result of one grading call, whichever backend produced it
pub struct GradingResult {
    /// True iff every test result passed
    pub passed:       bool,
    /// One entry per test case, in order; empty for precondition failures
    pub test_results: Vec<TestResult>,
    /// Human-readable summary
    pub output:       String,
    /// Detail of the most recent error, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error:        Option<String>,
}

impl GradingResult {
    /// Aggregates per-test results into a verdict with the templated summary.
    pub fn from_results(test_results: Vec<TestResult>) -> Self {
        let passed = !test_results.is_empty() && test_results.iter().all(|r| r.passed);
        let output = summarize(&test_results);
        Self {
            passed,
            test_results,
            output,
            error: None,
        }
    }

    /// A whole-call failure that carries no per-test results.
    pub fn rejected(output: impl Into<String>) -> Self {
        Self {
            passed:       false,
            test_results: Vec::new(),
            output:       output.into(),
            error:        None,
        }
    }

    /// Attaches an error detail.
    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    /// Number of passing test results.
    pub fn pass_count(&self) -> usize {
        self.test_results.iter().filter(|r| r.passed).count()
    }
}

impl Display for GradingResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.output)?;
        if let Some(error) = &self.error {
            write!(f, " ({error})")?;
        }
        Ok(())
    }
}

/// "All tests passed! Great job!" or "`pass`/`total` tests passed."
pub fn summarize(results: &[TestResult]) -> String {
    let pass_count = results.iter().filter(|r| r.passed).count();
    if !results.is_empty() && pass_count == results.len() {
        ALL_PASSED.to_string()
    } else {
        format!("{}/{} tests passed.", pass_count, results.len())
    }
}
