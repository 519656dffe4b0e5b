#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Request-side data model shared by every backend.

use bon::Builder;
use serde::{Deserialize, Serialize};

/// The learner's code for one challenge, tagged with its language.
#[derive(Debug, Clone, Default, Builder, Serialize, Deserialize)]
#[builder(on(String, into))]
pub struct Submission {
    /// Source text exactly as submitted.
    #[builder(getter)]
    pub code:     String,
    /// Language tag, e.g. `typescript` or `rust`.
    #[builder(getter)]
    pub language: String,
}

impl Submission {
    /// Creates a submission from code and a language tag.
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code:     code.into(),
            language: language.into(),
        }
    }
}

/// One input/expected-output pair with a human-readable description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Shown to the learner next to the verdict.
    pub description:     String,
    /// Literal input; JSON, a number, or a bare string.
    #[serde(default)]
    pub input:           String,
    /// Expected normalized output, or a semantic tag for structural grading.
    pub expected_output: String,
}

impl TestCase {
    /// Creates a test case.
    pub fn new(
        description: impl Into<String>,
        input: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            description:     description.into(),
            input:           input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// The external request shape: a submission, its test cases and the reference
/// solution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    /// Learner source code.
    pub code:          String,
    /// Language tag.
    pub language:      String,
    /// Ordered test cases.
    #[serde(default)]
    pub test_cases:    Vec<TestCase>,
    /// Reference solution in the same language; may be empty.
    #[serde(default)]
    pub solution_code: String,
}

impl GradeRequest {
    /// Splits the request into the submission it carries.
    pub fn submission(&self) -> Submission {
        Submission::new(self.code.clone(), self.language.clone())
    }
}
