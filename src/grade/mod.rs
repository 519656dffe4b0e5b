#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The grading entry point: checks preconditions, routes a submission to the
//! backend registered for its language and turns every internal failure into
//! a well-formed [`GradingResult`].

/// Verdict types and summary formatting.
pub mod results;

use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, error, warn};

use self::results::GradingResult;
use crate::{
    config::{self, EngineConfig},
    rust::RustBackend,
    types::{GradeRequest, Submission, TestCase},
    typescript::TypeScriptBackend,
};

/// Summary reported when a backend fails or panics.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred while evaluating your code.";

/// Reasons a request is rejected before any backend runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradeError {
    /// The submission is empty or whitespace.
    #[error("No code to evaluate. Write some code and try again.")]
    EmptyCode,
    /// The challenge defines no test cases.
    #[error("No test cases defined for this challenge.")]
    NoTestCases,
    /// No backend claims the language tag.
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
}

/// A grading strategy for one or more language tags.
pub trait Backend: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Lowercase language tags this backend claims.
    fn tags(&self) -> &[&str];

    /// Grades a submission. Returning `Err` is reported to the learner as an
    /// unexpected error.
    fn grade(
        &self,
        submission: &Submission,
        test_cases: &[TestCase],
        reference: &str,
        config: &EngineConfig,
    ) -> Result<GradingResult>;
}

/// Routes submissions to registered backends.
pub struct Grader {
    /// Registered backends, oldest first.
    backends: Vec<Box<dyn Backend>>,
    /// Limits and policies handed to every backend.
    config:   EngineConfig,
}

impl Default for Grader {
    /// A grader with the built-in backends and configuration read from the
    /// environment.
    fn default() -> Self {
        Self::new(config::engine())
    }
}

impl std::fmt::Debug for Grader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grader")
            .field("backends", &self.backends.iter().map(|b| b.name()).collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl Grader {
    /// A grader with the built-in backends: TypeScript/JavaScript execution
    /// and Rust structural validation.
    pub fn new(config: EngineConfig) -> Self {
        let mut grader = Self::empty(config);
        grader.register(TypeScriptBackend).register(RustBackend);
        grader
    }

    /// A grader with no backends at all.
    pub fn empty(config: EngineConfig) -> Self {
        Self {
            backends: Vec::new(),
            config,
        }
    }

    /// Adds a backend. A later registration takes precedence over earlier
    /// ones for the tags they share.
    pub fn register(&mut self, backend: impl Backend + 'static) -> &mut Self {
        debug!(backend = backend.name(), tags = ?backend.tags(), "registered grading backend");
        self.backends.push(Box::new(backend));
        self
    }

    /// The configuration handed to backends.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the backend claiming `language`, if any.
    pub fn backend_for(&self, language: &str) -> Option<&dyn Backend> {
        let tag = language.trim().to_ascii_lowercase();
        self.backends
            .iter()
            .rev()
            .find(|backend| backend.tags().iter().any(|t| t.eq_ignore_ascii_case(&tag)))
            .map(|backend| backend.as_ref())
    }

    /// Grades a request in its external shape.
    pub fn grade_request(&self, request: &GradeRequest) -> GradingResult {
        self.grade(&request.submission(), &request.test_cases, &request.solution_code)
    }

    /// Grades `submission` against `test_cases`. Never panics and never fails:
    /// every problem is reported inside the returned result.
    pub fn grade(
        &self,
        submission: &Submission,
        test_cases: &[TestCase],
        reference: &str,
    ) -> GradingResult {
        let backend = match self.check(submission, test_cases) {
            Ok(backend) => backend,
            Err(err) => {
                debug!(language = %submission.language, "rejected submission: {err}");
                return GradingResult::rejected(err.to_string());
            }
        };

        debug!(backend = backend.name(), cases = test_cases.len(), "dispatching submission");
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            backend.grade(submission, test_cases, reference, &self.config)
        }));

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                warn!(backend = backend.name(), "grading failed: {err:#}");
                GradingResult::rejected(UNEXPECTED_ERROR).with_error(Some(format!("{err:#}")))
            }
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                error!(backend = backend.name(), "grading panicked: {detail}");
                GradingResult::rejected(UNEXPECTED_ERROR).with_error(Some(detail))
            }
        }
    }

    /// Validates the request and finds its backend.
    fn check(
        &self,
        submission: &Submission,
        test_cases: &[TestCase],
    ) -> Result<&dyn Backend, GradeError> {
        if submission.code.trim().is_empty() {
            return Err(GradeError::EmptyCode);
        }
        if test_cases.is_empty() {
            return Err(GradeError::NoTestCases);
        }
        self.backend_for(&submission.language)
            .ok_or_else(|| GradeError::UnsupportedLanguage(submission.language.clone()))
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}
