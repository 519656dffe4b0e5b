//! # dojo-grader
//!
//! An in-process grader for coding challenges. TypeScript and JavaScript
//! submissions are reduced to plain JavaScript and run by an embedded
//! evaluator; Rust submissions are validated against source-pattern rules.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Environment-driven limits and policies
pub mod config;
/// Dispatching submissions to backends and reporting verdicts
pub mod grade;
/// Tree-sitter parsing shared by every language
pub mod parser;
/// Structural grading for Rust
pub mod rust;
/// Rule derivation and evaluation for languages that are not executed
pub mod structural;
/// Request-side data model
pub mod types;
/// Dynamic grading for TypeScript and JavaScript
pub mod typescript;

use lazy_static::lazy_static;

pub use crate::{
    config::{EngineConfig, UnderivablePolicy},
    grade::{
        Backend,
        GradeError,
        Grader,
        results::{GradingResult, TestResult},
    },
    types::{GradeRequest, Submission, TestCase},
};

/// Defined for convenience
type Dict = std::collections::HashMap<String, String>;

lazy_static! {
    /// Grader with the built-in backends and the process configuration.
    static ref DEFAULT_GRADER: Grader = Grader::default();
}

/// Grades a request with the built-in backends and the configuration read
/// from the environment.
pub fn grade(request: &GradeRequest) -> GradingResult {
    DEFAULT_GRADER.grade_request(request)
}
