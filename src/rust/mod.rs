#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Structural grading for Rust submissions, which are never compiled or run.

/// Tree-sitter queries over Rust sources.
pub mod queries;
/// Catalog, idioms and extraction for Rust.
pub mod rules;

use anyhow::Result;
use tracing::info;

pub use self::rules::RustRules;
use crate::{
    config::EngineConfig,
    grade::{Backend, results::GradingResult},
    structural::StructuralValidator,
    types::{Submission, TestCase},
};

/// Language tags handled by [`RustBackend`].
const TAGS: &[&str] = &["rust"];

/// Grades Rust by evaluating derived source-pattern rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustBackend;

impl Backend for RustBackend {
    fn name(&self) -> &'static str {
        "rust-structural"
    }

    fn tags(&self) -> &[&str] {
        TAGS
    }

    fn grade(
        &self,
        submission: &Submission,
        test_cases: &[TestCase],
        reference: &str,
        config: &EngineConfig,
    ) -> Result<GradingResult> {
        info!(cases = test_cases.len(), "validating rust submission structurally");
        StructuralValidator::new(&RustRules, config.underivable()).validate(
            &submission.code,
            test_cases,
            reference,
        )
    }
}
