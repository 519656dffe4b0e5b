#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Structural validation: grading by the presence of source patterns instead
//! of execution.
//!
//! For every test case a list of [`Rule`]s is derived by the first strategy
//! that yields something:
//!
//! 1. the family's hand-authored [`Catalog`], keyed by the intent written in
//!    the expected output,
//! 2. for bare numeric expected outputs, the callable and operation idioms
//!    used by the reference solution,
//! 3. identifiers extracted from the reference solution.
//!
//! A case passes when every rule matches the submission text.

/// Hand-authored intent tables.
pub mod catalog;
/// The rule type.
pub mod rule;

use std::fmt;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

pub use self::{
    catalog::{Catalog, CatalogMode, Check, Entry},
    rule::Rule,
};
use crate::{
    config::UnderivablePolicy,
    grade::results::{GradingResult, TestResult},
    types::TestCase,
};

lazy_static! {
    /// A bare scalar expected output such as `42` or `-3.14`.
    static ref SCALAR: Regex = Regex::new(r"^-?\d+(\.\d+)?$").expect("valid scalar pattern");
}

/// Reported when nothing could be derived and the policy is to fail.
pub const UNDERIVABLE_MESSAGE: &str = "No validation rules could be derived for this test case";

/// Language-family knowledge used to derive rules.
pub trait RuleSource: Send + Sync {
    /// Short family name used in logs.
    fn family(&self) -> &'static str;

    /// The hand-authored intent table.
    fn catalog(&self) -> &Catalog;

    /// Rules for a numeric expected output: the reference's callable plus its
    /// recognizable operation idioms. May be empty.
    fn scalar_rules(&self, reference: &str) -> Result<Vec<Rule>>;

    /// Rules requiring the identifiers declared or used by the reference.
    fn extracted_rules(&self, reference: &str) -> Result<Vec<Rule>>;
}

/// An operation idiom: if the reference matches `detect`, the submission must
/// match `require`.
#[derive(Debug, Clone, Copy)]
pub struct Idiom {
    /// Pattern looked for in the reference solution.
    pub detect:       &'static str,
    /// Pattern the submission must then contain.
    pub require:      &'static str,
    /// Shown as the expected value on failure.
    pub expected:     &'static str,
    /// Shown as the actual value on failure.
    pub fail_message: &'static str,
}

/// Turns the idioms present in `reference` into rules.
pub fn idiom_rules(idioms: &[Idiom], reference: &str) -> Result<Vec<Rule>> {
    let mut rules = Vec::new();
    for idiom in idioms {
        let detect = Regex::new(idiom.detect)
            .with_context(|| format!("Invalid idiom pattern: {}", idiom.detect))?;
        if detect.is_match(reference) {
            rules.push(Rule::pattern(idiom.require, idiom.expected, idiom.fail_message)?);
        }
    }
    Ok(rules)
}

/// Which strategy produced a test case's rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// A catalog entry matched the expected output.
    Catalog,
    /// Numeric expected output; callable and idioms from the reference.
    Scalar,
    /// Identifiers extracted from the reference.
    Extraction,
    /// Nothing could be derived.
    Underivable,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Catalog => "catalog",
            Strategy::Scalar => "scalar",
            Strategy::Extraction => "extraction",
            Strategy::Underivable => "underivable",
        };
        write!(f, "{name}")
    }
}

/// The rules derived for one test case.
#[derive(Debug, Clone)]
pub struct Derivation {
    /// How the rules were obtained.
    pub strategy: Strategy,
    /// The rules; empty only for [`Strategy::Underivable`].
    pub rules:    Vec<Rule>,
}

/// Derives the rules for one test case.
pub fn derive_rules(source: &dyn RuleSource, case: &TestCase, reference: &str) -> Result<Derivation> {
    let expected = case.expected_output.trim();

    if let Some(rules) = source.catalog().rules_for(expected) {
        return Ok(Derivation {
            strategy: Strategy::Catalog,
            rules,
        });
    }

    if SCALAR.is_match(expected) {
        let rules = source.scalar_rules(reference)?;
        if !rules.is_empty() {
            return Ok(Derivation {
                strategy: Strategy::Scalar,
                rules,
            });
        }
    }

    let rules = source.extracted_rules(reference)?;
    let strategy = if rules.is_empty() {
        Strategy::Underivable
    } else {
        Strategy::Extraction
    };

    Ok(Derivation { strategy, rules })
}

/// Returns the first rule `code` does not satisfy.
pub fn first_failure<'a>(rules: &'a [Rule], code: &str) -> Option<&'a Rule> {
    rules.iter().find(|rule| !rule.check(code))
}

/// Grades a submission by rule evaluation.
pub struct StructuralValidator<'s> {
    /// Family knowledge.
    source: &'s dyn RuleSource,
    /// Handling of cases with no derivable rule.
    policy: UnderivablePolicy,
}

impl<'s> StructuralValidator<'s> {
    /// Creates a validator for one rule source.
    pub fn new(source: &'s dyn RuleSource, policy: UnderivablePolicy) -> Self {
        Self { source, policy }
    }

    /// Grades `code` against every test case.
    pub fn validate(&self, code: &str, cases: &[TestCase], reference: &str) -> Result<GradingResult> {
        let mut results = Vec::with_capacity(cases.len());

        for case in cases {
            let derivation = derive_rules(self.source, case, reference)?;
            debug!(
                family = self.source.family(),
                test = %case.description,
                strategy = %derivation.strategy,
                rules = derivation.rules.len(),
                "derived structural rules"
            );
            results.push(self.judge(case, &derivation, code));
        }

        Ok(GradingResult::from_results(results))
    }

    /// Turns one derivation into a verdict.
    fn judge(&self, case: &TestCase, derivation: &Derivation, code: &str) -> TestResult {
        if derivation.rules.is_empty() {
            return match self.policy {
                UnderivablePolicy::Pass => TestResult::pass(&case.description),
                UnderivablePolicy::Fail => TestResult::fail(
                    &case.description,
                    case.expected_output.trim(),
                    UNDERIVABLE_MESSAGE,
                ),
            };
        }

        match first_failure(&derivation.rules, code) {
            None => TestResult::pass(&case.description),
            Some(rule) => TestResult::fail(&case.description, rule.expected(), rule.fail_message()),
        }
    }
}
