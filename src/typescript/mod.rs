#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Grading for TypeScript and JavaScript: the submission is reduced to plain
//! JavaScript and its exported function is called once per test case.
//! Submissions that depend on modules the runtime cannot provide are
//! validated structurally instead.

/// Locating the exported function.
pub mod entry;
/// Test inputs to call arguments.
pub mod marshal;
/// Tree-sitter queries over TypeScript sources.
pub mod queries;
/// TypeScript-only syntax removal.
pub mod reduce;
/// Structural fallback rules.
pub mod rules;
/// The embedded evaluator.
pub mod runtime;

use std::thread;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, warn};

pub use self::{entry::EntryPoint, reduce::Reduction, rules::TypeScriptRules};
use self::{
    reduce::reduce_parsed,
    runtime::{Limits, Realm, Script, SyntaxError, normalize_output},
};
use crate::{
    config::EngineConfig,
    grade::{
        Backend,
        panic_message,
        results::{GradingResult, TestResult},
    },
    parser::Parser,
    structural::StructuralValidator,
    types::{Submission, TestCase},
};

/// Language tags handled by [`TypeScriptBackend`].
const TAGS: &[&str] = &["typescript", "javascript"];

/// Reported for every case when nothing is exported.
pub const NO_ENTRY_POINT: &str = "No exported function found";

/// Summary shown when nothing is exported.
pub const NO_ENTRY_POINT_OUTPUT: &str =
    "Could not find an exported function. Make sure to export your function.";

/// Runs TypeScript and JavaScript submissions in the embedded evaluator.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeScriptBackend;

impl Backend for TypeScriptBackend {
    fn name(&self) -> &'static str {
        "typescript-dynamic"
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
        let structural = StructuralValidator::new(&TypeScriptRules, config.underivable());

        if let Some(reason) = escalation(&submission.code, test_cases, config) {
            info!(reason, "validating typescript submission structurally");
            return structural.validate(&submission.code, test_cases, reference);
        }

        match execute(&submission.code, test_cases, config) {
            Ok(result) => Ok(result),
            Err(err) => {
                warn!("dynamic evaluation unavailable, validating structurally: {err:#}");
                structural.validate(&submission.code, test_cases, reference)
            }
        }
    }
}

/// Why a submission cannot be executed, if it cannot.
pub fn escalation(code: &str, test_cases: &[TestCase], config: &EngineConfig) -> Option<String> {
    if test_cases.iter().any(|case| case.input.trim().is_empty()) {
        return Some("a test case has no input".to_string());
    }
    config
        .denied_modules()
        .iter()
        .find(|token| code.contains(token.as_str()))
        .map(|token| format!("submission references `{token}`"))
}

/// Runs every case on a worker thread with the configured stack.
fn execute(code: &str, test_cases: &[TestCase], config: &EngineConfig) -> Result<GradingResult> {
    let limits = Limits::from(config);
    thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name("dojo-grader-js".to_string())
            .stack_size(config.stack_size())
            .spawn_scoped(scope, move || run_cases(code, test_cases, limits))
            .context("Failed to spawn evaluation thread")?;
        worker
            .join()
            .map_err(|payload| anyhow!("Evaluation thread panicked: {}", panic_message(payload.as_ref())))?
    })
}

/// Reduces, locates and invokes; the body of the worker thread.
fn run_cases(code: &str, test_cases: &[TestCase], limits: Limits) -> Result<GradingResult> {
    let parser = Parser::typescript(code).context("Failed to parse submission")?;

    let Some(entry) = entry::locate(&parser) else {
        debug!("no exported function in submission");
        let results = test_cases
            .iter()
            .map(|case| TestResult::fail(&case.description, &case.expected_output, NO_ENTRY_POINT))
            .collect();
        return Ok(GradingResult {
            output: NO_ENTRY_POINT_OUTPUT.to_string(),
            error: Some(NO_ENTRY_POINT.to_string()),
            ..GradingResult::from_results(results)
        });
    };

    let reduction = reduce_parsed(&parser);
    debug!(entry = %entry, steps = ?reduction.steps, "reduced submission");
    let script = runtime::compile(&reduction.code);

    let mut last_error = None;
    let mut results = Vec::with_capacity(test_cases.len());
    for case in test_cases {
        let result = match run_case(&script, &entry.name, case, limits) {
            Ok(actual) => {
                let expected = case.expected_output.trim();
                TestResult::builder()
                    .description(&case.description)
                    .passed(actual == expected)
                    .expected(expected.to_string())
                    .actual(actual)
                    .build()
            }
            Err(message) => {
                debug!(case = %case.description, "test case threw: {message}");
                let result = TestResult::fail(&case.description, &case.expected_output, format!("Error: {message}"));
                last_error = Some(message);
                result
            }
        };
        results.push(result);
    }

    let result = GradingResult::from_results(results).with_error(last_error);
    info!(passed = result.pass_count(), total = test_cases.len(), "evaluated typescript submission");
    Ok(result)
}

/// One invocation in a fresh realm. Returns the normalized output or the
/// message of whatever was thrown.
fn run_case(
    script: &Result<Script, SyntaxError>,
    entry: &str,
    case: &TestCase,
    limits: Limits,
) -> Result<String, String> {
    let script = script.as_ref().map_err(|err| err.to_string())?;
    let mut realm = Realm::new(limits);
    let args = marshal::arguments(marshal::parse_input(&case.input));

    let outcome = realm
        .evaluate(script)
        .and_then(|()| realm.invoke(entry, args))
        .and_then(|value| normalize_output(&value));
    debug!(operations = realm.operations(), "test case finished");
    outcome.map_err(|err| err.message())
}
