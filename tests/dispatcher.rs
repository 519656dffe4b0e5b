use anyhow::{Result, bail};
use dojo_grader::{
    Backend,
    EngineConfig,
    GradeRequest,
    Grader,
    GradingResult,
    Submission,
    TestCase,
    TestResult,
    grade::UNEXPECTED_ERROR,
};

fn cases() -> Vec<TestCase> {
    vec![TestCase::new("adds", "[1, 2]", "3")]
}

/// Passes every case without looking at the code.
struct AlwaysPass;

impl Backend for AlwaysPass {
    fn name(&self) -> &'static str {
        "always-pass"
    }

    fn tags(&self) -> &[&str] {
        &["typescript", "python"]
    }

    fn grade(
        &self,
        _: &Submission,
        test_cases: &[TestCase],
        _: &str,
        _: &EngineConfig,
    ) -> Result<GradingResult> {
        Ok(GradingResult::from_results(
            test_cases.iter().map(|c| TestResult::pass(&c.description)).collect(),
        ))
    }
}

struct Panicking;

impl Backend for Panicking {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn tags(&self) -> &[&str] {
        &["boom"]
    }

    fn grade(&self, _: &Submission, _: &[TestCase], _: &str, _: &EngineConfig) -> Result<GradingResult> {
        panic!("backend exploded")
    }
}

struct Failing;

impl Backend for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn tags(&self) -> &[&str] {
        &["broken"]
    }

    fn grade(&self, _: &Submission, _: &[TestCase], _: &str, _: &EngineConfig) -> Result<GradingResult> {
        bail!("backend gave up")
    }
}

#[test]
fn rejects_blank_code() {
    let grader = Grader::new(EngineConfig::default());
    let result = grader.grade(&Submission::new("  \n\t", "typescript"), &cases(), "");

    assert!(!result.passed);
    assert!(result.test_results.is_empty());
    assert_eq!(result.output, "No code to evaluate. Write some code and try again.");
}

#[test]
fn rejects_missing_test_cases() {
    let grader = Grader::new(EngineConfig::default());
    let result = grader.grade(&Submission::new("export const f = () => 1;", "typescript"), &[], "");

    assert!(!result.passed);
    assert!(result.test_results.is_empty());
    assert_eq!(result.output, "No test cases defined for this challenge.");
}

#[test]
fn echoes_unsupported_language_tag() {
    let grader = Grader::new(EngineConfig::default());
    let result = grader.grade(&Submission::new("print(1)", "Python"), &cases(), "");

    assert!(!result.passed);
    assert!(result.test_results.is_empty());
    assert_eq!(result.output, "Unsupported language: Python");
}

#[test]
fn matches_tags_case_insensitively_after_trimming() {
    let grader = Grader::new(EngineConfig::default());
    assert_eq!(grader.backend_for(" TypeScript ").map(|b| b.name()), Some("typescript-dynamic"));
    assert_eq!(grader.backend_for("JAVASCRIPT").map(|b| b.name()), Some("typescript-dynamic"));
    assert_eq!(grader.backend_for("Rust").map(|b| b.name()), Some("rust-structural"));
    assert!(grader.backend_for("java").is_none());
}

#[test]
fn later_registrations_take_precedence() {
    let mut grader = Grader::new(EngineConfig::default());
    grader.register(AlwaysPass);

    assert_eq!(grader.backend_for("typescript").map(|b| b.name()), Some("always-pass"));
    assert_eq!(grader.backend_for("javascript").map(|b| b.name()), Some("typescript-dynamic"));

    let result = grader.grade(&Submission::new("anything", "python"), &cases(), "");
    assert!(result.passed);
    assert_eq!(result.output, "All tests passed! Great job!");
}

#[test]
fn converts_backend_panics_into_results() {
    let mut grader = Grader::empty(EngineConfig::default());
    grader.register(Panicking);

    let result = grader.grade(&Submission::new("code", "boom"), &cases(), "");
    assert!(!result.passed);
    assert!(result.test_results.is_empty());
    assert_eq!(result.output, UNEXPECTED_ERROR);
    assert_eq!(result.error.as_deref(), Some("backend exploded"));
}

#[test]
fn converts_backend_errors_into_results() {
    let mut grader = Grader::empty(EngineConfig::default());
    grader.register(Failing);

    let result = grader.grade(&Submission::new("code", "broken"), &cases(), "");
    assert!(!result.passed);
    assert_eq!(result.output, UNEXPECTED_ERROR);
    assert_eq!(result.error.as_deref(), Some("backend gave up"));
}

#[test]
fn grades_requests_in_their_external_shape() {
    let request: GradeRequest = serde_json::from_str(
        r#"{
            "code": "export function add(a: number, b: number): number { return a + b; }",
            "language": "typescript",
            "testCases": [
                { "description": "small", "input": "[1, 2]", "expectedOutput": "3" },
                { "description": "negative", "input": "[-4, 1]", "expectedOutput": " -3 " }
            ]
        }"#,
    )
    .expect("request parses");
    assert_eq!(request.solution_code, "");

    let result = dojo_grader::grade(&request);
    assert!(result.passed, "{result:?}");
    assert_eq!(result.test_results.len(), 2);

    let json = serde_json::to_value(&result).expect("serializes");
    assert_eq!(json["testResults"][0]["description"], "small");
    assert!(json.get("error").is_none());
}
