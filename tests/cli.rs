use std::path::PathBuf;

use assert_cmd::Command;

fn fixture(parts: &[&str]) -> PathBuf {
    parts
        .iter()
        .fold(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures"), |path, part| path.join(part))
}

fn grader() -> Command {
    let mut cmd = Command::cargo_bin("dojo-grader").expect("binary builds");
    cmd.env("DOJO_LOG_LEVEL", "error");
    cmd
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn grade_prints_json_and_succeeds() {
    let output = grader()
        .arg("grade")
        .arg("--json")
        .arg(fixture(&["requests", "fizzbuzz.json"]))
        .output()
        .expect("runs");
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_str(&stdout_of(&output)).expect("json output");
    assert_eq!(result["passed"], true);
    assert_eq!(result["output"], "All tests passed! Great job!");
    assert_eq!(result["testResults"].as_array().map(Vec::len), Some(3));
}

#[test]
fn grade_exits_with_failure_status() {
    let output = grader()
        .arg("grade")
        .arg(fixture(&["requests", "fizzbuzz-wrong.json"]))
        .output()
        .expect("runs");
    assert_eq!(output.status.code(), Some(1));

    let stdout = stdout_of(&output);
    assert!(stdout.contains("1/2 tests passed."), "{stdout}");
    assert!(stdout.contains("multiple of 15"), "{stdout}");
}

#[test]
fn grade_reads_stdin() {
    let request = std::fs::read_to_string(fixture(&["requests", "fizzbuzz.json"])).expect("fixture");
    grader()
        .args(["grade", "--json", "-"])
        .write_stdin(request)
        .assert()
        .success();
}

#[test]
fn batch_keeps_request_order() {
    let output = grader()
        .arg("batch")
        .arg(fixture(&["requests", "batch.json"]))
        .output()
        .expect("runs");
    assert!(output.status.success());

    let results: Vec<serde_json::Value> = serde_json::from_str(&stdout_of(&output)).expect("json output");
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["passed"], true);
    assert_eq!(results[1]["passed"], false);
    assert_eq!(
        results[1]["testResults"][0]["actual"],
        "Missing `#[account]` attribute on struct"
    );
    assert_eq!(results[2]["output"], "Unsupported language: python");
}

#[test]
fn reduce_prints_plain_javascript() {
    let output = grader()
        .arg("reduce")
        .arg(fixture(&["typescript", "inventory.ts"]))
        .output()
        .expect("runs");
    assert!(output.status.success());

    let stdout = stdout_of(&output);
    assert!(stdout.contains("function restock(items, minimum = 5) {"), "{stdout}");
    assert!(!stdout.contains("interface"), "{stdout}");
    assert!(!stdout.contains("import"), "{stdout}");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("restock"), "{stderr}");
    assert!(stderr.contains("type declarations"), "{stderr}");
}

#[test]
fn rules_shows_scalar_derivation() {
    let output = grader()
        .args(["rules", "--language", "rust", "--expected", "2.5", "--solution"])
        .arg(fixture(&["rust", "average.rs"]))
        .output()
        .expect("runs");
    assert!(output.status.success());

    let stdout = stdout_of(&output);
    assert!(stdout.contains("scalar"), "{stdout}");
    assert!(stdout.contains("Define function `average`"), "{stdout}");
    assert!(stdout.contains("Use floor"), "{stdout}");
}

#[test]
fn rules_rejects_unknown_languages() {
    grader()
        .args(["rules", "--language", "cobol", "--expected", "anything"])
        .assert()
        .failure();
}
