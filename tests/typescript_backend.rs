use dojo_grader::{
    EngineConfig,
    Grader,
    GradingResult,
    Submission,
    TestCase,
    structural::UNDERIVABLE_MESSAGE,
};

fn grade_ts(code: &str, cases: &[TestCase]) -> GradingResult {
    Grader::new(EngineConfig::default()).grade(&Submission::new(code, "typescript"), cases, "")
}

#[test]
fn runs_typed_submission() {
    let code = r#"
import { something } from "./local";

interface Point {
    x: number;
    y: number;
}

type Pair = [number, number];

export function distance(a: Point, b: Point): string {
    const dx: number = b.x - a.x;
    const dy = (b.y - a.y) as number;
    return Math.sqrt(dx * dx + dy * dy).toFixed(2);
}
"#;
    let cases = vec![
        TestCase::new("3-4-5", r#"[{"x": 0, "y": 0}, {"x": 3, "y": 4}]"#, "5.00"),
        TestCase::new("same point", r#"[{"x": 1, "y": 1}, {"x": 1, "y": 1}]"#, "0.00"),
    ];

    let result = grade_ts(code, &cases);
    assert!(result.passed, "{result:?}");
    assert_eq!(result.output, "All tests passed! Great job!");
    assert_eq!(result.test_results[0].actual.as_deref(), Some("5.00"));
    assert_eq!(result.test_results[0].expected.as_deref(), Some("5.00"));
    assert!(result.error.is_none());
}

#[test]
fn spreads_arrays_and_passes_other_inputs_whole() {
    let code = r#"
export const describe = (value: unknown, extra?: unknown) =>
    Array.isArray(value) ? `array of ${value.length}` : `${typeof value} ${extra === undefined}`;
"#;
    let cases = vec![
        TestCase::new("spread", "[[1, 2, 3], 4]", "array of 3"),
        TestCase::new("object", r#"{"a": 1}"#, "object true"),
        TestCase::new("number", "42", "number true"),
        TestCase::new("text", "  hello  ", "string true"),
    ];

    let result = grade_ts(code, &cases);
    assert!(result.passed, "{result:?}");
}

#[test]
fn normalizes_objects_to_json() {
    let code = r#"
export function summarize(scores: number[]) {
    const total = scores.reduce((sum, s) => sum + s, 0);
    return { total, best: Math.max(...scores), names: ["a", "b"], missing: undefined };
}
"#;
    let cases = vec![TestCase::new("json", "[[3, 9, 4]]", r#"{"total":16,"best":9,"names":["a","b"]}"#)];

    let result = grade_ts(code, &cases);
    assert!(result.passed, "{result:?}");
}

#[test]
fn reports_missing_export_for_every_case() {
    let code = "function hidden(n: number) { return n; }";
    let cases = vec![TestCase::new("one", "1", "1"), TestCase::new("two", "2", "2")];

    let result = grade_ts(code, &cases);
    assert!(!result.passed);
    assert_eq!(result.output, "Could not find an exported function. Make sure to export your function.");
    assert_eq!(result.error.as_deref(), Some("No exported function found"));
    assert_eq!(result.test_results.len(), 2);
    for r in &result.test_results {
        assert!(!r.passed);
        assert_eq!(r.actual.as_deref(), Some("No exported function found"));
    }
    assert_eq!(result.test_results[1].expected.as_deref(), Some("2"));
}

#[test]
fn isolates_thrown_errors_to_their_case() {
    let code = r#"
export function checked(n: number): number {
    if (n < 0) {
        throw new RangeError(`negative: ${n}`);
    }
    return n * 2;
}
"#;
    let cases = vec![
        TestCase::new("negative", "-1", "0"),
        TestCase::new("positive", "4", "8"),
        TestCase::new("wrong", "5", "11"),
    ];

    let result = grade_ts(code, &cases);
    assert!(!result.passed);
    assert_eq!(result.output, "1/3 tests passed.");
    assert_eq!(result.test_results[0].actual.as_deref(), Some("Error: negative: -1"));
    assert!(result.test_results[1].passed);
    assert_eq!(result.test_results[2].actual.as_deref(), Some("10"));
    assert_eq!(result.error.as_deref(), Some("negative: -1"));
}

#[test]
fn gives_each_case_a_fresh_realm() {
    let code = r#"
let calls = 0;
const seen: string[] = [];

export function next(label: string): string {
    calls += 1;
    seen.push(label);
    return `${calls}:${seen.join(",")}`;
}
"#;
    let cases = vec![
        TestCase::new("first", "a", "1:a"),
        TestCase::new("second", "b", "1:b"),
        TestCase::new("third", "c", "1:c"),
    ];

    let result = grade_ts(code, &cases);
    assert!(result.passed, "{result:?}");
}

#[test]
fn stops_infinite_loops_per_case() {
    let code = r#"
export function spin(n: number): number {
    if (n === 0) {
        while (true) {}
    }
    return n;
}
"#;
    let cases = vec![TestCase::new("loops", "0", "0"), TestCase::new("returns", "7", "7")];
    let config = EngineConfig::builder().max_operations(50_000).build();

    let result = Grader::new(config).grade(&Submission::new(code, "typescript"), &cases, "");
    assert!(!result.passed);
    assert_eq!(
        result.test_results[0].actual.as_deref(),
        Some("Error: Execution limit of 50000 operations exceeded (possible infinite loop)")
    );
    assert!(result.test_results[1].passed);
}

#[test]
fn budget_exhaustion_cannot_be_caught() {
    let code = r#"
export function stubborn(): string {
    try {
        while (true) {}
    } catch (e) {
        return "caught";
    }
}
"#;
    let cases = vec![TestCase::new("halts", "[]", "caught")];
    let config = EngineConfig::builder().max_operations(10_000).build();

    let result = Grader::new(config).grade(&Submission::new(code, "typescript"), &cases, "");
    assert!(!result.passed);
    assert!(
        result.test_results[0]
            .actual
            .as_deref()
            .is_some_and(|a| a.starts_with("Error: Execution limit"))
    );
}

#[test]
fn reports_call_stack_overflow() {
    let code = r#"
export function forever(n: number): number {
    return forever(n + 1);
}
"#;
    let cases = vec![TestCase::new("recursion", "0", "0")];

    let result = grade_ts(code, &cases);
    assert!(!result.passed);
    assert_eq!(result.test_results[0].actual.as_deref(), Some("Error: Maximum call stack size exceeded"));
}

#[test]
fn stack_overflow_is_catchable() {
    let code = r#"
function deep(n: number): number {
    return deep(n + 1) + 1;
}

export function attempt(): string {
    try {
        return String(deep(0));
    } catch (e) {
        return e instanceof RangeError ? "range error" : "other";
    }
}
"#;
    let cases = vec![TestCase::new("caught", "[]", "range error")];

    let result = grade_ts(code, &cases);
    assert!(result.passed, "{result:?}");
}

#[test]
fn syntax_errors_fail_every_case() {
    let code = "export function broken(n: number) { return n; }\nconst leftover = ;\n";
    let cases = vec![TestCase::new("a", "1", "1"), TestCase::new("b", "2", "2")];

    let result = grade_ts(code, &cases);
    assert!(!result.passed);
    for r in &result.test_results {
        assert!(r.actual.as_deref().is_some_and(|a| a.starts_with("Error: ")), "{r:?}");
    }
    assert!(result.error.is_some());
}

#[test]
fn deeply_nested_source_fails_every_case() {
    let parens = format!(
        "export function nest(n: number): number {{ return {}n{}; }}",
        "(".repeat(3_000),
        ")".repeat(3_000)
    );
    let chain = format!(
        "export function total(n: number): number {{ return {}; }}",
        vec!["n"; 20_000].join(" + ")
    );
    let cases = vec![TestCase::new("a", "1", "1"), TestCase::new("b", "2", "2")];

    for code in [parens, chain] {
        let result = grade_ts(&code, &cases);
        assert!(!result.passed);
        assert_eq!(result.test_results.len(), 2);
        for r in &result.test_results {
            assert!(
                r.actual
                    .as_deref()
                    .is_some_and(|a| a.starts_with("Error: Expression nesting too deep")),
                "{r:?}"
            );
        }
    }
}

#[test]
fn deep_evaluation_is_bounded_even_with_a_generous_call_depth() {
    let code = r#"
export function depth(n: number): number {
    return n === 0 ? 0 : 1 + depth(n - 1);
}
"#;
    let cases = vec![TestCase::new("deep", "100000", "100000"), TestCase::new("shallow", "10", "10")];
    let config = EngineConfig::builder().max_call_depth(1_000_000).build();

    let result = Grader::new(config).grade(&Submission::new(code, "typescript"), &cases, "");
    assert!(!result.passed);
    assert_eq!(
        result.test_results[0].actual.as_deref(),
        Some("Error: Maximum call stack size exceeded")
    );
    assert!(result.test_results[1].passed, "{result:?}");
}

#[test]
fn huge_array_writes_fail_only_their_case() {
    let code = r#"
export function grow(n: number): number {
    const items: number[] = [];
    if (n === 1) {
        items[4000000000] = n;
    } else {
        items[n] = n;
    }
    return items.length;
}
"#;
    let cases = vec![TestCase::new("huge", "1", "1"), TestCase::new("small", "2", "3")];

    let result = grade_ts(code, &cases);
    assert!(!result.passed);
    assert_eq!(result.output, "1/2 tests passed.");
    assert_eq!(result.test_results[0].actual.as_deref(), Some("Error: Invalid array length"));
    assert!(result.test_results[1].passed, "{result:?}");
}

#[test]
fn huge_strings_fail_only_their_case() {
    let code = r#"
export function shout(word: string, times: number): string {
    return word.repeat(times);
}
"#;
    let cases = vec![
        TestCase::new("huge", r#"["ab", 1000000000000]"#, "?"),
        TestCase::new("small", r#"["ab", 2]"#, "abab"),
    ];

    let result = grade_ts(code, &cases);
    assert_eq!(result.test_results[0].actual.as_deref(), Some("Error: Invalid string length"));
    assert!(result.test_results[1].passed, "{result:?}");
}

#[test]
fn oversized_arrays_throw_catchable_range_errors() {
    let code = r#"
export function build(kind: string): string {
    try {
        if (kind === "constructor") {
            new Array(4294967295);
        } else if (kind === "length") {
            const items = [];
            items.length = 4294967295;
        } else if (kind === "doubling") {
            let text = "ab";
            for (let i = 0; i < 40; i++) {
                text = text + text;
            }
        }
        return "built";
    } catch (e) {
        return e instanceof RangeError ? e.message : "other";
    }
}
"#;
    let cases = vec![
        TestCase::new("constructor", "constructor", "Invalid array length"),
        TestCase::new("length", "length", "Invalid array length"),
        TestCase::new("doubling", "doubling", "Invalid string length"),
        TestCase::new("nothing", "nothing", "built"),
    ];

    let result = grade_ts(code, &cases);
    assert!(result.passed, "{result:?}");
}

#[test]
fn sized_allocations_count_against_the_budget() {
    let code = r#"
export function zeros(n: number): number {
    return new Array(n).fill(0).length;
}
"#;
    let cases = vec![TestCase::new("large", "1000000", "1000000"), TestCase::new("small", "10", "10")];
    let config = EngineConfig::builder().max_operations(10_000).build();

    let result = Grader::new(config).grade(&Submission::new(code, "typescript"), &cases, "");
    assert!(
        result.test_results[0]
            .actual
            .as_deref()
            .is_some_and(|a| a.starts_with("Error: Execution limit of 10000 operations")),
        "{result:?}"
    );
    assert!(result.test_results[1].passed, "{result:?}");
}

#[test]
fn escalates_submissions_using_denied_modules() {
    let code = r#"
import { Connection, PublicKey } from "@solana/web3.js";

export async function balance(address: string) {
    const connection = new Connection("https://api.devnet.solana.com");
    return connection.getBalance(new PublicKey(address));
}
"#;
    let cases = vec![TestCase::new("balance", "So11111111111111111111111111111111111111112", "Connection balance")];

    let result = grade_ts(code, &cases);
    assert!(result.passed, "{result:?}");
}

#[test]
fn escalation_reports_first_missing_requirement() {
    let code = r#"
import { Connection } from "@solana/web3.js";
export const connect = () => new Connection("http://localhost:8899");
"#;
    let cases = vec![TestCase::new("balance", "addr", "Returns wallet balance")];

    let result = grade_ts(code, &cases);
    assert!(!result.passed);
    assert_eq!(result.test_results[0].expected.as_deref(), Some("Call getBalance"));
    assert_eq!(result.test_results[0].actual.as_deref(), Some("Missing getBalance call"));
}

#[test]
fn empty_inputs_escalate_to_structural_checks() {
    let code = "export function greet() { return 'hi'; }";
    let cases = vec![TestCase::new("no input", "   ", "greeting printed")];

    let result = grade_ts(code, &cases);
    assert!(!result.passed);
    assert_eq!(result.test_results[0].actual.as_deref(), Some(UNDERIVABLE_MESSAGE));
}

#[test]
fn escalation_uses_reference_keywords() {
    let reference = r#"
export function greet(name: string) {
    return formatGreeting(name);
}
function formatGreeting(name: string) {
    return `Hello, ${name}!`;
}
"#;
    let passing = "export function greet(n) { return formatGreeting(n); }\nfunction formatGreeting(n) { return n; }";
    let failing = "export function greet(n) { return n; }";
    let cases = vec![TestCase::new("greets", "", "Hello greeting")];

    let grader = Grader::new(EngineConfig::default());
    let ok = grader.grade(&Submission::new(passing, "javascript"), &cases, reference);
    assert!(ok.passed, "{ok:?}");

    let bad = grader.grade(&Submission::new(failing, "javascript"), &cases, reference);
    assert!(!bad.passed);
    assert_eq!(
        bad.test_results[0].actual.as_deref(),
        Some("Missing expected pattern: formatGreeting")
    );
}

#[test]
fn math_random_is_deterministic() {
    let code = "export const roll = () => Math.floor(Math.random() * 1000000);";
    let cases = vec![TestCase::new("roll", "[]", "?")];

    let first = grade_ts(code, &cases);
    let second = grade_ts(code, &cases);
    assert_eq!(first.test_results[0].actual, second.test_results[0].actual);
}
