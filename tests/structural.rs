use dojo_grader::{
    EngineConfig,
    Grader,
    Submission,
    TestCase,
    UnderivablePolicy,
    rust::RustRules,
    structural::{Strategy, StructuralValidator, UNDERIVABLE_MESSAGE, derive_rules},
    typescript::TypeScriptRules,
};

const VAULT: &str = r#"
use anchor_lang::prelude::*;

#[account]
pub struct Vault {
    pub owner: Pubkey,
    pub balance: u64,
    pub is_locked: bool,
}

impl Vault {
    pub fn deposit(&mut self, amount: u64) {
        self.balance += amount;
    }
}
"#;

const AVERAGE_REFERENCE: &str = r#"
pub fn average(values: &[u64]) -> f64 {
    let sum: u64 = values.iter().sum();
    (sum as f64 / values.len() as f64 * 100.0).floor() / 100.0
}
"#;

fn grade_rust(code: &str, cases: &[TestCase], reference: &str) -> dojo_grader::GradingResult {
    Grader::new(EngineConfig::default()).grade(&Submission::new(code, "rust"), cases, reference)
}

#[test]
fn rust_catalog_checks_vault_fields() {
    let cases = vec![
        TestCase::new("vault", "", "Vault defined with owner and balance"),
        TestCase::new("deposit", "", "deposit works"),
    ];
    let result = grade_rust(VAULT, &cases, "");
    assert!(result.passed, "{result:?}");

    let missing_lock = VAULT.replace("pub is_locked: bool,", "");
    let result = grade_rust(&missing_lock, &cases, "");
    assert!(!result.passed);
    assert_eq!(result.output, "1/2 tests passed.");
    assert_eq!(
        result.test_results[0].actual.as_deref(),
        Some("Vault should have `pub is_locked: bool`")
    );
}

#[test]
fn rust_scalar_requires_callable_and_idioms() {
    let cases = vec![TestCase::new("average", "[1, 2]", "1.5")];
    let derivation = derive_rules(&RustRules, &cases[0], AVERAGE_REFERENCE).expect("derives");
    assert_eq!(derivation.strategy, Strategy::Scalar);

    let good = "pub fn average(v: &[u64]) -> f64 { let s: u64 = v.iter().sum(); (s as f64 / v.len() as f64 * 100.0).floor() / 100.0 }";
    assert!(grade_rust(good, &cases, AVERAGE_REFERENCE).passed);

    let renamed = "pub fn mean(v: &[u64]) -> f64 { (v[0] as f64).floor() }";
    let result = grade_rust(renamed, &cases, AVERAGE_REFERENCE);
    assert!(!result.passed);
    assert!(
        result.test_results[0]
            .actual
            .as_deref()
            .is_some_and(|a| a.contains("average")),
        "{result:?}"
    );
}

#[test]
fn rust_extraction_requires_declared_items() {
    let reference = r#"
pub enum Side { Buy, Sell }
pub struct Order { pub side: Side }
impl Order {
    pub fn new(side: Side) -> Self { Self { side } }
    pub fn flip(&mut self) {}
}
fn main() {}
"#;
    let case = TestCase::new("order", "", "Orders can flip sides");
    let derivation = derive_rules(&RustRules, &case, reference).expect("derives");
    assert_eq!(derivation.strategy, Strategy::Extraction);
    let expected: Vec<_> = derivation.rules.iter().map(|r| r.expected().to_string()).collect();
    assert!(expected.iter().any(|e| e.contains("Order")), "{expected:?}");
    assert!(expected.iter().any(|e| e.contains("flip")), "{expected:?}");
    assert!(!expected.iter().any(|e| e.contains("main")), "{expected:?}");

    let submission = "pub enum Side { Buy, Sell }\npub struct Order { side: Side }\nimpl Order { fn flip(&mut self) {} }";
    assert!(grade_rust(submission, &[case], reference).passed);
}

#[test]
fn underivable_cases_fail_by_default() {
    let cases = vec![TestCase::new("vague", "", "it works")];
    let result = grade_rust("fn main() {}", &cases, "");
    assert!(!result.passed);
    assert_eq!(result.test_results[0].actual.as_deref(), Some(UNDERIVABLE_MESSAGE));
    assert_eq!(result.test_results[0].expected.as_deref(), Some("it works"));
}

#[test]
fn underivable_cases_can_pass_vacuously() {
    let cases = vec![TestCase::new("vague", "", "it works")];
    let config = EngineConfig::default().with_underivable(UnderivablePolicy::Pass);
    let result = Grader::new(config).grade(&Submission::new("fn main() {}", "rust"), &cases, "");
    assert!(result.passed);
    assert_eq!(result.output, "All tests passed! Great job!");
}

#[test]
fn typescript_catalog_accumulates_entries() {
    let case = TestCase::new("mint", "", "Create mint and mintTo the token account");
    let derivation = derive_rules(&TypeScriptRules, &case, "").expect("derives");
    assert_eq!(derivation.strategy, Strategy::Catalog);
    let expected: Vec<_> = derivation.rules.iter().map(|r| r.expected()).collect();
    assert_eq!(
        expected,
        vec![
            "Call createMint",
            "Create or get associated token account",
            "Call mintTo"
        ]
    );
}

#[test]
fn typescript_scalar_uses_first_callable() {
    let reference = r#"
export const toDollars = (cents: number) => (cents / 100).toFixed(2);
"#;
    let case = TestCase::new("dollars", "1999", "19.99");
    let derivation = derive_rules(&TypeScriptRules, &case, reference).expect("derives");
    assert_eq!(derivation.strategy, Strategy::Scalar);
    let expected: Vec<_> = derivation.rules.iter().map(|r| r.expected()).collect();
    assert_eq!(
        expected,
        vec!["Define function `toDollars`", "Perform division / decimal formatting"]
    );

    let validator = StructuralValidator::new(&TypeScriptRules, UnderivablePolicy::Fail);
    let code = "export function toDollars(c) { return (c / 100).toFixed(2); }";
    assert!(validator.validate(code, &[case.clone()], reference).expect("validates").passed);
    let result = validator
        .validate("export const dollars = (c) => c;", &[case], reference)
        .expect("validates");
    assert_eq!(result.test_results[0].actual.as_deref(), Some("Missing function `toDollars`"));
}

#[test]
fn typescript_keywords_skip_noise_and_cap_at_six() {
    let reference = r#"
export function report(items) {
    console.log(items);
    const parsed = parseInt(items[0]);
    const a = computeAlpha(parsed);
    const b = computeBeta(a);
    const c = computeGamma(b);
    const d = computeDelta(c);
    const e = computeEpsilon(d);
    return new Summary(e, new Date(), new helper());
}
"#;
    let keywords = TypeScriptRules::keywords(reference).expect("extracts");
    assert_eq!(
        keywords,
        vec!["report", "computeAlpha", "computeBeta", "computeGamma", "computeDelta", "Summary"]
    );
}
