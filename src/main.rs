#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # dojo-grader
//!
//! Command-line front end for the grader. Requests use the same JSON shape as
//! the library: `{ code, language, testCases, solutionCode }`.

use std::io::Read;

use anyhow::{Context, Result, bail};
use bpaf::*;
use colored::Colorize;
use dojo_grader::{
    GradeRequest,
    GradingResult,
    TestCase,
    config,
    parser::Parser as SourceParser,
    rust::RustRules,
    structural::{RuleSource, derive_rules},
    typescript::{TypeScriptRules, entry, reduce::reduce_parsed},
};
use dotenvy::dotenv;
use similar::{Algorithm, ChangeTag, utils::diff_unicode_words};
use tabled::{
    Table,
    Tabled,
    settings::{Panel, Style},
};
use tracing::{metadata::LevelFilter, warn};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade one request
    Grade {
        /// Print the result as JSON instead of a table
        json:    bool,
        /// Path to the request, or `-` for stdin
        request: String,
    },
    /// Grade an array of requests concurrently
    Batch(String),
    /// Show the reduced JavaScript for a TypeScript file
    Reduce(String),
    /// Show the structural rules derived for one test case
    Rules {
        /// Language tag
        language: String,
        /// Expected output of the test case
        expected: String,
        /// Reference solution file
        solution: Option<String>,
    },
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses a request path
    fn r() -> impl Parser<String> {
        positional("REQUEST").help("Path to a grading request in JSON, or - for stdin")
    }

    let json = long("json").help("Print the result as JSON").switch();
    let request = r();
    let grade = construct!(Cmd::Grade { json, request })
        .to_options()
        .command("grade")
        .help("Grade a submission");

    let requests = positional("REQUESTS").help("Path to a JSON array of grading requests");
    let batch = construct!(Cmd::Batch(requests))
        .to_options()
        .command("batch")
        .help("Grade many submissions concurrently");

    let file = positional("FILE").help("TypeScript or JavaScript source file");
    let reduce = construct!(Cmd::Reduce(file))
        .to_options()
        .command("reduce")
        .help("Print the reduced JavaScript and the located entry point");

    let language = long("language")
        .short('l')
        .help("Language tag, e.g. rust or typescript")
        .argument::<String>("TAG");
    let expected = long("expected")
        .short('e')
        .help("Expected output of the test case")
        .argument::<String>("TEXT");
    let solution = long("solution")
        .short('s')
        .help("Reference solution file")
        .argument::<String>("FILE")
        .optional();
    let rules = construct!(Cmd::Rules {
        language,
        expected,
        solution
    })
    .to_options()
    .command("rules")
    .help("Show the structural rules derived for a test case");

    let cmd = construct!([grade, batch, reduce, rules]);

    cmd.to_options()
        .descr("Grades coding challenge submissions")
        .run()
}

/// One row of the results table.
#[derive(Tabled)]
struct Row {
    /// Test case description
    #[tabled(rename = "Test")]
    description: String,
    /// PASS or FAIL
    #[tabled(rename = "Result")]
    verdict:     String,
    /// What was expected
    #[tabled(rename = "Expected")]
    expected:    String,
    /// What was found
    #[tabled(rename = "Actual")]
    actual:      String,
}

/// One row of the rules table.
#[derive(Tabled)]
struct RuleRow {
    /// Position in evaluation order
    #[tabled(rename = "#")]
    index:        usize,
    /// Requirement text
    #[tabled(rename = "Expected")]
    expected:     String,
    /// Message when the requirement is not met
    #[tabled(rename = "Failure message")]
    fail_message: String,
}

/// Reads a file, or stdin for `-`.
fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read request from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
    }
}

/// Highlights the words that differ between expected and actual output.
fn word_diff(expected: &str, actual: &str) -> (String, String) {
    let mut colored_expected = String::new();
    let mut colored_actual = String::new();
    for (change, value) in diff_unicode_words(Algorithm::Patience, expected, actual) {
        match change {
            ChangeTag::Equal => {
                colored_expected.push_str(value);
                colored_actual.push_str(value);
            }
            ChangeTag::Insert => colored_actual.push_str(&format!("{}", value.green())),
            ChangeTag::Delete => colored_expected.push_str(&format!("{}", value.red())),
        }
    }
    (colored_expected, colored_actual)
}

/// Renders a grading result as a table with the summary as footer.
fn render(result: &GradingResult) -> String {
    let rows: Vec<Row> = result
        .test_results
        .iter()
        .map(|r| {
            let expected = r.expected.clone().unwrap_or_default();
            let actual = r.actual.clone().unwrap_or_default();
            let (expected, actual) = if r.passed {
                (expected, actual)
            } else {
                word_diff(&expected, &actual)
            };
            Row {
                description: r.description.clone(),
                verdict: if r.passed {
                    "PASS".green().to_string()
                } else {
                    "FAIL".red().to_string()
                },
                expected,
                actual,
            }
        })
        .collect();

    let mut footer = result.output.clone();
    if let Some(error) = &result.error {
        footer.push_str(&format!("\n{error}"));
    }
    Table::new(&rows)
        .with(Panel::footer(footer))
        .with(Style::modern())
        .to_string()
}

/// `grade`: prints the verdict and returns whether it passed.
fn grade(request: &str, json: bool) -> Result<bool> {
    let request: GradeRequest =
        serde_json::from_str(&read_input(request)?).context("Request is not valid JSON")?;
    let result = dojo_grader::grade(&request);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render(&result));
    }
    Ok(result.passed)
}

/// `batch`: grades every request on the blocking pool and prints the results
/// in request order.
async fn batch(path: &str) -> Result<()> {
    let requests: Vec<GradeRequest> = serde_json::from_str(&read_input(path)?)
        .context("Batch file must be a JSON array of requests")?;

    let handles = requests
        .into_iter()
        .map(|request| tokio::task::spawn_blocking(move || dojo_grader::grade(&request)));

    let mut results = Vec::new();
    for joined in futures::future::join_all(handles).await {
        results.push(joined.context("Grading task failed")?);
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

/// `reduce`: prints the reduced program and what was found in it.
fn reduce(path: &str) -> Result<()> {
    let parser = SourceParser::typescript(read_input(path)?)?;
    let reduction = reduce_parsed(&parser);

    println!("{}", reduction.code);
    if reduction.is_unchanged() {
        eprintln!("{}", "passes: none".dimmed());
    } else {
        let steps: Vec<_> = reduction.steps.iter().map(|s| s.name()).collect();
        eprintln!("{} {}", "passes:".bold(), steps.join(", "));
    }
    match entry::locate(&parser) {
        Some(entry_point) => eprintln!("{} {entry_point}", "entry point:".bold()),
        None => eprintln!("{} {}", "entry point:".bold(), "none".red()),
    }
    Ok(())
}

/// `rules`: prints the strategy and rules for one expected output.
fn rules(language: &str, expected: &str, solution: Option<&str>) -> Result<()> {
    let source: &dyn RuleSource = match language.trim().to_ascii_lowercase().as_str() {
        "rust" => &RustRules,
        "typescript" | "javascript" => &TypeScriptRules,
        _ => bail!("Unsupported language: {language}"),
    };
    let reference = match solution {
        Some(path) => read_input(path)?,
        None => String::new(),
    };

    let case = TestCase::new("cli", "", expected);
    let derivation = derive_rules(source, &case, &reference)?;

    println!("{} {}", "strategy:".bold(), derivation.strategy);
    if derivation.rules.is_empty() {
        warn!(
            policy = ?config::engine().underivable(),
            "no rules could be derived for this test case"
        );
        return Ok(());
    }
    let rows: Vec<RuleRow> = derivation
        .rules
        .iter()
        .enumerate()
        .map(|(index, rule)| RuleRow {
            index:        index + 1,
            expected:     rule.expected().to_string(),
            fail_message: rule.fail_message().to_string(),
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::modern()));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);
    let filter_layer = LevelFilter::from_level(config::log_level());
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let cmd = options();

    match cmd {
        Cmd::Grade { json, request } => {
            let passed = tokio::task::spawn_blocking(move || grade(&request, json))
                .await
                .context("Grading task failed")??;
            if !passed {
                std::process::exit(1);
            }
        }
        Cmd::Batch(path) => batch(&path).await?,
        Cmd::Reduce(path) => reduce(&path)?,
        Cmd::Rules {
            language,
            expected,
            solution,
        } => rules(&language, &expected, solution.as_deref())?,
    };

    Ok(())
}
