#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Rule source used when a TypeScript submission cannot be executed.

use anyhow::Result;
use itertools::Itertools;
use lazy_static::lazy_static;

use super::queries::{CALLABLE_QUERY, CALLED_NAMES_QUERY, NEW_TARGETS_QUERY};
use crate::{
    parser::Parser,
    structural::{Catalog, CatalogMode, Check, Entry, Idiom, Rule, RuleSource, idiom_rules},
};

/// Intents recognized in TypeScript test cases. Every matching entry
/// contributes its checks.
const TYPESCRIPT_CATALOG: &[Entry] = &[
    Entry {
        intents: &[r"connection|balance"],
        checks:  &[Check {
            pattern:      r"Connection",
            expected:     "Use Connection from @solana/web3.js",
            fail_message: "Missing Connection usage",
        }],
    },
    Entry {
        intents: &[r"balance"],
        checks:  &[Check {
            pattern:      r"getBalance",
            expected:     "Call getBalance",
            fail_message: "Missing getBalance call",
        }],
    },
    Entry {
        intents: &[r"mint|token", r"createmint|create.*mint"],
        checks:  &[Check {
            pattern:      r"createMint",
            expected:     "Call createMint",
            fail_message: "Missing createMint call",
        }],
    },
    Entry {
        intents: &[r"mint|token", r"token.*account|associated"],
        checks:  &[Check {
            pattern:      r"getOrCreateAssociatedTokenAccount|createAssociatedTokenAccount",
            expected:     "Create or get associated token account",
            fail_message: "Missing associated token account creation",
        }],
    },
    Entry {
        intents: &[r"mint|token", r"mintto"],
        checks:  &[Check {
            pattern:      r"mintTo",
            expected:     "Call mintTo",
            fail_message: "Missing mintTo call",
        }],
    },
    Entry {
        intents: &[r"transfer"],
        checks:  &[Check {
            pattern:      r"transfer",
            expected:     "Implement transfer",
            fail_message: "Missing transfer call",
        }],
    },
    Entry {
        intents: &[r"keypair"],
        checks:  &[Check {
            pattern:      r"Keypair",
            expected:     "Use Keypair",
            fail_message: "Missing Keypair usage",
        }],
    },
];

/// Numeric operations worth requiring when the reference uses them.
const TYPESCRIPT_IDIOMS: &[Idiom] = &[
    Idiom {
        detect:       r"sqrt",
        require:      r"sqrt",
        expected:     "Use sqrt operation",
        fail_message: "Missing `sqrt` call",
    },
    Idiom {
        detect:       r"floor",
        require:      r"floor",
        expected:     "Use floor",
        fail_message: "Missing `floor` call",
    },
    Idiom {
        detect:       r"round",
        require:      r"round",
        expected:     "Use round",
        fail_message: "Missing `round` call",
    },
    Idiom {
        detect:       r"/\s*100|toFixed",
        require:      r"/\s*100|toFixed",
        expected:     "Perform division / decimal formatting",
        fail_message: "Missing division or formatting (e.g., `/ 100`, `toFixed`)",
    },
];

/// Names too common to say anything about a solution.
const NOISE: &[&str] = &[
    "console", "log", "error", "warn", "parseInt", "parseFloat", "String", "Number", "Boolean",
    "Array", "Object", "Promise", "async", "await", "return", "const", "import", "from", "require",
];

/// How many called names extraction keeps.
const MAX_CALLED_NAMES: usize = 5;

/// How many keywords extraction keeps overall.
const MAX_KEYWORDS: usize = 6;

lazy_static! {
    /// The compiled catalog, shared by every grading call.
    static ref CATALOG: Catalog = Catalog::compile(CatalogMode::Accumulate, TYPESCRIPT_CATALOG)
        .expect("typescript catalog patterns are valid");
}

/// Derives structural rules for TypeScript and JavaScript submissions.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeScriptRules;

impl TypeScriptRules {
    /// Identifiers a submission is expected to mention: up to five declared
    /// or called function names, then capitalized `new` targets.
    pub fn keywords(reference: &str) -> Result<Vec<String>> {
        if reference.trim().is_empty() {
            return Ok(Vec::new());
        }
        let parser = Parser::typescript(reference)?;

        let called = parser
            .captures(CALLED_NAMES_QUERY, "name")?
            .into_iter()
            .filter(|name| name.chars().count() >= 3 && !NOISE.contains(&name.as_str()))
            .unique()
            .take(MAX_CALLED_NAMES);
        let constructed = parser
            .captures(NEW_TARGETS_QUERY, "name")?
            .into_iter()
            .filter(|name| name.len() >= 2 && name.starts_with(|c: char| c.is_ascii_uppercase()));

        Ok(called.chain(constructed).unique().take(MAX_KEYWORDS).collect())
    }
}

impl RuleSource for TypeScriptRules {
    fn family(&self) -> &'static str {
        "typescript"
    }

    fn catalog(&self) -> &Catalog {
        &CATALOG
    }

    fn scalar_rules(&self, reference: &str) -> Result<Vec<Rule>> {
        let mut rules = Vec::new();
        if reference.trim().is_empty() {
            return Ok(rules);
        }

        let parser = Parser::typescript(reference)?;
        if let Some(name) = parser.captures(CALLABLE_QUERY, "name")?.into_iter().next() {
            let name_pattern = regex::escape(&name);
            rules.push(Rule::pattern(
                &format!(r"\bfunction\s+{name_pattern}\b|\b(?:const|let|var)\s+{name_pattern}\s*="),
                format!("Define function `{name}`"),
                format!("Missing function `{name}`"),
            )?);
        }
        rules.extend(idiom_rules(TYPESCRIPT_IDIOMS, reference)?);

        Ok(rules)
    }

    fn extracted_rules(&self, reference: &str) -> Result<Vec<Rule>> {
        Ok(Self::keywords(reference)?
            .into_iter()
            .map(|keyword| {
                Rule::contains(
                    keyword.clone(),
                    format!("Code should contain: {keyword}"),
                    format!("Missing expected pattern: {keyword}"),
                )
            })
            .collect())
    }
}
