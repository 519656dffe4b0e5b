#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Rule source for Rust and Anchor challenges.

use anyhow::Result;
use itertools::Itertools;
use lazy_static::lazy_static;

use super::queries::{ENUM_QUERY, FUNCTION_QUERY, IMPL_QUERY, STRUCT_QUERY};
use crate::{
    parser::Parser,
    structural::{Catalog, CatalogMode, Check, Entry, Idiom, Rule, RuleSource, idiom_rules},
};

/// Intents recognized in Rust test cases. The first entry whose intent matches
/// supplies every rule for the case.
const RUST_CATALOG: &[Entry] = &[
    Entry {
        intents: &[r"vault\s+defined"],
        checks:  &[
            Check {
                pattern:      r"pub\s+struct\s+Vault",
                expected:     "Define `pub struct Vault`",
                fail_message: "Missing `pub struct Vault` definition",
            },
            Check {
                pattern:      r"pub\s+balance\s*:\s*u64",
                expected:     "Vault should have `pub balance: u64`",
                fail_message: "Vault should have `pub balance: u64`",
            },
            Check {
                pattern:      r"pub\s+owner\s*:",
                expected:     "Vault should have `pub owner` field",
                fail_message: "Vault should have a `pub owner` field",
            },
            Check {
                pattern:      r"pub\s+is_locked\s*:\s*bool",
                expected:     "Vault should have `pub is_locked: bool`",
                fail_message: "Vault should have `pub is_locked: bool`",
            },
        ],
    },
    Entry {
        intents: &[r"deposit\s+works"],
        checks:  &[
            Check {
                pattern:      r"fn\s+deposit\s*\(\s*&mut\s+self",
                expected:     "Implement `fn deposit(&mut self, ...)`",
                fail_message: "Missing `fn deposit(&mut self, ...)` method",
            },
            Check {
                pattern:      r"self\s*\.\s*balance\s*\+=|self\s*\.\s*balance\s*=\s*self\s*\.\s*balance\s*\+",
                expected:     "Deposit should increment balance",
                fail_message: "Deposit should increment `self.balance`",
            },
        ],
    },
    Entry {
        intents: &[r"withdraw\s+checks"],
        checks:  &[
            Check {
                pattern:      r"fn\s+withdraw",
                expected:     "Implement `fn withdraw`",
                fail_message: "Missing `fn withdraw` method",
            },
            Check {
                pattern:      r"is_locked",
                expected:     "Withdraw should check is_locked",
                fail_message: "Withdraw should check `is_locked` before proceeding",
            },
            Check {
                pattern:      r"Err\s*\(",
                expected:     "Return Err when locked or insufficient funds",
                fail_message: "Withdraw should return `Err(...)` for invalid cases",
            },
        ],
    },
    Entry {
        intents: &[r"counter\s+defined"],
        checks:  &[
            Check {
                pattern:      r"#\[account\]",
                expected:     "Use `#[account]` attribute",
                fail_message: "Missing `#[account]` attribute on struct",
            },
            Check {
                pattern:      r"pub\s+struct\s+Counter",
                expected:     "Define `pub struct Counter`",
                fail_message: "Missing `pub struct Counter` definition",
            },
            Check {
                pattern:      r"pub\s+count\s*:\s*(u64|i64|u32)",
                expected:     "Counter should have a `count` field",
                fail_message: "Counter should have `pub count: u64` (or similar integer)",
            },
        ],
    },
    Entry {
        intents: &[r"init\s+works"],
        checks:  &[
            Check {
                pattern:      r"#\[account\(\s*init",
                expected:     "Use `#[account(init, ...)]` for initialization",
                fail_message: "Missing `#[account(init, ...)]` constraint",
            },
            Check {
                pattern:      r"count\s*[:=]\s*0",
                expected:     "Initialize count to 0",
                fail_message: "Counter count should be initialized to 0",
            },
        ],
    },
    Entry {
        intents: &[r"increment\s+works"],
        checks:  &[Check {
            pattern:      r"count\s*\+=\s*1|count\s*=\s*.*count.*\+\s*1",
            expected:     "Increment count by 1",
            fail_message: "Should increment count by 1 (e.g., `count += 1`)",
        }],
    },
    Entry {
        intents: &[r"deposit\s+cpi"],
        checks:  &[
            Check {
                pattern:      r"CpiContext\s*::\s*new",
                expected:     "Create CpiContext::new",
                fail_message: "Missing `CpiContext::new` for the CPI call",
            },
            Check {
                pattern:      r"token\s*::\s*transfer",
                expected:     "Call token::transfer",
                fail_message: "Missing `token::transfer` CPI call",
            },
        ],
    },
    Entry {
        intents: &[r"withdraw\s+pda"],
        checks:  &[
            Check {
                pattern:      r"CpiContext\s*::\s*new_with_signer",
                expected:     "Create CpiContext::new_with_signer",
                fail_message: "PDA withdraw needs `CpiContext::new_with_signer`",
            },
            Check {
                pattern:      r"signer_seeds|seeds",
                expected:     "Provide signer seeds for PDA",
                fail_message: "Missing signer seeds for PDA-signed CPI",
            },
        ],
    },
];

/// Numeric operations worth requiring when the reference uses them.
const RUST_IDIOMS: &[Idiom] = &[
    Idiom {
        detect:       r"sqrt",
        require:      r"sqrt",
        expected:     "Use sqrt operation",
        fail_message: "Missing `sqrt` call",
    },
    Idiom {
        detect:       r"/\s*100|as\s+f64",
        require:      r"/\s*100|as\s+f64",
        expected:     "Perform division / type conversion",
        fail_message: "Missing division or type conversion (e.g., `/ 100`, `as f64`)",
    },
    Idiom {
        detect:       r"floor",
        require:      r"floor",
        expected:     "Use floor",
        fail_message: "Missing `floor` call",
    },
];

/// Function names that say nothing about the exercise.
const IGNORED_FUNCTIONS: &[&str] = &["main", "new"];

lazy_static! {
    /// The compiled catalog, shared by every grading call.
    static ref CATALOG: Catalog =
        Catalog::compile(CatalogMode::FirstMatch, RUST_CATALOG).expect("rust catalog patterns are valid");
}

/// Derives structural rules for Rust submissions.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustRules;

impl RustRules {
    /// Names captured by `query` in the reference, in document order, without
    /// repeats.
    fn names(parser: &Parser, query: &str) -> Result<Vec<String>> {
        Ok(parser.captures(query, "name")?.into_iter().unique().collect())
    }
}

impl RuleSource for RustRules {
    fn family(&self) -> &'static str {
        "rust"
    }

    fn catalog(&self) -> &Catalog {
        &CATALOG
    }

    fn scalar_rules(&self, reference: &str) -> Result<Vec<Rule>> {
        let mut rules = Vec::new();
        if reference.trim().is_empty() {
            return Ok(rules);
        }

        let parser = Parser::rust(reference)?;
        if let Some(name) = parser.captures(FUNCTION_QUERY, "name")?.into_iter().next() {
            rules.push(Rule::pattern(
                &format!(r"\bfn\s+{}\b", regex::escape(&name)),
                format!("Define function `{name}`"),
                format!("Missing function `{name}`"),
            )?);
        }
        rules.extend(idiom_rules(RUST_IDIOMS, reference)?);

        Ok(rules)
    }

    fn extracted_rules(&self, reference: &str) -> Result<Vec<Rule>> {
        let mut rules = Vec::new();
        if reference.trim().is_empty() {
            return Ok(rules);
        }

        let parser = Parser::rust(reference)?;

        for name in Self::names(&parser, STRUCT_QUERY)? {
            rules.push(Rule::pattern(
                &format!(r"\bstruct\s+{}\b", regex::escape(&name)),
                format!("Define struct `{name}`"),
                format!("Missing struct `{name}`"),
            )?);
        }

        for name in Self::names(&parser, ENUM_QUERY)? {
            rules.push(Rule::pattern(
                &format!(r"\benum\s+{}\b", regex::escape(&name)),
                format!("Define enum `{name}`"),
                format!("Missing enum `{name}`"),
            )?);
        }

        for name in Self::names(&parser, FUNCTION_QUERY)?
            .into_iter()
            .filter(|name| !IGNORED_FUNCTIONS.contains(&name.as_str()))
        {
            rules.push(Rule::pattern(
                &format!(r"\bfn\s+{}\b", regex::escape(&name)),
                format!("Implement function `{name}`"),
                format!("Missing function `{name}`"),
            )?);
        }

        for name in Self::names(&parser, IMPL_QUERY)? {
            rules.push(Rule::pattern(
                &format!(r"\bimpl\b[^{{;]*\b{}\b", regex::escape(&name)),
                format!("Implement `impl {name}`"),
                format!("Missing `impl {name}` block"),
            )?);
        }

        Ok(rules)
    }
}
