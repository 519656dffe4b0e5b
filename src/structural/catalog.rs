#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Hand-authored rule tables keyed by the intent written in a test case's
//! expected output.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use super::rule::Rule;

/// A single source check inside a catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct Check {
    /// Regex the submission must match.
    pub pattern:      &'static str,
    /// Shown as the expected value on failure.
    pub expected:     &'static str,
    /// Shown as the actual value on failure.
    pub fail_message: &'static str,
}

/// Intent patterns and the checks they unlock.
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    /// Case-insensitive patterns; all must match the expected output.
    pub intents: &'static [&'static str],
    /// Checks applied when the entry fires.
    pub checks:  &'static [Check],
}

/// How matching entries combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogMode {
    /// The first matching entry alone supplies the rules.
    FirstMatch,
    /// Every matching entry contributes its rules, in table order.
    Accumulate,
}

/// An entry with its patterns compiled.
struct CompiledEntry {
    /// Compiled intent patterns.
    intents: Vec<Regex>,
    /// Rules produced when the entry fires.
    rules:   Vec<Rule>,
}

/// A compiled catalog ready to be matched against expected outputs.
pub struct Catalog {
    /// How entries combine.
    mode:    CatalogMode,
    /// Entries in table order.
    entries: Vec<CompiledEntry>,
}

impl Catalog {
    /// Compiles a static table.
    pub fn compile(mode: CatalogMode, table: &[Entry]) -> Result<Self> {
        let mut entries = Vec::with_capacity(table.len());
        for entry in table {
            let intents = entry
                .intents
                .iter()
                .map(|intent| {
                    RegexBuilder::new(intent)
                        .case_insensitive(true)
                        .build()
                        .with_context(|| format!("Invalid catalog intent: {intent}"))
                })
                .collect::<Result<Vec<_>>>()?;
            let rules = entry
                .checks
                .iter()
                .map(|check| Rule::pattern(check.pattern, check.expected, check.fail_message))
                .collect::<Result<Vec<_>>>()?;
            entries.push(CompiledEntry { intents, rules });
        }

        Ok(Self { mode, entries })
    }

    /// Returns the rules for `expected_output`, or `None` if no entry fires.
    pub fn rules_for(&self, expected_output: &str) -> Option<Vec<Rule>> {
        let mut rules = Vec::new();
        let mut fired = false;

        for entry in &self.entries {
            if !entry.intents.iter().all(|re| re.is_match(expected_output)) {
                continue;
            }
            fired = true;
            rules.extend(entry.rules.iter().cloned());
            if self.mode == CatalogMode::FirstMatch {
                break;
            }
        }

        fired.then_some(rules)
    }

    /// Number of entries in the catalog.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
