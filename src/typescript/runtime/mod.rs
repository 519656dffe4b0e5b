#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! An embedded JavaScript evaluator for reduced submissions.
//!
//! A [`Script`] is compiled once per submission and is immutable; every test
//! case then runs it in its own [`Realm`] so no global state leaks between
//! cases.

/// Owned syntax tree.
pub mod ast;
/// Built-in globals and methods.
pub mod builtins;
/// Thrown values and syntax errors.
pub mod error;
/// Statement and expression evaluation.
pub mod interpreter;
/// `JSON` support and output normalization.
pub mod json;
/// tree-sitter to syntax tree lowering.
pub mod lower;
/// Lexical environments.
pub mod scope;
/// Runtime values.
pub mod value;

pub use self::{
    error::{Exception, JsResult, SyntaxError},
    interpreter::Limits,
    json::normalize_output,
    value::Value,
};
use self::{interpreter::Interpreter, lower::Lowerer};
use crate::{config::EngineConfig, parser::Parser};

impl From<&EngineConfig> for Limits {
    fn from(config: &EngineConfig) -> Self {
        Limits {
            max_operations: config.max_operations(),
            max_call_depth: config.max_call_depth(),
            max_allocation: config.max_allocation(),
        }
    }
}

/// A compiled program.
#[derive(Debug, Clone)]
pub struct Script {
    /// Lowered top-level statements.
    program: ast::Program,
}

/// Parses and lowers plain JavaScript (or TypeScript the lowering can skip).
pub fn compile(source: &str) -> Result<Script, SyntaxError> {
    let parser = Parser::typescript(source).map_err(|err| SyntaxError {
        message: format!("{err:#}"),
        line:    1,
        column:  1,
    })?;

    if let Some(issue) = parser.first_syntax_issue() {
        let message = if issue.missing {
            format!("Missing {}", issue.snippet)
        } else {
            format!("Unexpected token '{}'", issue.snippet)
        };
        return Err(SyntaxError {
            message,
            line: issue.line,
            column: issue.column,
        });
    }

    let program = Lowerer::new(source).program(parser.root_node())?;
    Ok(Script { program })
}

/// A disposable global environment in which a [`Script`] is run.
pub struct Realm {
    /// Evaluator owning the realm's globals.
    interpreter: Interpreter,
}

impl Realm {
    /// A fresh realm with newly built globals.
    pub fn new(limits: Limits) -> Self {
        Self {
            interpreter: Interpreter::new(limits),
        }
    }

    /// Runs the script's top-level code.
    pub fn evaluate(&mut self, script: &Script) -> JsResult<()> {
        self.interpreter.run(&script.program)
    }

    /// Calls a global function by name.
    pub fn invoke(&mut self, name: &str, args: Vec<Value>) -> JsResult<Value> {
        self.interpreter.call_global(name, args)
    }

    /// Reads a global binding.
    pub fn global(&self, name: &str) -> Option<Value> {
        scope::Scope::lookup(self.interpreter.global(), name)
    }

    /// Operations performed so far.
    pub fn operations(&self) -> u64 {
        self.interpreter.operations()
    }
}
