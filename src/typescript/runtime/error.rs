#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt;

use thiserror::Error;

use super::value::Value;

/// The reduced program could not be turned into an executable tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {line}, column {column})")]
pub struct SyntaxError {
    /// What went wrong.
    pub message: String,
    /// 1-based line.
    pub line:    usize,
    /// 1-based column.
    pub column:  usize,
}

/// Abrupt completion of a script.
#[derive(Clone)]
pub enum Exception {
    /// A value thrown by `throw` or by a failing built-in. Catchable.
    Thrown(Value),
    /// Execution was stopped by the host, e.g. when the operation budget ran
    /// out. Not catchable by the script.
    Halt(String),
}

impl Exception {
    /// The text reported to the learner: an error's message, or the thrown
    /// value converted to a string.
    pub fn message(&self) -> String {
        match self {
            Exception::Thrown(value) => match value.error_message() {
                Some(message) => message.to_string(),
                None => value.to_js_string().to_string(),
            },
            Exception::Halt(reason) => reason.clone(),
        }
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exception::Thrown(_) => write!(f, "Thrown({})", self.message()),
            Exception::Halt(reason) => write!(f, "Halt({reason})"),
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl From<SyntaxError> for Exception {
    fn from(err: SyntaxError) -> Self {
        Exception::Thrown(Value::error("SyntaxError", &err.to_string()))
    }
}

/// Result of evaluating script code.
pub type JsResult<T> = Result<T, Exception>;
