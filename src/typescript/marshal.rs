#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Converts test-case inputs into call arguments.

use lazy_static::lazy_static;
use regex::Regex;

use super::runtime::Value;

lazy_static! {
    /// Bare numeric literals accepted when an input is not JSON.
    static ref NUMERIC: Regex = Regex::new(r"^-?\d+(\.\d+)?$").expect("numeric pattern is valid");
}

/// Parses a test input: JSON when it is JSON, then a numeric literal, else the
/// trimmed text as a string.
pub fn parse_input(input: &str) -> Value {
    let trimmed = input.trim();
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return Value::from_json(&json);
    }
    if NUMERIC.is_match(trimmed) {
        if let Ok(number) = trimmed.parse::<f64>() {
            return Value::Number(number);
        }
    }
    Value::from(trimmed)
}

/// Spreads an array into positional arguments; anything else is passed as
/// the only argument.
pub fn arguments(input: Value) -> Vec<Value> {
    match input {
        Value::Array(items) => items.borrow().clone(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_trimmed_text() {
        assert_eq!(parse_input("  hello world ").to_js_string().as_ref(), "hello world");
        assert!(matches!(parse_input("007"), Value::Number(n) if n == 7.0));
    }

    #[test]
    fn spreads_only_arrays() {
        assert_eq!(arguments(parse_input("[1, \"a\", null]")).len(), 3);
        assert_eq!(arguments(parse_input(r#"{"a": 1}"#)).len(), 1);
        assert_eq!(arguments(parse_input("[]")).len(), 0);
    }
}
