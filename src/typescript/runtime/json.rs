//! `JSON.stringify`/`JSON.parse` and output normalization.

use std::rc::Rc;

use super::{
    error::JsResult,
    interpreter::{MAX_EVALUATION_NESTING, range_error, syntax_error, type_error},
    value::{Value, number_to_string},
};

/// `JSON.stringify(value, null, indent)`. `None` when the value has no JSON
/// form (`undefined`, functions).
pub fn stringify(value: &Value, indent: &str) -> JsResult<Option<String>> {
    let mut writer = Writer {
        indent,
        stack: Vec::new(),
    };
    let mut out = String::new();
    Ok(writer.write(value, 0, &mut out)?.then_some(out))
}

/// `JSON.parse(text)`.
pub fn parse(text: &str) -> JsResult<Value> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|json| Value::from_json(&json))
        .map_err(|err| syntax_error(format!("Unexpected token in JSON: {err}")))
}

/// Renders a returned value for comparison with the expected output:
/// `undefined` and `null` by name, objects as compact JSON, anything else
/// through `String(value)`.
pub fn normalize_output(value: &Value) -> JsResult<String> {
    Ok(match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Function(_) => value.to_js_string().to_string(),
        value if value.is_reference() => {
            stringify(value, "")?.unwrap_or_else(|| "undefined".to_string())
        }
        value => value.to_js_string().to_string(),
    })
}

/// Serializer state.
struct Writer<'a> {
    /// Indentation unit; empty for compact output.
    indent: &'a str,
    /// Containers currently being written, for cycle detection.
    stack:  Vec<*const ()>,
}

impl Writer<'_> {
    /// Appends `value`; returns false when it has no JSON form.
    fn write(&mut self, value: &Value, depth: usize, out: &mut String) -> JsResult<bool> {
        match value {
            Value::Undefined | Value::Function(_) => return Ok(false),
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) if n.is_finite() => out.push_str(&number_to_string(*n)),
            Value::Number(_) => out.push_str("null"),
            Value::String(s) => quote(s, out),
            Value::Array(array) => {
                self.enter(Rc::as_ptr(array) as *const ())?;
                let items = array.borrow().clone();
                if items.is_empty() {
                    out.push_str("[]");
                } else {
                    out.push('[');
                    for (index, item) in items.iter().enumerate() {
                        if index > 0 {
                            out.push(',');
                        }
                        self.newline(depth + 1, out);
                        if !self.write(item, depth + 1, out)? {
                            out.push_str("null");
                        }
                    }
                    self.newline(depth, out);
                    out.push(']');
                }
                self.stack.pop();
            }
            Value::Object(object) => {
                self.enter(Rc::as_ptr(object) as *const ())?;
                let entries = object.borrow().props.ordered();
                let mut first = true;
                out.push('{');
                for (key, item) in &entries {
                    if matches!(item, Value::Undefined | Value::Function(_)) {
                        continue;
                    }
                    if !first {
                        out.push(',');
                    }
                    first = false;
                    self.newline(depth + 1, out);
                    quote(key, out);
                    out.push(':');
                    if !self.indent.is_empty() {
                        out.push(' ');
                    }
                    self.write(item, depth + 1, out)?;
                }
                if !first {
                    self.newline(depth, out);
                }
                out.push('}');
                self.stack.pop();
            }
            Value::Map(_) | Value::Set(_) | Value::RegExp(_) => out.push_str("{}"),
        }
        Ok(true)
    }

    /// Pushes a container, failing on cycles and on nesting too deep to walk.
    fn enter(&mut self, ptr: *const ()) -> JsResult<()> {
        if self.stack.contains(&ptr) {
            return Err(type_error("Converting circular structure to JSON"));
        }
        if self.stack.len() >= MAX_EVALUATION_NESTING {
            return Err(range_error("Maximum call stack size exceeded"));
        }
        self.stack.push(ptr);
        Ok(())
    }

    /// Line break plus indentation, when pretty-printing.
    fn newline(&self, depth: usize, out: &mut String) {
        if !self.indent.is_empty() {
            out.push('\n');
            out.push_str(&self.indent.repeat(depth));
        }
    }
}

/// Appends a JSON string literal.
fn quote(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typescript::runtime::value::PropMap;

    #[test]
    fn pretty_prints_with_indent() {
        let mut props = PropMap::new();
        props.set("b".into(), Value::Number(1.0));
        props.set("a".into(), Value::array(vec![Value::Bool(true), Value::Undefined]));
        let value = Value::object(props);

        assert_eq!(stringify(&value, "").unwrap().unwrap(), r#"{"b":1,"a":[true,null]}"#);
        assert_eq!(
            stringify(&value, "  ").unwrap().unwrap(),
            "{\n  \"b\": 1,\n  \"a\": [\n    true,\n    null\n  ]\n}"
        );
    }

    #[test]
    fn rejects_cycles() {
        let items = Value::array(Vec::new());
        if let Value::Array(inner) = &items {
            inner.borrow_mut().push(items.clone());
        }
        let err = stringify(&items, "").unwrap_err();
        assert_eq!(err.message(), "Converting circular structure to JSON");
        if let Value::Array(inner) = &items {
            inner.borrow_mut().clear();
        }
    }

    #[test]
    fn normalizes_like_string_conversion() {
        assert_eq!(normalize_output(&Value::Undefined).unwrap(), "undefined");
        assert_eq!(normalize_output(&Value::Number(2.5)).unwrap(), "2.5");
        assert_eq!(normalize_output(&Value::from("hi")).unwrap(), "hi");
        assert_eq!(
            normalize_output(&Value::array(vec![Value::from("x")])).unwrap(),
            r#"["x"]"#
        );
    }
}
