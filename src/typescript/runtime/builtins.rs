#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Global objects and the methods of built-in values.
//!
//! Methods are looked up by name: a property read such as `"abc".slice`
//! yields a [`Function::method`] that carries the name and dispatches through
//! one function per receiver family.

use std::{cell::RefCell, cmp::Ordering, rc::Rc};

use lazy_static::lazy_static;
use regex::Regex;

use super::{
    error::JsResult,
    interpreter::{Interpreter, make_regexp, own_entries, range_error, type_error},
    json,
    value::{
        Function, FunctionKind, MethodFn, NativeFn, PropMap, Value, number_to_fixed,
        number_to_radix_string, number_to_string, string_to_number, to_int32, to_uint32,
    },
};

/// Methods of booleans.
pub const PRIMITIVE_METHODS: &[&str] = &["toString", "valueOf"];

/// Methods of numbers.
pub const NUMBER_METHODS: &[&str] =
    &["toFixed", "toLocaleString", "toPrecision", "toString", "valueOf"];

/// Methods of strings.
pub const STRING_METHODS: &[&str] = &[
    "at",
    "charAt",
    "charCodeAt",
    "codePointAt",
    "concat",
    "endsWith",
    "includes",
    "indexOf",
    "lastIndexOf",
    "localeCompare",
    "match",
    "matchAll",
    "normalize",
    "padEnd",
    "padStart",
    "repeat",
    "replace",
    "replaceAll",
    "search",
    "slice",
    "split",
    "startsWith",
    "substr",
    "substring",
    "toLocaleLowerCase",
    "toLocaleUpperCase",
    "toLowerCase",
    "toString",
    "toUpperCase",
    "trim",
    "trimEnd",
    "trimStart",
    "valueOf",
];

/// Methods of arrays.
pub const ARRAY_METHODS: &[&str] = &[
    "at",
    "concat",
    "entries",
    "every",
    "fill",
    "filter",
    "find",
    "findIndex",
    "findLast",
    "findLastIndex",
    "flat",
    "flatMap",
    "forEach",
    "includes",
    "indexOf",
    "join",
    "keys",
    "lastIndexOf",
    "map",
    "pop",
    "push",
    "reduce",
    "reduceRight",
    "reverse",
    "shift",
    "slice",
    "some",
    "sort",
    "splice",
    "toReversed",
    "toSorted",
    "toString",
    "unshift",
    "values",
];

/// Methods every object inherits.
pub const OBJECT_METHODS: &[&str] = &["hasOwnProperty", "toString", "valueOf"];

/// Methods of functions.
pub const FUNCTION_METHODS: &[&str] = &["apply", "bind", "call", "toString"];

/// Methods of `Map` instances.
pub const MAP_METHODS: &[&str] =
    &["clear", "delete", "entries", "forEach", "get", "has", "keys", "set", "values"];

/// Methods of `Set` instances.
pub const SET_METHODS: &[&str] =
    &["add", "clear", "delete", "entries", "forEach", "has", "keys", "values"];

/// Methods of regular expressions.
pub const REGEXP_METHODS: &[&str] = &["exec", "test", "toString"];

/// Error constructors available to scripts.
const ERROR_CONSTRUCTORS: &[(&str, NativeFn)] = &[
    ("Error", error),
    ("TypeError", type_error_constructor),
    ("RangeError", range_error_constructor),
    ("SyntaxError", syntax_error_constructor),
    ("ReferenceError", reference_error_constructor),
    ("EvalError", eval_error_constructor),
    ("URIError", uri_error_constructor),
];

/// `Math` functions.
const MATH_FUNCTIONS: &[&str] = &[
    "abs", "acos", "asin", "atan", "atan2", "cbrt", "ceil", "cos", "exp", "floor", "hypot", "log",
    "log10", "log1p", "log2", "max", "min", "pow", "random", "round", "sign", "sin", "sqrt",
    "tan", "trunc",
];

/// `Object.*`
const OBJECT_STATICS: &[&str] = &[
    "assign",
    "create",
    "entries",
    "freeze",
    "fromEntries",
    "getOwnPropertyNames",
    "is",
    "isFrozen",
    "keys",
    "seal",
    "values",
];

/// `Array.*`
const ARRAY_STATICS: &[&str] = &["from", "isArray", "of"];

/// `Number.*` functions.
const NUMBER_STATICS: &[&str] =
    &["isFinite", "isInteger", "isNaN", "isSafeInteger", "parseFloat", "parseInt"];

lazy_static! {
    /// Longest prefix accepted by `parseFloat`.
    static ref FLOAT_PREFIX: Regex =
        Regex::new(r"^[+-]?(?:Infinity|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").unwrap();
}

/// Whether `name` is one of the built-in error constructors.
pub fn is_error_constructor(name: &str) -> bool {
    ERROR_CONSTRUCTORS.iter().any(|(known, _)| *known == name)
}

/// Populates a realm's global scope.
pub fn install(interp: &mut Interpreter) {
    interp.define_global("NaN", Value::Number(f64::NAN));
    interp.define_global("Infinity", Value::Number(f64::INFINITY));
    interp.define_global("globalThis", Value::object(PropMap::new()));

    let mut math = PropMap::new();
    for (name, value) in [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("SQRT2", std::f64::consts::SQRT_2),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ] {
        math.set(name.into(), Value::Number(value));
    }
    add_methods(&mut math, MATH_FUNCTIONS, math_method);
    interp.define_global("Math", Value::object(math));

    let mut json = PropMap::new();
    add_methods(&mut json, &["parse", "stringify"], json_method);
    interp.define_global("JSON", Value::object(json));

    let mut console = PropMap::new();
    add_methods(&mut console, &["debug", "error", "info", "log", "warn"], console_method);
    interp.define_global("console", Value::object(console));

    let object = Function::constructor("Object", object_call, object_call);
    add_methods(&mut object.props.borrow_mut(), OBJECT_STATICS, object_static);
    interp.define_global("Object", Value::Function(object));

    let array = Function::constructor("Array", array_call, array_call);
    add_methods(&mut array.props.borrow_mut(), ARRAY_STATICS, array_static);
    interp.define_global("Array", Value::Function(array));

    let number = Function::constructor("Number", number_call, number_call);
    {
        let mut props = number.props.borrow_mut();
        add_methods(&mut props, NUMBER_STATICS, number_static);
        for (name, value) in [
            ("MAX_SAFE_INTEGER", 9_007_199_254_740_991.0),
            ("MIN_SAFE_INTEGER", -9_007_199_254_740_991.0),
            ("EPSILON", f64::EPSILON),
            ("MAX_VALUE", f64::MAX),
            ("MIN_VALUE", 5e-324),
            ("POSITIVE_INFINITY", f64::INFINITY),
            ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
            ("NaN", f64::NAN),
        ] {
            props.set(name.into(), Value::Number(value));
        }
    }
    interp.define_global("Number", Value::Function(number));

    let string = Function::constructor("String", string_call, string_call);
    add_methods(&mut string.props.borrow_mut(), &["fromCharCode"], string_static);
    interp.define_global("String", Value::Function(string));

    interp.define_global(
        "Boolean",
        Value::Function(Function::constructor("Boolean", boolean_call, boolean_call)),
    );
    interp.define_global(
        "Function",
        Value::Function(Function::native("Function", function_call)),
    );

    for (name, call) in [
        ("parseInt", parse_int_call as NativeFn),
        ("parseFloat", parse_float_call),
        ("isNaN", is_nan_call),
        ("isFinite", is_finite_call),
    ] {
        interp.define_global(name, Value::Function(Function::native(name, call)));
    }

    for (name, constructor) in ERROR_CONSTRUCTORS {
        interp.define_global(
            name,
            Value::Function(Function::constructor(name, *constructor, *constructor)),
        );
    }

    interp.define_global(
        "Map",
        Value::Function(Function::constructor("Map", map_call, map_construct)),
    );
    interp.define_global(
        "Set",
        Value::Function(Function::constructor("Set", set_call, set_construct)),
    );
    interp.define_global(
        "RegExp",
        Value::Function(Function::constructor("RegExp", regexp_construct, regexp_construct)),
    );
}

/// Adds name-dispatched methods to a property map.
fn add_methods(props: &mut PropMap, names: &[&str], call: MethodFn) {
    for name in names {
        props.set((*name).into(), Value::Function(Function::method(name, call)));
    }
}

/// Argument `index`, or `undefined`.
fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// Argument `index` as an integer, or `default` when absent.
fn int_arg(args: &[Value], index: usize, default: f64) -> f64 {
    match args.get(index) {
        None | Some(Value::Undefined) => default,
        Some(value) => {
            let n = value.to_number();
            if n.is_nan() { 0.0 } else { n.trunc() }
        }
    }
}

/// Resolves a possibly negative position against `len`.
fn relative(position: f64, len: usize) -> usize {
    if position < 0.0 {
        (len as f64 + position).max(0.0) as usize
    } else {
        position.min(len as f64) as usize
    }
}

/// Argument `index` as a callable, or a `TypeError`.
fn callback(args: &[Value], index: usize) -> JsResult<Value> {
    match args.get(index) {
        Some(func @ Value::Function(_)) => Ok(func.clone()),
        other => Err(type_error(format!(
            "{} is not a function",
            other.cloned().unwrap_or_default().to_js_string()
        ))),
    }
}

/// Converts a byte offset in `s` to a character index.
fn char_index(s: &str, byte: usize) -> usize {
    s[..byte].chars().count()
}

/// A new error value from constructor arguments.
fn new_error(name: &str, args: &[Value]) -> Value {
    let message = match args.first() {
        None | Some(Value::Undefined) => Rc::from(""),
        Some(message) => message.to_js_string(),
    };
    Value::error(name, &message)
}

/// Generates the error constructors, which differ only in the error name.
macro_rules! error_constructors {
    ($($func:ident => $name:literal),* $(,)?) => {
        $(
            #[doc = concat!("`", $name, "(message)`")]
            fn $func(_: &mut Interpreter, _: &Value, args: &[Value]) -> JsResult<Value> {
                Ok(new_error($name, args))
            }
        )*
    };
}

error_constructors! {
    error => "Error",
    type_error_constructor => "TypeError",
    range_error_constructor => "RangeError",
    syntax_error_constructor => "SyntaxError",
    reference_error_constructor => "ReferenceError",
    eval_error_constructor => "EvalError",
    uri_error_constructor => "URIError",
}

// --------------------------------------------------------------------------
// Global functions and constructors
// --------------------------------------------------------------------------

/// `parseInt(text, radix)`.
pub fn parse_int(text: &str, radix: f64) -> f64 {
    let s = text.trim_start();
    let (negative, mut s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let mut radix = if radix.is_finite() { to_int32(radix) } else { 0 };
    if (radix == 0 || radix == 16)
        && let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
    {
        s = rest;
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let radix = radix as u32;
    let digits: Vec<u32> = s.chars().map_while(|c| c.to_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let value = digits
        .iter()
        .fold(0.0, |acc, digit| acc * f64::from(radix) + f64::from(*digit));
    if negative { -value } else { value }
}

/// `parseFloat(text)`.
pub fn parse_float(text: &str) -> f64 {
    FLOAT_PREFIX
        .find(text.trim_start())
        .map_or(f64::NAN, |found| string_to_number(found.as_str()))
}

/// `parseInt`
fn parse_int_call(_: &mut Interpreter, _: &Value, args: &[Value]) -> JsResult<Value> {
    let radix = match args.get(1) {
        None | Some(Value::Undefined) => 0.0,
        Some(radix) => radix.to_number(),
    };
    Ok(Value::Number(parse_int(&arg(args, 0).to_js_string(), radix)))
}

/// `parseFloat`
fn parse_float_call(_: &mut Interpreter, _: &Value, args: &[Value]) -> JsResult<Value> {
    Ok(Value::Number(parse_float(&arg(args, 0).to_js_string())))
}

/// `isNaN`
fn is_nan_call(interp: &mut Interpreter, _: &Value, args: &[Value]) -> JsResult<Value> {
    Ok(Value::Bool(interp.to_number(&arg(args, 0))?.is_nan()))
}

/// `isFinite`
fn is_finite_call(interp: &mut Interpreter, _: &Value, args: &[Value]) -> JsResult<Value> {
    Ok(Value::Bool(interp.to_number(&arg(args, 0))?.is_finite()))
}

/// `Object(value)`
fn object_call(_: &mut Interpreter, _: &Value, args: &[Value]) -> JsResult<Value> {
    Ok(match args.first() {
        Some(value) if value.is_reference() => value.clone(),
        _ => Value::object(PropMap::new()),
    })
}

/// `Array(...)`
fn array_call(interp: &mut Interpreter, _: &Value, args: &[Value]) -> JsResult<Value> {
    if let [Value::Number(length)] = args {
        if *length < 0.0 || length.fract() != 0.0 || *length > 4_294_967_295.0 {
            return Err(range_error("Invalid array length"));
        }
        interp.allocate_array(*length as usize)?;
        return Ok(Value::array(vec![Value::Undefined; *length as usize]));
    }
    Ok(Value::array(args.to_vec()))
}

/// `Number(value)`
fn number_call(interp: &mut Interpreter, _: &Value, args: &[Value]) -> JsResult<Value> {
    Ok(Value::Number(match args.first() {
        None => 0.0,
        Some(value) => interp.to_number(value)?,
    }))
}

/// `String(value)`
fn string_call(interp: &mut Interpreter, _: &Value, args: &[Value]) -> JsResult<Value> {
    Ok(match args.first() {
        None => Value::from(""),
        Some(value) => Value::String(interp.to_string(value)?),
    })
}

/// `Boolean(value)`
fn boolean_call(_: &mut Interpreter, _: &Value, args: &[Value]) -> JsResult<Value> {
    Ok(Value::Bool(arg(args, 0).truthy()))
}

/// `Function(...)`, which would compile source at run time.
fn function_call(_: &mut Interpreter, _: &Value, _: &[Value]) -> JsResult<Value> {
    Err(type_error("Function constructor is not supported"))
}

/// `Map()` without `new`.
fn map_call(_: &mut Interpreter, _: &Value, _: &[Value]) -> JsResult<Value> {
    Err(type_error("Constructor Map requires 'new'"))
}

/// `Set()` without `new`.
fn set_call(_: &mut Interpreter, _: &Value, _: &[Value]) -> JsResult<Value> {
    Err(type_error("Constructor Set requires 'new'"))
}

/// `new Map(entries)`
fn map_construct(interp: &mut Interpreter, _: &Value, args: &[Value]) -> JsResult<Value> {
    let mut entries: Vec<(Value, Value)> = Vec::new();
    let source = arg(args, 0);
    if !source.is_nullish() {
        for item in interp.iterate(&source)? {
            let pair = interp.iterate(&item)?;
            let key = pair.first().cloned().unwrap_or_default();
            let value = pair.get(1).cloned().unwrap_or_default();
            match entries.iter_mut().find(|(k, _)| k.same_value_zero(&key)) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }
    }
    Ok(Value::Map(Rc::new(RefCell::new(entries))))
}

/// `new Set(values)`
fn set_construct(interp: &mut Interpreter, _: &Value, args: &[Value]) -> JsResult<Value> {
    let mut values: Vec<Value> = Vec::new();
    let source = arg(args, 0);
    if !source.is_nullish() {
        for item in interp.iterate(&source)? {
            if !values.iter().any(|v| v.same_value_zero(&item)) {
                values.push(item);
            }
        }
    }
    Ok(Value::Set(Rc::new(RefCell::new(values))))
}

/// `RegExp(pattern, flags)`
fn regexp_construct(_: &mut Interpreter, _: &Value, args: &[Value]) -> JsResult<Value> {
    let pattern = match arg(args, 0) {
        Value::RegExp(re) => Rc::clone(&re.source),
        Value::Undefined => Rc::from("(?:)"),
        other => other.to_js_string(),
    };
    let flags = match arg(args, 1) {
        Value::Undefined => Rc::from(""),
        other => other.to_js_string(),
    };
    make_regexp(&pattern, &flags)
}

// --------------------------------------------------------------------------
// Namespaces and statics
// --------------------------------------------------------------------------

/// `Math.*`
fn math_method(interp: &mut Interpreter, name: &str, _: &Value, args: &[Value]) -> JsResult<Value> {
    let n = |index: usize| args.get(index).map_or(f64::NAN, Value::to_number);
    let numbers = || args.iter().map(Value::to_number);
    Ok(Value::Number(match name {
        "abs" => n(0).abs(),
        "acos" => n(0).acos(),
        "asin" => n(0).asin(),
        "atan" => n(0).atan(),
        "atan2" => n(0).atan2(n(1)),
        "cbrt" => n(0).cbrt(),
        "ceil" => n(0).ceil(),
        "cos" => n(0).cos(),
        "exp" => n(0).exp(),
        "floor" => n(0).floor(),
        "hypot" => numbers().map(|x| x * x).sum::<f64>().sqrt(),
        "log" => n(0).ln(),
        "log10" => n(0).log10(),
        "log1p" => n(0).ln_1p(),
        "log2" => n(0).log2(),
        "max" => numbers().fold(f64::NEG_INFINITY, |acc, x| {
            if acc.is_nan() || x.is_nan() { f64::NAN } else { acc.max(x) }
        }),
        "min" => numbers().fold(f64::INFINITY, |acc, x| {
            if acc.is_nan() || x.is_nan() { f64::NAN } else { acc.min(x) }
        }),
        "pow" => n(0).powf(n(1)),
        "random" => interp.next_random(),
        "round" => {
            let x = n(0);
            if !x.is_finite() || x.fract() == 0.0 {
                x
            } else {
                let rounded = (x + 0.5).floor();
                if rounded == 0.0 && x < 0.0 { -0.0 } else { rounded }
            }
        }
        "sign" => {
            let x = n(0);
            if x.is_nan() || x == 0.0 { x } else { x.signum() }
        }
        "sin" => n(0).sin(),
        "sqrt" => n(0).sqrt(),
        "tan" => n(0).tan(),
        "trunc" => n(0).trunc(),
        _ => f64::NAN,
    }))
}

/// `JSON.*`
fn json_method(_: &mut Interpreter, name: &str, _: &Value, args: &[Value]) -> JsResult<Value> {
    match name {
        "parse" => json::parse(&arg(args, 0).to_js_string()),
        _ => {
            let indent = match arg(args, 2) {
                Value::Number(n) => " ".repeat(n.clamp(0.0, 10.0) as usize),
                Value::String(s) => s.chars().take(10).collect(),
                _ => String::new(),
            };
            Ok(json::stringify(&arg(args, 0), &indent)?.map_or(Value::Undefined, Value::from))
        }
    }
}

/// `console.*`, routed to the trace log.
fn console_method(_: &mut Interpreter, name: &str, _: &Value, args: &[Value]) -> JsResult<Value> {
    let line = args
        .iter()
        .map(|value| match value {
            Value::String(s) => s.to_string(),
            Value::Object(_) | Value::Array(_) => json::stringify(value, "")
                .ok()
                .flatten()
                .unwrap_or_else(|| value.to_js_string().to_string()),
            other => other.to_js_string().to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    tracing::trace!(target: "dojo_grader::console", stream = name, "{line}");
    Ok(Value::Undefined)
}

/// `Object.*`
fn object_static(interp: &mut Interpreter, name: &str, _: &Value, args: &[Value]) -> JsResult<Value> {
    let target = arg(args, 0);
    let require_object = || {
        if target.is_nullish() {
            Err(type_error("Cannot convert undefined or null to object"))
        } else {
            Ok(())
        }
    };

    Ok(match name {
        "keys" | "getOwnPropertyNames" => {
            require_object()?;
            Value::array(own_entries(&target).into_iter().map(|(k, _)| Value::String(k)).collect())
        }
        "values" => {
            require_object()?;
            Value::array(own_entries(&target).into_iter().map(|(_, v)| v).collect())
        }
        "entries" => {
            require_object()?;
            Value::array(
                own_entries(&target)
                    .into_iter()
                    .map(|(k, v)| Value::array(vec![Value::String(k), v]))
                    .collect(),
            )
        }
        "assign" => {
            require_object()?;
            for source in args.iter().skip(1) {
                for (key, value) in own_entries(source) {
                    interp.set_property(&target, &key, value)?;
                }
            }
            target
        }
        "fromEntries" => {
            let mut props = PropMap::new();
            for item in interp.iterate(&target)? {
                let pair = interp.iterate(&item)?;
                let key = pair.first().cloned().unwrap_or_default();
                props.set(interp.to_string(&key)?, pair.get(1).cloned().unwrap_or_default());
            }
            Value::object(props)
        }
        "freeze" | "seal" => target,
        "isFrozen" => Value::Bool(!target.is_reference()),
        "create" => Value::object(PropMap::new()),
        "is" => Value::Bool(match (&target, &arg(args, 1)) {
            (Value::Number(a), Value::Number(b)) => {
                (a.is_nan() && b.is_nan()) || (a == b && a.is_sign_negative() == b.is_sign_negative())
            }
            (a, b) => a.strict_equals(b),
        }),
        _ => Value::Undefined,
    })
}

/// `Array.*`
fn array_static(interp: &mut Interpreter, name: &str, _: &Value, args: &[Value]) -> JsResult<Value> {
    Ok(match name {
        "isArray" => Value::Bool(matches!(arg(args, 0), Value::Array(_))),
        "of" => Value::array(args.to_vec()),
        _ => {
            let source = arg(args, 0);
            let items = match &source {
                Value::Array(_) | Value::String(_) | Value::Map(_) | Value::Set(_) => {
                    interp.iterate(&source)?
                }
                Value::Object(_) => {
                    let length = interp.get_property(&source, "length")?.to_number();
                    let length = if length.is_finite() && length > 0.0 { length as usize } else { 0 };
                    interp.allocate_array(length)?;
                    let mut items = Vec::with_capacity(length);
                    for index in 0..length {
                        interp.tick()?;
                        items.push(interp.get_property(&source, &index.to_string())?);
                    }
                    items
                }
                Value::Undefined | Value::Null => {
                    return Err(type_error(format!(
                        "{} is not iterable",
                        source.to_js_string()
                    )));
                }
                _ => Vec::new(),
            };
            match args.get(1) {
                Some(Value::Undefined) | None => Value::array(items),
                Some(_) => {
                    let map = callback(args, 1)?;
                    let mut mapped = Vec::with_capacity(items.len());
                    for (index, item) in items.into_iter().enumerate() {
                        mapped.push(interp.call(&map, Value::Undefined, vec![
                            item,
                            Value::Number(index as f64),
                        ])?);
                    }
                    Value::array(mapped)
                }
            }
        }
    })
}

/// `Number.*`
fn number_static(_: &mut Interpreter, name: &str, _: &Value, args: &[Value]) -> JsResult<Value> {
    let value = arg(args, 0);
    let number = match value {
        Value::Number(n) => Some(n),
        _ => None,
    };
    Ok(match name {
        "isFinite" => Value::Bool(number.is_some_and(f64::is_finite)),
        "isInteger" => Value::Bool(number.is_some_and(|n| n.is_finite() && n.fract() == 0.0)),
        "isSafeInteger" => Value::Bool(
            number.is_some_and(|n| n.is_finite() && n.fract() == 0.0 && n.abs() <= 9_007_199_254_740_991.0),
        ),
        "isNaN" => Value::Bool(number.is_some_and(f64::is_nan)),
        "parseFloat" => Value::Number(parse_float(&value.to_js_string())),
        "parseInt" => {
            let radix = match args.get(1) {
                None | Some(Value::Undefined) => 0.0,
                Some(radix) => radix.to_number(),
            };
            Value::Number(parse_int(&value.to_js_string(), radix))
        }
        _ => Value::Undefined,
    })
}

/// `String.*`
fn string_static(_: &mut Interpreter, _: &str, _: &Value, args: &[Value]) -> JsResult<Value> {
    let text: String = args
        .iter()
        .map(|code| char::from_u32(to_uint32(code.to_number()) & 0xffff).unwrap_or('\u{fffd}'))
        .collect();
    Ok(Value::from(text))
}

// --------------------------------------------------------------------------
// Methods of primitive values
// --------------------------------------------------------------------------

/// `Boolean.prototype.*`
pub fn primitive_method(_: &mut Interpreter, name: &str, this: &Value, _: &[Value]) -> JsResult<Value> {
    Ok(match name {
        "toString" => Value::String(this.to_js_string()),
        _ => this.clone(),
    })
}

/// `Number.prototype.*`
pub fn number_method(_: &mut Interpreter, name: &str, this: &Value, args: &[Value]) -> JsResult<Value> {
    let Value::Number(n) = *this else {
        return Err(type_error(format!("Number.prototype.{name} requires a number")));
    };
    Ok(match name {
        "toFixed" => {
            let digits = int_arg(args, 0, 0.0);
            if !(0.0..=100.0).contains(&digits) {
                return Err(range_error("toFixed() digits argument must be between 0 and 100"));
            }
            Value::from(number_to_fixed(n, digits as usize))
        }
        "toString" => {
            let radix = int_arg(args, 0, 10.0);
            if !(2.0..=36.0).contains(&radix) {
                return Err(range_error("toString() radix must be between 2 and 36"));
            }
            Value::from(number_to_radix_string(n, radix as u32))
        }
        "toPrecision" => match args.first() {
            None | Some(Value::Undefined) => Value::from(number_to_string(n)),
            Some(_) => {
                let precision = int_arg(args, 0, 1.0);
                if !(1.0..=100.0).contains(&precision) {
                    return Err(range_error("toPrecision() argument must be between 1 and 100"));
                }
                Value::from(to_precision(n, precision as usize))
            }
        },
        "toLocaleString" => Value::from(to_locale_string(n)),
        _ => this.clone(),
    })
}

/// `Number.prototype.toPrecision(precision)`.
fn to_precision(n: f64, precision: usize) -> String {
    if !n.is_finite() {
        return number_to_string(n);
    }
    let exponential = format!("{:.*e}", precision - 1, n);
    let Some((mantissa, exponent)) = exponential.split_once('e') else {
        return number_to_string(n);
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if n == 0.0 {
        return format!("{:.*}", precision - 1, 0.0);
    }
    if exponent < -6 || exponent >= precision as i32 {
        let sign = if exponent < 0 { "-" } else { "+" };
        format!("{mantissa}e{sign}{}", exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        format!("{:.*}", decimals, n)
    }
}

/// `Number.prototype.toLocaleString()` in the `en-US` locale.
fn to_locale_string(n: f64) -> String {
    if !n.is_finite() {
        return number_to_string(n);
    }
    let fixed = number_to_fixed(n.abs(), 3);
    let (whole, fraction) = fixed.split_once('.').unwrap_or((&fixed, ""));
    let fraction = fraction.trim_end_matches('0');

    let mut grouped = String::new();
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if n < 0.0 && (whole != "0" || !fraction.is_empty()) { "-" } else { "" };
    if fraction.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{fraction}")
    }
}

/// `String.prototype.*`
pub fn string_method(interp: &mut Interpreter, name: &str, this: &Value, args: &[Value]) -> JsResult<Value> {
    let s = this.to_js_string();
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let text = |index: usize| match args.get(index) {
        None => Rc::from("undefined"),
        Some(value) => value.to_js_string(),
    };
    let substring = |start: usize, end: usize| -> String { chars[start..end.max(start)].iter().collect() };

    Ok(match name {
        "at" => {
            let index = int_arg(args, 0, 0.0);
            let index = if index < 0.0 { len as f64 + index } else { index };
            if index >= 0.0 && (index as usize) < len {
                Value::from(chars[index as usize].to_string())
            } else {
                Value::Undefined
            }
        }
        "charAt" => {
            let index = int_arg(args, 0, 0.0);
            if index >= 0.0 && (index as usize) < len {
                Value::from(chars[index as usize].to_string())
            } else {
                Value::from("")
            }
        }
        "charCodeAt" | "codePointAt" => {
            let index = int_arg(args, 0, 0.0);
            if index >= 0.0 && (index as usize) < len {
                Value::Number(f64::from(chars[index as usize] as u32))
            } else if name == "charCodeAt" {
                Value::Number(f64::NAN)
            } else {
                Value::Undefined
            }
        }
        "concat" => {
            let mut out = s.to_string();
            for value in args {
                out.push_str(&interp.to_string(value)?);
                interp.check_string_length(out.len())?;
            }
            Value::from(out)
        }
        "endsWith" => {
            let end = relative(int_arg(args, 1, len as f64), len);
            Value::Bool(substring(0, end).ends_with(&*text(0)))
        }
        "startsWith" => {
            let start = relative(int_arg(args, 1, 0.0).max(0.0), len);
            Value::Bool(substring(start, len).starts_with(&*text(0)))
        }
        "includes" => {
            let start = relative(int_arg(args, 1, 0.0).max(0.0), len);
            Value::Bool(substring(start, len).contains(&*text(0)))
        }
        "indexOf" => {
            let start = relative(int_arg(args, 1, 0.0).max(0.0), len);
            let tail = substring(start, len);
            Value::Number(
                tail.find(&*text(0))
                    .map_or(-1.0, |byte| (start + char_index(&tail, byte)) as f64),
            )
        }
        "lastIndexOf" => Value::Number(
            s.rfind(&*text(0))
                .map_or(-1.0, |byte| char_index(&s, byte) as f64),
        ),
        "localeCompare" => Value::Number(match (*s).cmp(&*text(0)) {
            Ordering::Less => -1.0,
            Ordering::Equal => 0.0,
            Ordering::Greater => 1.0,
        }),
        "match" => {
            let re = regexp_arg(args)?;
            let Value::RegExp(re) = &re else {
                return Ok(Value::Null);
            };
            if re.global() {
                let found: Vec<Value> = re
                    .regex
                    .find_iter(&s)
                    .map(|m| Value::from(m.as_str()))
                    .collect();
                if found.is_empty() { Value::Null } else { Value::array(found) }
            } else {
                re.regex
                    .captures(&s)
                    .map_or(Value::Null, |caps| exec_result(&caps))
            }
        }
        "matchAll" => {
            let re = regexp_arg(args)?;
            let Value::RegExp(re) = &re else {
                return Ok(Value::array(Vec::new()));
            };
            Value::array(re.regex.captures_iter(&s).map(|caps| exec_result(&caps)).collect())
        }
        "normalize" | "toString" | "valueOf" => Value::String(Rc::clone(&s)),
        "padEnd" | "padStart" => {
            let target = int_arg(args, 0, 0.0).max(0.0) as usize;
            let fill: Vec<char> = match args.get(1) {
                None | Some(Value::Undefined) => vec![' '],
                Some(fill) => fill.to_js_string().chars().collect(),
            };
            if target <= len || fill.is_empty() {
                Value::String(Rc::clone(&s))
            } else {
                interp.allocate_string(target)?;
                let padding: String = fill.iter().cycle().take(target - len).collect();
                if name == "padEnd" {
                    Value::from(format!("{s}{padding}"))
                } else {
                    Value::from(format!("{padding}{s}"))
                }
            }
        }
        "repeat" => {
            let count = int_arg(args, 0, 0.0);
            if count < 0.0 || !count.is_finite() {
                return Err(range_error(format!("Invalid count value: {}", number_to_string(count))));
            }
            interp.allocate_string((s.len() as f64 * count) as usize)?;
            Value::from(s.repeat(count as usize))
        }
        "replace" => replace(interp, &s, args, false)?,
        "replaceAll" => replace(interp, &s, args, true)?,
        "search" => {
            let re = regexp_arg(args)?;
            match &re {
                Value::RegExp(re) => Value::Number(
                    re.regex
                        .find(&s)
                        .map_or(-1.0, |m| char_index(&s, m.start()) as f64),
                ),
                _ => Value::Number(-1.0),
            }
        }
        "slice" => {
            let start = relative(int_arg(args, 0, 0.0), len);
            let end = relative(int_arg(args, 1, len as f64), len);
            Value::from(substring(start, end))
        }
        "split" => split(&s, args),
        "substr" => {
            let start = relative(int_arg(args, 0, 0.0), len);
            let count = int_arg(args, 1, (len - start) as f64).clamp(0.0, (len - start) as f64);
            Value::from(substring(start, start + count as usize))
        }
        "substring" => {
            let clamp = |n: f64| n.clamp(0.0, len as f64) as usize;
            let a = clamp(int_arg(args, 0, 0.0));
            let b = clamp(int_arg(args, 1, len as f64));
            Value::from(substring(a.min(b), a.max(b)))
        }
        "toLowerCase" | "toLocaleLowerCase" => Value::from(s.to_lowercase()),
        "toUpperCase" | "toLocaleUpperCase" => Value::from(s.to_uppercase()),
        "trim" => Value::from(s.trim()),
        "trimStart" => Value::from(s.trim_start()),
        "trimEnd" => Value::from(s.trim_end()),
        _ => Value::Undefined,
    })
}

/// The first argument as a regular expression; strings are compiled as
/// patterns, as `new RegExp(text)` would.
fn regexp_arg(args: &[Value]) -> JsResult<Value> {
    match arg(args, 0) {
        re @ Value::RegExp(_) => Ok(re),
        Value::Undefined => make_regexp("(?:)", ""),
        other => make_regexp(&other.to_js_string(), ""),
    }
}

/// Match array as produced by `RegExp.prototype.exec`.
fn exec_result(caps: &regex::Captures<'_>) -> Value {
    Value::array(
        caps.iter()
            .map(|group| group.map_or(Value::Undefined, |m| Value::from(m.as_str())))
            .collect(),
    )
}

/// One match found by `replace`: byte range and capture groups.
struct Found {
    /// Byte offset of the match start.
    start:  usize,
    /// Byte offset one past the match.
    end:    usize,
    /// Capture groups, `None` when a group did not participate.
    groups: Vec<Option<String>>,
}

/// `String.prototype.replace` and `replaceAll`.
fn replace(interp: &mut Interpreter, s: &str, args: &[Value], all: bool) -> JsResult<Value> {
    let pattern = arg(args, 0);
    let replacement = arg(args, 1);

    let found: Vec<Found> = match &pattern {
        Value::RegExp(re) => {
            if all && !re.global() {
                return Err(type_error("replaceAll must be called with a global RegExp"));
            }
            let captures = re.regex.captures_iter(s).map(|caps| {
                let whole = caps.get(0).map_or(0..0, |m| m.range());
                Found {
                    start:  whole.start,
                    end:    whole.end,
                    groups: caps
                        .iter()
                        .skip(1)
                        .map(|group| group.map(|m| m.as_str().to_string()))
                        .collect(),
                }
            });
            if re.global() { captures.collect() } else { captures.take(1).collect() }
        }
        other => {
            let needle = other.to_js_string();
            let matches = s.match_indices(&*needle).map(|(start, matched)| Found {
                start,
                end: start + matched.len(),
                groups: Vec::new(),
            });
            if all { matches.collect() } else { matches.take(1).collect() }
        }
    };

    let mut out = String::new();
    let mut last = 0;
    for found in found {
        out.push_str(&s[last..found.start]);
        let matched = &s[found.start..found.end];
        match &replacement {
            Value::Function(_) => {
                let mut call_args = vec![Value::from(matched)];
                call_args.extend(
                    found
                        .groups
                        .iter()
                        .map(|group| group.as_deref().map_or(Value::Undefined, Value::from)),
                );
                call_args.push(Value::Number(char_index(s, found.start) as f64));
                call_args.push(Value::from(s));
                let result = interp.call(&replacement, Value::Undefined, call_args)?;
                out.push_str(&interp.to_string(&result)?);
            }
            other => expand_replacement(&other.to_js_string(), s, &found, &mut out),
        }
        last = found.end;
    }
    out.push_str(&s[last..]);
    Ok(Value::from(out))
}

/// Expands `$&`, `$1`, `` $` ``, `$'` and `$$` in a replacement string.
fn expand_replacement(template: &str, s: &str, found: &Found, out: &mut String) {
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('&') => {
                chars.next();
                out.push_str(&s[found.start..found.end]);
            }
            Some('`') => {
                chars.next();
                out.push_str(&s[..found.start]);
            }
            Some('\'') => {
                chars.next();
                out.push_str(&s[found.end..]);
            }
            Some(digit) if digit.is_ascii_digit() => {
                chars.next();
                let mut index = digit.to_digit(10).unwrap_or(0) as usize;
                if let Some(next) = chars.peek().and_then(|c| c.to_digit(10)) {
                    let two = index * 10 + next as usize;
                    if two >= 1 && two <= found.groups.len() {
                        chars.next();
                        index = two;
                    }
                }
                match found.groups.get(index.wrapping_sub(1)) {
                    Some(group) => out.push_str(group.as_deref().unwrap_or("")),
                    None => {
                        out.push('$');
                        out.push(digit);
                    }
                }
            }
            _ => out.push('$'),
        }
    }
}

/// `String.prototype.split`.
fn split(s: &str, args: &[Value]) -> Value {
    let limit = match args.get(1) {
        None | Some(Value::Undefined) => usize::MAX,
        Some(limit) => to_uint32(limit.to_number()) as usize,
    };
    let parts: Vec<Value> = match arg(args, 0) {
        Value::Undefined => vec![Value::from(s)],
        Value::RegExp(re) => re.regex.split(s).map(Value::from).collect(),
        separator => {
            let separator = separator.to_js_string();
            if separator.is_empty() {
                s.chars().map(|c| Value::from(c.to_string())).collect()
            } else {
                s.split(&*separator).map(Value::from).collect()
            }
        }
    };
    Value::array(parts.into_iter().take(limit).collect())
}

// --------------------------------------------------------------------------
// Methods of reference values
// --------------------------------------------------------------------------

/// Calls an array callback with `(item, index, array)`.
fn visit(interp: &mut Interpreter, func: &Value, this_arg: &Value, item: &Value, index: usize, array: &Value) -> JsResult<Value> {
    interp.call(func, this_arg.clone(), vec![
        item.clone(),
        Value::Number(index as f64),
        array.clone(),
    ])
}

/// `Array.prototype.*`
pub fn array_method(interp: &mut Interpreter, name: &str, this: &Value, args: &[Value]) -> JsResult<Value> {
    let Value::Array(array) = this else {
        return Err(type_error(format!("Array.prototype.{name} called on non-array")));
    };
    let snapshot = || array.borrow().clone();
    let len = array.borrow().len();

    Ok(match name {
        "push" => {
            let mut items = array.borrow_mut();
            items.extend(args.iter().cloned());
            Value::Number(items.len() as f64)
        }
        "pop" => array.borrow_mut().pop().unwrap_or_default(),
        "shift" => {
            let mut items = array.borrow_mut();
            if items.is_empty() { Value::Undefined } else { items.remove(0) }
        }
        "unshift" => {
            let mut items = array.borrow_mut();
            items.splice(0..0, args.iter().cloned());
            Value::Number(items.len() as f64)
        }
        "slice" => {
            let start = relative(int_arg(args, 0, 0.0), len);
            let end = relative(int_arg(args, 1, len as f64), len);
            let items = array.borrow();
            Value::array(items.get(start..end.max(start)).unwrap_or_default().to_vec())
        }
        "splice" => {
            let start = relative(int_arg(args, 0, 0.0), len);
            let delete = if args.len() < 2 {
                len - start
            } else {
                int_arg(args, 1, 0.0).clamp(0.0, (len - start) as f64) as usize
            };
            let inserted = args.iter().skip(2).cloned();
            let removed: Vec<Value> = array.borrow_mut().splice(start..start + delete, inserted).collect();
            Value::array(removed)
        }
        "concat" => {
            let added: usize = args
                .iter()
                .map(|value| match value {
                    Value::Array(other) => other.borrow().len(),
                    _ => 1,
                })
                .sum();
            interp.allocate_array(len + added)?;
            let mut items = snapshot();
            for value in args {
                match value {
                    Value::Array(other) => items.extend(other.borrow().iter().cloned()),
                    other => items.push(other.clone()),
                }
            }
            Value::array(items)
        }
        "join" | "toString" => {
            let separator = match args.first() {
                Some(separator) if name == "join" && !matches!(separator, Value::Undefined) => {
                    separator.to_js_string()
                }
                _ => Rc::from(","),
            };
            let mut parts = Vec::with_capacity(len);
            let mut total = separator.len().saturating_mul(len.saturating_sub(1));
            interp.check_string_length(total)?;
            for item in snapshot() {
                let part = if item.is_nullish() {
                    String::new()
                } else {
                    interp.to_string(&item)?.to_string()
                };
                total += part.len();
                interp.check_string_length(total)?;
                parts.push(part);
            }
            Value::from(parts.join(&*separator))
        }
        "reverse" => {
            array.borrow_mut().reverse();
            this.clone()
        }
        "toReversed" => {
            let mut items = snapshot();
            items.reverse();
            Value::array(items)
        }
        "indexOf" => {
            let target = arg(args, 0);
            let start = relative(int_arg(args, 1, 0.0), len);
            let items = array.borrow();
            Value::Number(
                items
                    .iter()
                    .enumerate()
                    .skip(start)
                    .find(|(_, item)| item.strict_equals(&target))
                    .map_or(-1.0, |(index, _)| index as f64),
            )
        }
        "lastIndexOf" => {
            let target = arg(args, 0);
            let items = array.borrow();
            Value::Number(
                items
                    .iter()
                    .rposition(|item| item.strict_equals(&target))
                    .map_or(-1.0, |index| index as f64),
            )
        }
        "includes" => {
            let target = arg(args, 0);
            Value::Bool(array.borrow().iter().any(|item| item.same_value_zero(&target)))
        }
        "at" => {
            let index = int_arg(args, 0, 0.0);
            let index = if index < 0.0 { len as f64 + index } else { index };
            if index < 0.0 {
                Value::Undefined
            } else {
                array.borrow().get(index as usize).cloned().unwrap_or_default()
            }
        }
        "fill" => {
            let value = arg(args, 0);
            let start = relative(int_arg(args, 1, 0.0), len);
            let end = relative(int_arg(args, 2, len as f64), len);
            for slot in array.borrow_mut().iter_mut().take(end).skip(start) {
                *slot = value.clone();
            }
            this.clone()
        }
        "keys" => Value::array((0..len).map(|index| Value::Number(index as f64)).collect()),
        "values" => Value::array(snapshot()),
        "entries" => Value::array(
            snapshot()
                .into_iter()
                .enumerate()
                .map(|(index, item)| Value::array(vec![Value::Number(index as f64), item]))
                .collect(),
        ),
        "flat" => {
            let depth = int_arg(args, 0, 1.0);
            let mut out = Vec::new();
            flatten(&snapshot(), depth, &mut out);
            Value::array(out)
        }
        "sort" | "toSorted" => {
            let comparator = match args.first() {
                None | Some(Value::Undefined) => None,
                Some(_) => Some(callback(args, 0)?),
            };
            let (defined, undefined): (Vec<Value>, Vec<Value>) = snapshot()
                .into_iter()
                .partition(|item| !matches!(item, Value::Undefined));
            let mut sorted = merge_sort(interp, defined, comparator.as_ref())?;
            sorted.extend(undefined);
            if name == "sort" {
                *array.borrow_mut() = sorted;
                this.clone()
            } else {
                Value::array(sorted)
            }
        }
        "reduce" | "reduceRight" => {
            let func = callback(args, 0)?;
            let mut items: Vec<(usize, Value)> = snapshot().into_iter().enumerate().collect();
            if name == "reduceRight" {
                items.reverse();
            }
            let mut items = items.into_iter();
            let mut acc = match args.get(1) {
                Some(initial) => initial.clone(),
                None => match items.next() {
                    Some((_, first)) => first,
                    None => return Err(type_error("Reduce of empty array with no initial value")),
                },
            };
            for (index, item) in items {
                acc = interp.call(&func, Value::Undefined, vec![
                    acc,
                    item,
                    Value::Number(index as f64),
                    this.clone(),
                ])?;
            }
            acc
        }
        _ => {
            let func = callback(args, 0)?;
            let this_arg = arg(args, 1);
            let items = snapshot();
            match name {
                "forEach" => {
                    for (index, item) in items.iter().enumerate() {
                        visit(interp, &func, &this_arg, item, index, this)?;
                    }
                    Value::Undefined
                }
                "map" => {
                    let mut out = Vec::with_capacity(items.len());
                    for (index, item) in items.iter().enumerate() {
                        out.push(visit(interp, &func, &this_arg, item, index, this)?);
                    }
                    Value::array(out)
                }
                "flatMap" => {
                    let mut out = Vec::with_capacity(items.len());
                    for (index, item) in items.iter().enumerate() {
                        match visit(interp, &func, &this_arg, item, index, this)? {
                            Value::Array(inner) => out.extend(inner.borrow().iter().cloned()),
                            other => out.push(other),
                        }
                    }
                    Value::array(out)
                }
                "filter" => {
                    let mut out = Vec::new();
                    for (index, item) in items.iter().enumerate() {
                        if visit(interp, &func, &this_arg, item, index, this)?.truthy() {
                            out.push(item.clone());
                        }
                    }
                    Value::array(out)
                }
                "some" | "every" => {
                    let want = name == "some";
                    for (index, item) in items.iter().enumerate() {
                        if visit(interp, &func, &this_arg, item, index, this)?.truthy() == want {
                            return Ok(Value::Bool(want));
                        }
                    }
                    Value::Bool(!want)
                }
                "find" | "findIndex" | "findLast" | "findLastIndex" => {
                    let mut order: Vec<usize> = (0..items.len()).collect();
                    if name.starts_with("findLast") {
                        order.reverse();
                    }
                    for index in order {
                        let item = &items[index];
                        if visit(interp, &func, &this_arg, item, index, this)?.truthy() {
                            return Ok(if name.ends_with("Index") {
                                Value::Number(index as f64)
                            } else {
                                item.clone()
                            });
                        }
                    }
                    if name.ends_with("Index") { Value::Number(-1.0) } else { Value::Undefined }
                }
                _ => Value::Undefined,
            }
        }
    })
}

/// Flattens nested arrays up to `depth` levels.
fn flatten(items: &[Value], depth: f64, out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) if depth >= 1.0 => flatten(&inner.borrow(), depth - 1.0, out),
            other => out.push(other.clone()),
        }
    }
}

/// Stable merge sort driven by a script comparator or string order.
fn merge_sort(interp: &mut Interpreter, mut items: Vec<Value>, comparator: Option<&Value>) -> JsResult<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(interp, items, comparator)?;
    let right = merge_sort(interp, right, comparator)?;

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(a), Some(b)) => {
                let (a, b) = (a.clone(), b.clone());
                compare(interp, &b, &a, comparator)? == Ordering::Less
            }
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        out.extend(next);
    }
    Ok(out)
}

/// Orders two sort keys.
fn compare(interp: &mut Interpreter, a: &Value, b: &Value, comparator: Option<&Value>) -> JsResult<Ordering> {
    match comparator {
        Some(func) => {
            let n = interp
                .call(func, Value::Undefined, vec![a.clone(), b.clone()])?
                .to_number();
            Ok(if n < 0.0 {
                Ordering::Less
            } else if n > 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            })
        }
        None => {
            let a = interp.to_string(a)?;
            let b = interp.to_string(b)?;
            Ok(a.cmp(&b))
        }
    }
}

/// `Object.prototype.*`
pub fn object_method(_: &mut Interpreter, name: &str, this: &Value, args: &[Value]) -> JsResult<Value> {
    Ok(match name {
        "hasOwnProperty" => {
            let key = arg(args, 0).to_property_key();
            Value::Bool(own_entries(this).iter().any(|(own, _)| *own == key))
        }
        "toString" => Value::String(this.to_js_string()),
        _ => this.clone(),
    })
}

/// `Function.prototype.*`
pub fn function_method(interp: &mut Interpreter, name: &str, this: &Value, args: &[Value]) -> JsResult<Value> {
    let Value::Function(func) = this else {
        return Err(type_error(format!("Function.prototype.{name} called on non-function")));
    };
    match name {
        "call" => interp.call(this, arg(args, 0), args.iter().skip(1).cloned().collect()),
        "apply" => {
            let list = match arg(args, 1) {
                Value::Undefined | Value::Null => Vec::new(),
                other => interp.iterate(&other)?,
            };
            interp.call(this, arg(args, 0), list)
        }
        "bind" => Ok(Value::Function(Rc::new(Function {
            name:  format!("bound {}", func.name).into(),
            kind:  FunctionKind::Bound {
                target: Rc::clone(func),
                this:   arg(args, 0),
                args:   args.iter().skip(1).cloned().collect(),
            },
            props: RefCell::new(PropMap::new()),
        }))),
        _ => Ok(Value::String(this.to_js_string())),
    }
}

/// `Map.prototype.*`
pub fn map_method(interp: &mut Interpreter, name: &str, this: &Value, args: &[Value]) -> JsResult<Value> {
    let Value::Map(entries) = this else {
        return Err(type_error(format!("Map.prototype.{name} called on incompatible receiver")));
    };
    let key = arg(args, 0);
    let position = || entries.borrow().iter().position(|(k, _)| k.same_value_zero(&key));

    Ok(match name {
        "get" => match position() {
            Some(index) => entries.borrow()[index].1.clone(),
            None => Value::Undefined,
        },
        "set" => {
            let value = arg(args, 1);
            match position() {
                Some(index) => entries.borrow_mut()[index].1 = value,
                None => entries.borrow_mut().push((key.clone(), value)),
            }
            this.clone()
        }
        "has" => Value::Bool(position().is_some()),
        "delete" => match position() {
            Some(index) => {
                entries.borrow_mut().remove(index);
                Value::Bool(true)
            }
            None => Value::Bool(false),
        },
        "clear" => {
            entries.borrow_mut().clear();
            Value::Undefined
        }
        "keys" => Value::array(entries.borrow().iter().map(|(k, _)| k.clone()).collect()),
        "values" => Value::array(entries.borrow().iter().map(|(_, v)| v.clone()).collect()),
        "entries" => Value::array(
            entries
                .borrow()
                .iter()
                .map(|(k, v)| Value::array(vec![k.clone(), v.clone()]))
                .collect(),
        ),
        "forEach" => {
            let func = callback(args, 0)?;
            let snapshot = entries.borrow().clone();
            for (k, v) in snapshot {
                interp.call(&func, arg(args, 1), vec![v, k, this.clone()])?;
            }
            Value::Undefined
        }
        _ => Value::Undefined,
    })
}

/// `Set.prototype.*`
pub fn set_method(interp: &mut Interpreter, name: &str, this: &Value, args: &[Value]) -> JsResult<Value> {
    let Value::Set(values) = this else {
        return Err(type_error(format!("Set.prototype.{name} called on incompatible receiver")));
    };
    let target = arg(args, 0);
    let position = || values.borrow().iter().position(|v| v.same_value_zero(&target));

    Ok(match name {
        "add" => {
            if position().is_none() {
                values.borrow_mut().push(target.clone());
            }
            this.clone()
        }
        "has" => Value::Bool(position().is_some()),
        "delete" => match position() {
            Some(index) => {
                values.borrow_mut().remove(index);
                Value::Bool(true)
            }
            None => Value::Bool(false),
        },
        "clear" => {
            values.borrow_mut().clear();
            Value::Undefined
        }
        "keys" | "values" => Value::array(values.borrow().clone()),
        "entries" => Value::array(
            values
                .borrow()
                .iter()
                .map(|v| Value::array(vec![v.clone(), v.clone()]))
                .collect(),
        ),
        "forEach" => {
            let func = callback(args, 0)?;
            let snapshot = values.borrow().clone();
            for v in snapshot {
                interp.call(&func, arg(args, 1), vec![v.clone(), v, this.clone()])?;
            }
            Value::Undefined
        }
        _ => Value::Undefined,
    })
}

/// `RegExp.prototype.*`
pub fn regexp_method(_: &mut Interpreter, name: &str, this: &Value, args: &[Value]) -> JsResult<Value> {
    let Value::RegExp(re) = this else {
        return Err(type_error(format!("RegExp.prototype.{name} called on incompatible receiver")));
    };
    let input = arg(args, 0).to_js_string();
    Ok(match name {
        "test" => Value::Bool(re.regex.is_match(&input)),
        "exec" => re
            .regex
            .captures(&input)
            .map_or(Value::Null, |caps| exec_result(&caps)),
        _ => Value::String(this.to_js_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_number_prefixes() {
        assert_eq!(parse_int("  42px", 0.0), 42.0);
        assert_eq!(parse_int("-0x1f", 0.0), -31.0);
        assert_eq!(parse_int("101", 2.0), 5.0);
        assert!(parse_int("abc", 10.0).is_nan());
        assert_eq!(parse_float("3.14abc"), 3.14);
        assert_eq!(parse_float(".5"), 0.5);
        assert!(parse_float("x1").is_nan());
    }

    #[test]
    fn formats_locale_and_precision() {
        assert_eq!(to_locale_string(1234567.891), "1,234,567.891");
        assert_eq!(to_locale_string(-1000.0), "-1,000");
        assert_eq!(to_locale_string(12.5), "12.5");
        assert_eq!(to_precision(123.456, 4), "123.5");
        assert_eq!(to_precision(0.000123, 2), "0.00012");
        assert_eq!(to_precision(123456.0, 2), "1.2e+5");
    }
}
