#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Script values and the conversions JavaScript applies between them.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use super::{
    ast::{ClassDef, FunctionDef},
    error::JsResult,
    interpreter::Interpreter,
    scope::ScopeRef,
};

/// A built-in function.
pub type NativeFn = fn(&mut Interpreter, &Value, &[Value]) -> JsResult<Value>;

/// A built-in method; receives its own name so one dispatcher can serve a
/// whole family.
pub type MethodFn = fn(&mut Interpreter, &str, &Value, &[Value]) -> JsResult<Value>;

/// Insertion-ordered property storage.
#[derive(Clone, Default)]
pub struct PropMap {
    /// Properties in insertion order.
    entries: Vec<(Rc<str>, Value)>,
}

impl PropMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a property.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| &**k == key).map(|(_, v)| v)
    }

    /// Whether the property exists.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| &**k == key)
    }

    /// Creates or overwrites a property.
    pub fn set(&mut self, key: Rc<str>, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Removes a property, returning whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| &**k != key);
        before != self.entries.len()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Properties in JavaScript enumeration order: integer keys ascending,
    /// then the rest in insertion order.
    pub fn ordered(&self) -> Vec<(Rc<str>, Value)> {
        let mut indexed: Vec<(usize, Rc<str>, Value)> = Vec::new();
        let mut named = Vec::new();
        for (key, value) in &self.entries {
            match array_index(key) {
                Some(index) => indexed.push((index, Rc::clone(key), value.clone())),
                None => named.push((Rc::clone(key), value.clone())),
            }
        }
        indexed.sort_by_key(|(index, ..)| *index);
        indexed
            .into_iter()
            .map(|(_, key, value)| (key, value))
            .chain(named)
            .collect()
    }

    /// Keys in enumeration order.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.ordered().into_iter().map(|(key, _)| key).collect()
    }
}

/// Name and message carried by error objects.
#[derive(Clone)]
pub struct ErrorData {
    /// Constructor name, e.g. `TypeError`.
    pub name:    Rc<str>,
    /// Message passed to the constructor.
    pub message: Rc<str>,
}

/// A plain object or class instance.
#[derive(Default)]
pub struct Object {
    /// Own enumerable properties.
    pub props: PropMap,
    /// Class the object was constructed from.
    pub class: Option<Rc<Function>>,
    /// Present on error objects.
    pub error: Option<ErrorData>,
}

/// A compiled regular expression literal.
pub struct RegExpData {
    /// Pattern source as written.
    pub source: Rc<str>,
    /// Flags as written.
    pub flags:  Rc<str>,
    /// Compiled matcher.
    pub regex:  regex::Regex,
}

impl RegExpData {
    /// Whether the `g` flag is set.
    pub fn global(&self) -> bool {
        self.flags.contains('g')
    }
}

/// Runtime data of a class.
pub struct ClassData {
    /// Declaration.
    pub def:     Rc<ClassDef>,
    /// Scope the class was declared in.
    pub env:     ScopeRef,
    /// Superclass.
    pub parent:  Option<Rc<Function>>,
    /// Instance methods.
    pub methods: RefCell<PropMap>,
    /// Instance getters.
    pub getters: RefCell<PropMap>,
    /// Instance setters.
    pub setters: RefCell<PropMap>,
}

/// How a function is implemented.
pub enum FunctionKind {
    /// Script function with its captured scope.
    Closure {
        /// Definition.
        def:  Rc<FunctionDef>,
        /// Captured scope.
        env:  ScopeRef,
        /// Owning class, for methods.
        home: Option<Weak<Function>>,
    },
    /// Built-in function, optionally usable with `new`.
    Native {
        /// Behaviour when called.
        call:      NativeFn,
        /// Behaviour with `new`.
        construct: Option<NativeFn>,
    },
    /// Built-in method of a primitive or built-in object.
    Method(MethodFn),
    /// Result of `Function.prototype.bind`.
    Bound {
        /// Wrapped function.
        target: Rc<Function>,
        /// Fixed receiver.
        this:   Value,
        /// Leading arguments.
        args:   Vec<Value>,
    },
    /// A class constructor.
    Class(ClassData),
}

/// A callable value.
pub struct Function {
    /// `name` property.
    pub name:  Rc<str>,
    /// Implementation.
    pub kind:  FunctionKind,
    /// Static members.
    pub props: RefCell<PropMap>,
}

impl Function {
    /// Wraps a built-in function.
    pub fn native(name: &str, call: NativeFn) -> Rc<Self> {
        Rc::new(Self {
            name:  name.into(),
            kind:  FunctionKind::Native {
                call,
                construct: None,
            },
            props: RefCell::new(PropMap::new()),
        })
    }

    /// Wraps a built-in constructor.
    pub fn constructor(name: &str, call: NativeFn, construct: NativeFn) -> Rc<Self> {
        Rc::new(Self {
            name:  name.into(),
            kind:  FunctionKind::Native {
                call,
                construct: Some(construct),
            },
            props: RefCell::new(PropMap::new()),
        })
    }

    /// Wraps a built-in method.
    pub fn method(name: &str, call: MethodFn) -> Rc<Self> {
        Rc::new(Self {
            name:  name.into(),
            kind:  FunctionKind::Method(call),
            props: RefCell::new(PropMap::new()),
        })
    }

    /// Class data, if this is a class.
    pub fn class_data(&self) -> Option<&ClassData> {
        match &self.kind {
            FunctionKind::Class(data) => Some(data),
            _ => None,
        }
    }

    /// Finds an instance method on this class or its ancestors.
    pub fn find_method(&self, name: &str) -> Option<Value> {
        let data = self.class_data()?;
        if let Some(method) = data.methods.borrow().get(name) {
            return Some(method.clone());
        }
        data.parent.as_ref()?.find_method(name)
    }

    /// Finds an instance getter on this class or its ancestors.
    pub fn find_getter(&self, name: &str) -> Option<Value> {
        let data = self.class_data()?;
        if let Some(getter) = data.getters.borrow().get(name) {
            return Some(getter.clone());
        }
        data.parent.as_ref()?.find_getter(name)
    }

    /// Finds an instance setter on this class or its ancestors.
    pub fn find_setter(&self, name: &str) -> Option<Value> {
        let data = self.class_data()?;
        if let Some(setter) = data.setters.borrow().get(name) {
            return Some(setter.clone());
        }
        data.parent.as_ref()?.find_setter(name)
    }

    /// Whether `self` is `other` or one of its subclasses.
    pub fn extends(self: &Rc<Self>, other: &Rc<Function>) -> bool {
        if Rc::ptr_eq(self, other) {
            return true;
        }
        match self.class_data().and_then(|data| data.parent.as_ref()) {
            Some(parent) => parent.extends(other),
            None => false,
        }
    }
}

/// A JavaScript value.
#[derive(Clone, Default)]
pub enum Value {
    /// `undefined`
    #[default]
    Undefined,
    /// `null`
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A string.
    String(Rc<str>),
    /// An array.
    Array(Rc<RefCell<Vec<Value>>>),
    /// An object.
    Object(Rc<RefCell<Object>>),
    /// A function or class.
    Function(Rc<Function>),
    /// A `Map`, entries in insertion order.
    Map(Rc<RefCell<Vec<(Value, Value)>>>),
    /// A `Set`, values in insertion order.
    Set(Rc<RefCell<Vec<Value>>>),
    /// A regular expression.
    RegExp(Rc<RegExpData>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(items) => write!(f, "Array({})", items.borrow().len()),
            Value::Object(_) => write!(f, "Object"),
            Value::Function(func) => write!(f, "Function({})", func.name),
            Value::Map(entries) => write!(f, "Map({})", entries.borrow().len()),
            Value::Set(values) => write!(f, "Set({})", values.borrow().len()),
            other => write!(f, "{}", other.to_js_string()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::String(s)
    }
}

impl Value {
    /// A new array.
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    /// A new plain object.
    pub fn object(props: PropMap) -> Self {
        Value::Object(Rc::new(RefCell::new(Object {
            props,
            ..Object::default()
        })))
    }

    /// A new error object.
    pub fn error(name: &str, message: &str) -> Self {
        Value::Object(Rc::new(RefCell::new(Object {
            error: Some(ErrorData {
                name:    name.into(),
                message: message.into(),
            }),
            ..Object::default()
        })))
    }

    /// Converts parsed JSON into a fresh value graph.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.as_str().into()),
            serde_json::Value::Array(items) => {
                Value::array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut props = PropMap::new();
                for (key, value) in map {
                    props.set(key.as_str().into(), Value::from_json(value));
                }
                Value::object(props)
            }
        }
    }

    /// `undefined` or `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Values whose `typeof` is `"object"` or `"function"`.
    pub fn is_reference(&self) -> bool {
        !matches!(
            self,
            Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
        )
    }

    /// JavaScript truthiness.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// The `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            _ => "object",
        }
    }

    /// `Number(value)` without calling user code.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.to_js_string()),
            _ => f64::NAN,
        }
    }

    /// `String(value)` without calling user code.
    pub fn to_js_string(&self) -> Rc<str> {
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Bool(b) => (if *b { "true" } else { "false" }).into(),
            Value::Number(n) => number_to_string(*n).into(),
            Value::String(s) => Rc::clone(s),
            Value::Array(items) => {
                let Ok(items) = items.try_borrow() else {
                    return "".into();
                };
                items
                    .iter()
                    .map(|item| {
                        if item.is_nullish() {
                            String::new()
                        } else {
                            item.to_js_string().to_string()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(",")
                    .into()
            }
            Value::Object(object) => {
                let object = object.borrow();
                match &object.error {
                    Some(error) => {
                        let name = match object.props.get("name") {
                            Some(Value::String(name)) => Rc::clone(name),
                            _ => Rc::clone(&error.name),
                        };
                        let message = match object.props.get("message") {
                            Some(Value::String(message)) => Rc::clone(message),
                            _ => Rc::clone(&error.message),
                        };
                        if message.is_empty() {
                            name
                        } else {
                            format!("{name}: {message}").into()
                        }
                    }
                    None => "[object Object]".into(),
                }
            }
            Value::Function(func) => match func.kind {
                FunctionKind::Class(_) => format!("class {} {{ }}", func.name).into(),
                _ => format!("function {}() {{ [native code] }}", func.name).into(),
            },
            Value::Map(_) => "[object Map]".into(),
            Value::Set(_) => "[object Set]".into(),
            Value::RegExp(re) => format!("/{}/{}", re.source, re.flags).into(),
        }
    }

    /// Converts to a property key.
    pub fn to_property_key(&self) -> Rc<str> {
        self.to_js_string()
    }

    /// The message of an error object.
    pub fn error_message(&self) -> Option<Rc<str>> {
        let Value::Object(object) = self else {
            return None;
        };
        let object = object.borrow();
        let error = object.error.as_ref()?;
        match object.props.get("message") {
            Some(Value::String(message)) => Some(Rc::clone(message)),
            _ => Some(Rc::clone(&error.message)),
        }
    }

    /// Whether both values are the same heap object.
    pub fn same_reference(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::RegExp(a), Value::RegExp(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => self.same_reference(other),
        }
    }

    /// SameValueZero, used by `includes`, `Map` and `Set`.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }

    /// `==`
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(a), Value::String(_)) => *a == other.to_number(),
            (Value::String(_), Value::Number(b)) => self.to_number() == *b,
            (Value::Bool(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Bool(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (a, b) if a.is_reference() && !b.is_reference() => {
                Value::String(a.to_js_string()).loose_equals(b)
            }
            (a, b) if !a.is_reference() && b.is_reference() => {
                a.loose_equals(&Value::String(b.to_js_string()))
            }
            _ => self.strict_equals(other),
        }
    }
}

/// Parses a canonical array index such as `"0"` or `"17"`.
pub fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

/// `Number.prototype.toString()` with radix 10.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string();
    }

    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{n}");
    }

    let formatted = format!("{n:e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => formatted,
    }
}

/// `Number.prototype.toString(radix)` for radixes other than 10.
pub fn number_to_radix_string(n: f64, radix: u32) -> String {
    if radix == 10 || !n.is_finite() || n.fract() != 0.0 || n.abs() > 9.007_199_254_740_991e15 {
        return number_to_string(n);
    }
    let negative = n < 0.0;
    let mut rest = n.abs() as u64;
    if rest == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while rest > 0 {
        let digit = (rest % u64::from(radix)) as u32;
        digits.push(char::from_digit(digit, radix).unwrap_or('?'));
        rest /= u64::from(radix);
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// `Number.prototype.toFixed(digits)`, rounding exact ties upwards in
/// magnitude.
pub fn number_to_fixed(n: f64, digits: usize) -> String {
    if !n.is_finite() || n.abs() >= 1e21 {
        return number_to_string(n);
    }
    let n = if n == 0.0 { 0.0 } else { n };
    let scale = 10f64.powi(digits as i32);
    let scaled = n.abs() * scale;
    let value = if scaled.fract() == 0.5 && scaled < 4.503_599_627_370_496e15 {
        (scaled.trunc() + 1.0) / scale * n.signum()
    } else {
        n
    };
    format!("{:.*}", digits, value)
}

/// `Number(string)`.
pub fn string_to_number(s: &str) -> f64 {
    let text = s.trim();
    if text.is_empty() {
        return 0.0;
    }
    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = text.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix)
                .map(|v| v as f64)
                .unwrap_or(f64::NAN);
        }
    }
    if text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        text.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// The ToInt32 conversion used by bitwise operators.
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// The ToUint32 conversion used by `>>>`.
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_numbers_like_javascript() {
        assert_eq!(number_to_string(42.0), "42");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1.5e-7), "1.5e-7");
        assert_eq!(number_to_string(123456789.0), "123456789");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn fixed_rounds_ties_up() {
        assert_eq!(number_to_fixed(2.5, 0), "3");
        assert_eq!(number_to_fixed(1.005, 2), "1.00");
        assert_eq!(number_to_fixed(3.14159, 2), "3.14");
        assert_eq!(number_to_fixed(-2.5, 0), "-3");
        assert_eq!(number_to_fixed(-0.0, 1), "0.0");
    }

    #[test]
    fn parses_numeric_strings() {
        assert_eq!(string_to_number(" 42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x1f"), 31.0);
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("12px").is_nan());
    }

    #[test]
    fn integer_keys_enumerate_first() {
        let mut props = PropMap::new();
        props.set("b".into(), Value::Null);
        props.set("2".into(), Value::Null);
        props.set("a".into(), Value::Null);
        props.set("1".into(), Value::Null);
        let keys: Vec<String> = props.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["1", "2", "b", "a"]);
    }

    #[test]
    fn loose_equality_coerces() {
        assert!(Value::Number(1.0).loose_equals(&Value::from("1")));
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.loose_equals(&Value::Number(0.0)));
        assert!(Value::Bool(true).loose_equals(&Value::Number(1.0)));
    }
}
