//! Runtime values shared by the harness and the reference engine.
//!
//! A [`Value`] is what an evaluator hands back to the harness, either as the
//! completion value of a snippet or as the value it threw. Objects are shared
//! handles compared by identity; each carries an intrinsic [`ObjectKind`] that
//! doubles as its runtime class identity.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// Objects nested deeper than this while converting to a string are treated as
/// unrepresentable rather than recursed into.
pub const MAX_RENDER_DEPTH: usize = 32;

// ============================================================================
// ERROR KINDS AND NATIVE FUNCTIONS
// ============================================================================

/// The built-in error categories. The variant is the stable identity tag used
/// when matching a thrown error against an expected kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Error,
    EvalError,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
    UriError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::Error,
        ErrorKind::EvalError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
        ErrorKind::TypeError,
        ErrorKind::UriError,
    ];

    /// The constructor name, as scripts spell it.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::UriError => "URIError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host functions installed as globals by the reference engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeFunction {
    String,
    Number,
    Boolean,
    IsNaN,
}

impl NativeFunction {
    pub const ALL: [NativeFunction; 4] = [
        NativeFunction::String,
        NativeFunction::Number,
        NativeFunction::Boolean,
        NativeFunction::IsNaN,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NativeFunction::String => "String",
            NativeFunction::Number => "Number",
            NativeFunction::Boolean => "Boolean",
            NativeFunction::IsNaN => "isNaN",
        }
    }
}

// ============================================================================
// OBJECTS
// ============================================================================

/// What an object intrinsically is. Set at creation and never changed, so it
/// survives any property mutation a script performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Plain,
    Error(ErrorKind),
    ErrorConstructor(ErrorKind),
    Native(NativeFunction),
}

struct Object {
    kind: ObjectKind,
    properties: RefCell<Vec<(String, Value)>>,
}

/// A shared handle to an object. Clones alias the same object.
#[derive(Clone)]
pub struct ObjectRef(Rc<Object>);

impl ObjectRef {
    pub fn new(kind: ObjectKind) -> Self {
        ObjectRef(Rc::new(Object {
            kind,
            properties: RefCell::new(Vec::new()),
        }))
    }

    pub fn plain() -> Self {
        Self::new(ObjectKind::Plain)
    }

    /// Creates an error instance, recording `message` as an own property when
    /// one is given.
    pub fn error(kind: ErrorKind, message: Option<String>) -> Self {
        let object = Self::new(ObjectKind::Error(kind));
        if let Some(message) = message {
            object.set("message", Value::String(message));
        }
        object
    }

    pub fn kind(&self) -> ObjectKind {
        self.0.kind
    }

    /// The runtime class identity of an error instance.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.0.kind {
            ObjectKind::Error(kind) => Some(kind),
            _ => None,
        }
    }

    /// The kind an error constructor builds, if this object is one.
    pub fn constructor_kind(&self) -> Option<ErrorKind> {
        match self.0.kind {
            ObjectKind::ErrorConstructor(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self.0.kind,
            ObjectKind::ErrorConstructor(_) | ObjectKind::Native(_)
        )
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Reads a property: own properties first, then the ones every object of
    /// this kind exposes.
    pub fn get(&self, key: &str) -> Option<Value> {
        let own = self
            .0
            .properties
            .borrow()
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.clone());
        own.or_else(|| self.intrinsic(key))
    }

    pub fn set(&self, key: &str, value: Value) {
        let mut properties = self.0.properties.borrow_mut();
        match properties.iter_mut().find(|(name, _)| name == key) {
            Some(slot) => slot.1 = value,
            None => properties.push((key.to_string(), value)),
        }
    }

    /// Own property names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0
            .properties
            .borrow()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn intrinsic(&self, key: &str) -> Option<Value> {
        match (self.0.kind, key) {
            (ObjectKind::Error(kind), "name") => Some(Value::from(kind.name())),
            (ObjectKind::Error(_), "message") => Some(Value::from("")),
            (ObjectKind::ErrorConstructor(kind), "name") => Some(Value::from(kind.name())),
            (ObjectKind::Native(function), "name") => Some(Value::from(function.name())),
            _ => None,
        }
    }

    fn render_at(&self, depth: usize) -> Result<String, RenderError> {
        if depth >= MAX_RENDER_DEPTH {
            return Err(RenderError::TooDeep);
        }
        match self.0.kind {
            ObjectKind::Plain => Ok("[object Object]".to_string()),
            ObjectKind::ErrorConstructor(kind) => {
                Ok(format!("function {}() {{ [native code] }}", kind.name()))
            }
            ObjectKind::Native(function) => {
                Ok(format!("function {}() {{ [native code] }}", function.name()))
            }
            ObjectKind::Error(kind) => {
                let (name, message) = {
                    let properties = self
                        .0
                        .properties
                        .try_borrow()
                        .map_err(|_| RenderError::Busy)?;
                    let lookup = |key: &str| {
                        properties
                            .iter()
                            .find(|(name, _)| name == key)
                            .map(|(_, value)| value.clone())
                    };
                    (lookup("name"), lookup("message"))
                };
                let name = match name {
                    None | Some(Value::Undefined) => kind.name().to_string(),
                    Some(value) => value.render_at(depth + 1)?,
                };
                let message = match message {
                    None | Some(Value::Undefined) => String::new(),
                    Some(value) => value.render_at(depth + 1)?,
                };
                Ok(match (name.is_empty(), message.is_empty()) {
                    (_, true) => name,
                    (true, false) => message,
                    (false, false) => format!("{name}: {message}"),
                })
            }
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:?} @ {:p})", self.0.kind, Rc::as_ptr(&self.0))
    }
}

/// Why a value could not be converted to a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("value nests too deeply to be converted to a string")]
    TooDeep,
    #[error("object is being modified and cannot be read")]
    Busy,
}

// ============================================================================
// VALUES
// ============================================================================

/// A value produced or thrown by an evaluator.
///
/// ```rust
/// use conform::value::Value;
/// assert_eq!(Value::from(2).type_of(), "number");
/// assert!(Value::Number(f64::NAN).is_nan());
/// assert!(Value::from("2").loose_equals(&Value::from(2)));
/// assert!(!Value::from("2").strict_equals(&Value::from(2)));
/// ```
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Object(ObjectRef),
}

impl Value {
    /// The `typeof` name of the value.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(object) if object.is_callable() => "function",
            Value::Object(_) => "object",
        }
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_nan())
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Converts to a string the way the language's `String(v)` does. Fails
    /// only for objects that cannot be read or nest too deeply.
    pub fn render(&self) -> Result<String, RenderError> {
        self.render_at(0)
    }

    fn render_at(&self, depth: usize) -> Result<String, RenderError> {
        match self {
            Value::Undefined => Ok("undefined".to_string()),
            Value::Null => Ok("null".to_string()),
            Value::Boolean(b) => Ok(b.to_string()),
            Value::Number(n) => Ok(number_to_string(*n)),
            Value::String(s) => Ok(s.clone()),
            Value::Object(object) => object.render_at(depth),
        }
    }

    /// Primitive values are returned as-is; objects convert to their string.
    pub fn to_primitive(&self) -> Result<Value, RenderError> {
        match self {
            Value::Object(object) => object.render_at(0).map(Value::String),
            other => Ok(other.clone()),
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !(n.is_nan() || *n == 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Object(_) => match self.to_primitive() {
                Ok(primitive) => primitive.to_number(),
                Err(_) => f64::NAN,
            },
        }
    }

    /// `===`: same type and same value, objects by identity, NaN never equal.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// `==`: the abstract equality comparison with its type coercions.
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Number(a), Value::String(b)) => *a == string_to_number(b),
            (Value::String(a), Value::Number(b)) => string_to_number(a) == *b,
            (Value::Boolean(_), Value::Boolean(_)) => self.strict_equals(other),
            (Value::Boolean(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Boolean(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (Value::Object(_), Value::Number(_) | Value::String(_)) => self
                .to_primitive()
                .is_ok_and(|primitive| primitive.loose_equals(other)),
            (Value::Number(_) | Value::String(_), Value::Object(_)) => other
                .to_primitive()
                .is_ok_and(|primitive| self.loose_equals(&primitive)),
            _ => self.strict_equals(other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "<{} value>", self.type_of()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Value::Object(object)
    }
}

// ============================================================================
// NUMBER CONVERSIONS
// ============================================================================

/// Formats a number the way the language's `String(n)` does.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let mut buffer = ryu::Buffer::new();
    let (digits, point) = shortest_digits(buffer.format(n.abs()));
    let sign = if n < 0.0 { "-" } else { "" };
    let len = digits.len() as i32;
    let body = if len <= point && point <= 21 {
        format!("{digits}{}", "0".repeat((point - len) as usize))
    } else if 0 < point && point <= 21 {
        let (whole, fraction) = digits.split_at(point as usize);
        format!("{whole}.{fraction}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
    } else {
        let exponent = point - 1;
        let exponent_sign = if exponent < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        let fraction = if rest.is_empty() {
            String::new()
        } else {
            format!(".{rest}")
        };
        format!("{lead}{fraction}e{exponent_sign}{}", exponent.unsigned_abs())
    };
    format!("{sign}{body}")
}

/// Splits ryu's shortest round-trip text for a positive number into its
/// significant digits and the point position `p`, so the value is
/// `0.DIGITS * 10^p`.
fn shortest_digits(text: &str) -> (String, i32) {
    let (mantissa, exponent) = match text.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (text, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all = format!("{whole}{fraction}");
    let significant = all.trim_start_matches('0');
    let leading_zeros = (all.len() - significant.len()) as i32;
    let digits = significant.trim_end_matches('0').to_string();
    (digits, whole.len() as i32 + exponent - leading_zeros)
}

/// Parses a string the way the language's `Number(s)` does: surrounding
/// whitespace is ignored, the empty string is zero, anything malformed is NaN.
pub fn string_to_number(text: &str) -> f64 {
    let trimmed = text.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(digits) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if digits.is_empty() {
            return f64::NAN;
        }
        return digits.chars().try_fold(0.0, |acc, c| {
            c.to_digit(16).map(|digit| acc * 16.0 + f64::from(digit))
        }).unwrap_or(f64::NAN);
    }
    let (sign, body) = match trimmed.as_bytes()[0] {
        b'-' => (-1.0, &trimmed[1..]),
        b'+' => (1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    if body == "Infinity" {
        return sign * f64::INFINITY;
    }
    if !is_decimal_literal(body) {
        return f64::NAN;
    }
    body.parse::<f64>().map_or(f64::NAN, |n| sign * n)
}

fn is_decimal_literal(text: &str) -> bool {
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(at) => (&text[..at], Some(&text[at + 1..])),
        None => (text, None),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let mantissa_ok = digits(whole) && digits(fraction) && !(whole.is_empty() && fraction.is_empty());
    let exponent_ok = exponent.map_or(true, |exp| {
        let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        !exp.is_empty() && digits(exp)
    });
    mantissa_ok && exponent_ok
}
