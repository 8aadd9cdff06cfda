//! Literalization: rendering values as escaped, printable diagnostic text.
//!
//! Every report line the harness writes goes through here, so rendering is
//! total. A value that cannot be converted is replaced by a string naming its
//! type instead of failing the report.

use crate::expect::{ExceptionSpec, Expectation};
use crate::value::Value;

/// Anything the harness can print in a report line.
pub trait Literalize {
    fn literalize(&self) -> String;
}

impl Literalize for Value {
    fn literalize(&self) -> String {
        literal(self)
    }
}

impl Literalize for ExceptionSpec {
    fn literalize(&self) -> String {
        match self {
            ExceptionSpec::NoException => "NO_EXCEPTION".to_string(),
            ExceptionSpec::Any => "ANY_EXCEPTION".to_string(),
            ExceptionSpec::ExactValue(value) => format!("throw {}", literal(value)),
            ExceptionSpec::InstanceOfKind(kind) => format!("throw {}(...)", kind.name()),
        }
    }
}

impl Literalize for Expectation {
    fn literalize(&self) -> String {
        match self {
            Expectation::Value(value) => literal(value),
            Expectation::Exception(spec) => spec.literalize(),
        }
    }
}

/// Renders a value for a report line: strings quoted and escaped, everything
/// else in its natural string form.
///
/// ```rust
/// use conform::literal::literal;
/// use conform::value::Value;
/// assert_eq!(literal(&Value::from("a\tb")), r#""a\tb""#);
/// assert_eq!(literal(&Value::from(1.5)), "1.5");
/// ```
pub fn literal(value: &Value) -> String {
    match value {
        Value::String(text) => escape_string(text),
        other => other
            .render()
            .unwrap_or_else(|_| format!("<cannot represent {} value as string>", other.type_of())),
    }
}

/// Quotes `text` and escapes it so that every character in the result is
/// printable ASCII. Escapes are per UTF-16 code unit, so a character outside
/// the BMP shows as its surrogate pair.
pub fn escape_string(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if matches!(c, '\\' | '\'' | '"') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');

    let mut escaped = String::with_capacity(quoted.len());
    for unit in quoted.encode_utf16() {
        let code = u32::from(unit);
        match code {
            0x0a => escaped.push_str("\\n"),
            0x09 => escaped.push_str("\\t"),
            0x0d => escaped.push_str("\\r"),
            _ if code < 0x10 => escaped.push_str(&format!("\\x0{code:x}")),
            _ if code < 0x20 => escaped.push_str(&format!("\\x{code:x}")),
            _ if code < 0x7f => escaped.push(char::from(unit as u8)),
            _ if code < 0x100 => escaped.push_str(&format!("\\x{code:x}")),
            _ if code < 0x1000 => escaped.push_str(&format!("\\u0{code:x}")),
            _ => escaped.push_str(&format!("\\u{code:x}")),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect::{ANY_EXCEPTION, NO_EXCEPTION};
    use crate::value::{ErrorKind, ObjectRef};

    #[test]
    fn control_characters_follow_the_bracket_rule() {
        assert_eq!(escape_string("\u{5}"), r#""\x05""#);
        assert_eq!(escape_string("\u{1b}"), r#""\x1b""#);
        assert_eq!(escape_string("\u{7f}"), r#""\x7f""#);
        assert_eq!(escape_string("\u{e9}"), r#""\xe9""#);
        assert_eq!(escape_string("\u{100}"), r#""\u0100""#);
        assert_eq!(escape_string("\u{2020}"), r#""\u2020""#);
        assert_eq!(escape_string("\u{1f600}"), r#""\ud83d\ude00""#);
    }

    #[test]
    fn astral_characters_are_distinguishable() {
        assert_ne!(escape_string("\u{1f600}"), escape_string("\u{1f60}0"));
        assert_eq!(escape_string("\u{1f60}0"), r#""\u1f600""#);
    }

    #[test]
    fn quotes_and_backslashes_are_escaped() {
        assert_eq!(escape_string(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(escape_string("it's"), r#""it\'s""#);
        assert_eq!(escape_string("a\\b"), r#""a\\b""#);
        assert_eq!(escape_string("line\r\n"), r#""line\r\n""#);
    }

    #[test]
    fn non_strings_use_their_natural_form() {
        assert_eq!(literal(&Value::Undefined), "undefined");
        assert_eq!(literal(&Value::Null), "null");
        assert_eq!(literal(&Value::Number(f64::NAN)), "NaN");
        assert_eq!(literal(&Value::from(false)), "false");
        let error = ObjectRef::error(ErrorKind::TypeError, Some("no".into()));
        assert_eq!(literal(&Value::Object(error)), "TypeError: no");
    }

    #[test]
    fn unrenderable_values_fall_back_to_their_type() {
        let error = ObjectRef::error(ErrorKind::Error, None);
        error.set("name", Value::Object(error.clone()));
        assert_eq!(
            literal(&Value::Object(error)),
            "<cannot represent object value as string>"
        );
    }

    #[test]
    fn expectations_render_with_their_sentinel_names() {
        assert_eq!(ANY_EXCEPTION.literalize(), "ANY_EXCEPTION");
        assert_eq!(NO_EXCEPTION.literalize(), "NO_EXCEPTION");
        assert_eq!(
            ExceptionSpec::InstanceOfKind(ErrorKind::RangeError).literalize(),
            "throw RangeError(...)"
        );
        assert_eq!(
            ExceptionSpec::ExactValue(Value::from("x")).literalize(),
            r#"throw "x""#
        );
        assert_eq!(Expectation::from(3).literalize(), "3");
    }
}
