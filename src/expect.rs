//! Expected outcomes of a test case.

use crate::value::{ErrorKind, Value};

/// What kind of throw a test case expects.
///
/// `Any` and `NoException` are sentinels. They are told apart from ordinary
/// expected values by their variant, never by comparing values.
#[derive(Debug, Clone)]
pub enum ExceptionSpec {
    /// A thrown value loosely equal (`==`) to this one.
    ExactValue(Value),
    /// A thrown error object whose class is exactly this kind.
    InstanceOfKind(ErrorKind),
    /// Any thrown value.
    Any,
    /// The snippet must complete without throwing.
    NoException,
}

impl ExceptionSpec {
    /// Classifies the value a script passes as "expected exception". An error
    /// constructor becomes a kind match; anything else must be thrown as-is.
    ///
    /// ```rust
    /// use conform::expect::ExceptionSpec;
    /// use conform::value::{ErrorKind, ObjectKind, ObjectRef, Value};
    /// let ctor = Value::Object(ObjectRef::new(ObjectKind::ErrorConstructor(ErrorKind::TypeError)));
    /// assert!(matches!(ExceptionSpec::from_expected(ctor), ExceptionSpec::InstanceOfKind(ErrorKind::TypeError)));
    /// assert!(matches!(ExceptionSpec::from_expected(Value::from(0)), ExceptionSpec::ExactValue(_)));
    /// ```
    pub fn from_expected(expected: Value) -> Self {
        match expected.as_object().and_then(|object| object.constructor_kind()) {
            Some(kind) => ExceptionSpec::InstanceOfKind(kind),
            None => ExceptionSpec::ExactValue(expected),
        }
    }

    /// Whether `thrown` satisfies this expectation.
    pub fn matches(&self, thrown: &Value) -> bool {
        match self {
            ExceptionSpec::ExactValue(expected) => expected.loose_equals(thrown),
            // Intrinsic kind only: a plain object dressed up with the same
            // name and message is not an instance.
            ExceptionSpec::InstanceOfKind(kind) => thrown
                .as_object()
                .and_then(|object| object.error_kind())
                == Some(*kind),
            ExceptionSpec::Any => true,
            ExceptionSpec::NoException => false,
        }
    }

    /// True for the variants that describe a particular thrown value.
    pub fn requires_throw(&self) -> bool {
        matches!(
            self,
            ExceptionSpec::ExactValue(_) | ExceptionSpec::InstanceOfKind(_)
        )
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, ExceptionSpec::Any | ExceptionSpec::NoException)
    }
}

/// The expected outcome handed to the runner alongside a snippet.
#[derive(Debug, Clone)]
pub enum Expectation {
    Value(Value),
    Exception(ExceptionSpec),
}

/// Passes whenever the snippet throws, whatever it throws.
pub const ANY_EXCEPTION: Expectation = Expectation::Exception(ExceptionSpec::Any);

/// Passes whenever the snippet completes, whatever it returns.
pub const NO_EXCEPTION: Expectation = Expectation::Exception(ExceptionSpec::NoException);

impl From<Value> for Expectation {
    fn from(value: Value) -> Self {
        Expectation::Value(value)
    }
}

impl From<ExceptionSpec> for Expectation {
    fn from(spec: ExceptionSpec) -> Self {
        Expectation::Exception(spec)
    }
}

impl From<f64> for Expectation {
    fn from(n: f64) -> Self {
        Expectation::Value(Value::from(n))
    }
}

impl From<i32> for Expectation {
    fn from(n: i32) -> Self {
        Expectation::Value(Value::from(n))
    }
}

impl From<bool> for Expectation {
    fn from(b: bool) -> Self {
        Expectation::Value(Value::from(b))
    }
}

impl From<&str> for Expectation {
    fn from(s: &str) -> Self {
        Expectation::Value(Value::from(s))
    }
}

impl From<String> for Expectation {
    fn from(s: String) -> Self {
        Expectation::Value(Value::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ObjectKind, ObjectRef};

    #[test]
    fn exact_values_match_loosely() {
        let spec = ExceptionSpec::from_expected(Value::from(5));
        assert!(spec.matches(&Value::from(5)));
        assert!(spec.matches(&Value::from("5")));
        assert!(!spec.matches(&Value::from(6)));
        assert!(spec.requires_throw());
    }

    #[test]
    fn kinds_match_by_class_identity() {
        let spec = ExceptionSpec::InstanceOfKind(ErrorKind::RangeError);
        let range = ObjectRef::error(ErrorKind::RangeError, None);
        assert!(spec.matches(&Value::Object(range)));

        let lookalike = ObjectRef::plain();
        lookalike.set("name", Value::from("RangeError"));
        lookalike.set("message", Value::from(""));
        assert!(!spec.matches(&Value::Object(lookalike)));

        let other = ObjectRef::error(ErrorKind::TypeError, None);
        assert!(!spec.matches(&Value::Object(other)));
        assert!(!spec.matches(&Value::from("RangeError")));
    }

    #[test]
    fn renamed_error_keeps_its_kind() {
        let spec = ExceptionSpec::InstanceOfKind(ErrorKind::SyntaxError);
        let error = ObjectRef::error(ErrorKind::SyntaxError, None);
        error.set("name", Value::from("Whatever"));
        assert!(spec.matches(&Value::Object(error)));
    }

    #[test]
    fn non_error_constructors_are_exact_values() {
        let native = Value::Object(ObjectRef::new(ObjectKind::Native(
            crate::value::NativeFunction::String,
        )));
        assert!(matches!(
            ExceptionSpec::from_expected(native),
            ExceptionSpec::ExactValue(_)
        ));
    }

    #[test]
    fn sentinels() {
        assert!(ExceptionSpec::Any.matches(&Value::Undefined));
        assert!(!ExceptionSpec::NoException.matches(&Value::Undefined));
        assert!(!ExceptionSpec::Any.requires_throw());
        assert!(ExceptionSpec::NoException.is_sentinel());
    }
}
