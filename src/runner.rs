//! Running one test case: evaluate, classify the outcome, judge it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error};

use crate::expect::{ExceptionSpec, Expectation};
use crate::literal::{literal, Literalize};
use crate::value::Value;

/// How a snippet ended.
#[derive(Debug, Clone)]
pub enum Outcome {
    Completed(Value),
    Threw(Value),
}

/// The code-evaluation capability under test.
///
/// Implementations keep one long-lived scope: bindings made by a snippet stay
/// visible to every later snippet. Scripts are written against that, so an
/// evaluator must not reset its state between calls.
pub trait Evaluator {
    fn evaluate(&mut self, source: &str) -> Outcome;
}

impl<F> Evaluator for F
where
    F: FnMut(&str) -> Outcome,
{
    fn evaluate(&mut self, source: &str) -> Outcome {
        self(source)
    }
}

/// The verdict on one test case plus everything needed to print it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub source: String,
    pub passed: bool,
    /// Literal of the completion value, or `throw <literal>` of the thrown one.
    pub actual: String,
    /// Literal of the expectation.
    pub expected: String,
}

impl CaseReport {
    /// `<source> = <actual>`.
    pub fn message(&self) -> String {
        format!("{} = {}", self.source, self.actual)
    }
}

/// Evaluates `source` and judges the outcome against `expected`. Never
/// panics and never propagates a failure: the verdict is in the report.
pub fn run_case<E>(evaluator: &mut E, source: &str, expected: &Expectation) -> CaseReport
where
    E: Evaluator + ?Sized,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(source)));
    let (passed, actual) = match outcome {
        Ok(Outcome::Completed(value)) => (completion_passes(expected, &value), literal(&value)),
        Ok(Outcome::Threw(thrown)) => (
            throw_passes(expected, &thrown),
            format!("throw {}", literal(&thrown)),
        ),
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!(source, %reason, "evaluator panicked");
            (false, format!("<evaluation aborted: {reason}>"))
        }
    };
    debug!(source, passed, %actual, "case evaluated");
    CaseReport {
        source: source.to_string(),
        passed,
        actual,
        expected: expected.literalize(),
    }
}

fn completion_passes(expected: &Expectation, actual: &Value) -> bool {
    match expected {
        Expectation::Exception(spec) if spec.requires_throw() => false,
        Expectation::Exception(ExceptionSpec::NoException) => true,
        // Only a throw satisfies ANY_EXCEPTION.
        Expectation::Exception(_) => false,
        Expectation::Value(expected) if expected.is_nan() => actual.is_nan(),
        Expectation::Value(expected) => actual.strict_equals(expected),
    }
}

fn throw_passes(expected: &Expectation, thrown: &Value) -> bool {
    match expected {
        Expectation::Exception(ExceptionSpec::Any) => true,
        Expectation::Exception(spec) if spec.requires_throw() => spec.matches(thrown),
        _ => false,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
