//! Conformance scripts.
//!
//! A script is a YAML sequence of steps run in order against one harness:
//!
//! ```yaml
//! - describe: Exercise exception handling
//! - eval: var c
//! - test: "var c=1; try{throw 0} catch(e){c=2} c"
//!   expect: 2
//! - test: undefinedThing
//!   throws: ReferenceError
//! - test: throw 5
//!   any_exception: true
//! - test: c = 4
//!   no_exception: true
//! - finish: true
//! ```
//!
//! `expect` and `throws` hold source text that is evaluated in the shared
//! context right before the test expression. YAML numbers and booleans are
//! turned back into source. A YAML `null` reads as a missing key, so the
//! expression `null` must be quoted.

use std::fs;
use std::path::Path;

use miette::{NamedSource, SourceSpan};
use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::ScriptError;
use crate::expect::{ExceptionSpec, Expectation, ANY_EXCEPTION, NO_EXCEPTION};
use crate::harness::Harness;
use crate::literal::literal;
use crate::runner::{Evaluator, Outcome};
use crate::session::ReportSink;
use crate::value::{number_to_string, Value};

/// One step as written in the file.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
struct RawStep {
    describe: Option<serde_yaml::Value>,
    eval: Option<serde_yaml::Value>,
    test: Option<serde_yaml::Value>,
    expect: Option<serde_yaml::Value>,
    throws: Option<serde_yaml::Value>,
    #[serde(default)]
    any_exception: bool,
    #[serde(default)]
    no_exception: bool,
    #[serde(default)]
    finish: bool,
}

/// A validated step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Describe(String),
    /// Set-up code. It must not throw.
    Eval(String),
    Test {
        source: String,
        expected: ExpectedSource,
    },
    Finish,
}

/// How a test step states its expectation.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedSource {
    /// Source of the expected completion value.
    Value(String),
    /// Source of the expected thrown value or error constructor.
    Throws(String),
    AnyException,
    NoException,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = fs::read_to_string(path).map_err(|e| ScriptError::from_io(path, e))?;
        Self::parse(&path.display().to_string(), &text)
    }

    /// Parses and validates script text. `name` labels diagnostics.
    pub fn parse(name: &str, text: &str) -> Result<Self, ScriptError> {
        let blank = text.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#')
        });
        if blank {
            return Ok(Self {
                name: name.to_string(),
                steps: Vec::new(),
            });
        }
        let raw: Option<Vec<RawStep>> =
            serde_yaml::from_str(text).map_err(|e| ScriptError::Syntax {
                message: e.to_string(),
                src: NamedSource::new(name, text.to_string()),
                span: e
                    .location()
                    .map(|location| SourceSpan::from((location.index(), 1))),
            })?;
        let steps = raw
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, step)| step.validate(name, i + 1))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(script = name, steps = steps.len(), "script loaded");
        Ok(Self {
            name: name.to_string(),
            steps,
        })
    }

    /// Runs every step in order. Stops at the first step that cannot be
    /// carried out, or at a `finish` that reports failures.
    pub fn run<E, S>(&self, harness: &mut Harness<E, S>) -> Result<(), ScriptError>
    where
        E: Evaluator,
        S: ReportSink,
    {
        info!(script = %self.name, "running script");
        for (i, step) in self.steps.iter().enumerate() {
            let index = i + 1;
            match step {
                Step::Describe(name) => harness.describe(name),
                Step::Eval(source) => {
                    self.evaluate(harness, index, source)?;
                }
                Step::Test { source, expected } => {
                    let expected = match expected {
                        ExpectedSource::Value(expr) => {
                            Expectation::Value(self.evaluate(harness, index, expr)?)
                        }
                        ExpectedSource::Throws(expr) => Expectation::Exception(
                            ExceptionSpec::from_expected(self.evaluate(harness, index, expr)?),
                        ),
                        ExpectedSource::AnyException => ANY_EXCEPTION,
                        ExpectedSource::NoException => NO_EXCEPTION,
                    };
                    harness.test(source, expected);
                }
                Step::Finish => {
                    harness.finish()?;
                }
            }
        }
        Ok(())
    }

    fn evaluate<E, S>(
        &self,
        harness: &mut Harness<E, S>,
        index: usize,
        source: &str,
    ) -> Result<Value, ScriptError>
    where
        E: Evaluator,
        S: ReportSink,
    {
        match harness.evaluate(source) {
            Outcome::Completed(value) => Ok(value),
            Outcome::Threw(thrown) => Err(ScriptError::Uncaught {
                script: self.name.clone(),
                index,
                expr: source.to_string(),
                thrown: literal(&thrown),
            }),
        }
    }
}

impl RawStep {
    fn validate(self, script: &str, index: usize) -> Result<Step, ScriptError> {
        let invalid = |reason: &str| ScriptError::InvalidStep {
            script: script.to_string(),
            index,
            reason: reason.to_string(),
        };
        let actions = [
            self.describe.is_some(),
            self.eval.is_some(),
            self.test.is_some(),
            self.finish,
        ];
        if actions.iter().filter(|set| **set).count() != 1 {
            return Err(invalid(
                "expected exactly one of describe, eval, test or finish",
            ));
        }
        let expectations = [
            self.expect.is_some(),
            self.throws.is_some(),
            self.any_exception,
            self.no_exception,
        ];
        let expectation_count = expectations.iter().filter(|set| **set).count();
        let scalar = |value: &serde_yaml::Value, field: &str| {
            source_text(value).ok_or_else(|| invalid(&format!("`{field}` must be a scalar")))
        };

        let Some(test) = &self.test else {
            if expectation_count > 0 {
                return Err(invalid("only a test step carries an expectation"));
            }
            return Ok(match (&self.describe, &self.eval) {
                (Some(name), _) => Step::Describe(scalar(name, "describe")?),
                (_, Some(source)) => Step::Eval(scalar(source, "eval")?),
                _ => Step::Finish,
            });
        };

        if expectation_count != 1 {
            return Err(invalid(
                "a test needs exactly one of expect, throws, any_exception or no_exception",
            ));
        }
        let expected = match (&self.expect, &self.throws) {
            (Some(expr), _) => ExpectedSource::Value(scalar(expr, "expect")?),
            (_, Some(expr)) => ExpectedSource::Throws(scalar(expr, "throws")?),
            _ if self.any_exception => ExpectedSource::AnyException,
            _ => ExpectedSource::NoException,
        };
        Ok(Step::Test {
            source: scalar(test, "test")?,
            expected,
        })
    }
}

/// Source text for a scalar YAML value.
fn source_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => n.as_f64().map(number_to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_validate() {
        let script = Script::parse(
            "inline",
            "- describe: numbers\n- eval: var x = 1\n- test: x + 1\n  expect: 2\n- test: oops\n  throws: ReferenceError\n- finish: true\n",
        )
        .unwrap();
        assert_eq!(
            script.steps,
            vec![
                Step::Describe("numbers".into()),
                Step::Eval("var x = 1".into()),
                Step::Test {
                    source: "x + 1".into(),
                    expected: ExpectedSource::Value("2".into()),
                },
                Step::Test {
                    source: "oops".into(),
                    expected: ExpectedSource::Throws("ReferenceError".into()),
                },
                Step::Finish,
            ]
        );
    }

    #[test]
    fn yaml_scalars_become_source() {
        let script =
            Script::parse("inline", "- test: 0/0\n  expect: .nan\n- test: t\n  expect: true\n")
                .unwrap();
        assert!(matches!(
            &script.steps[0],
            Step::Test { expected: ExpectedSource::Value(v), .. } if v == "NaN"
        ));
        assert!(matches!(
            &script.steps[1],
            Step::Test { expected: ExpectedSource::Value(v), .. } if v == "true"
        ));
    }

    #[test]
    fn empty_scripts_have_no_steps() {
        assert!(Script::parse("empty", "").unwrap().steps.is_empty());
    }

    #[test]
    fn ambiguous_steps_are_rejected() {
        let error = Script::parse("bad", "- describe: a\n  finish: true\n").unwrap_err();
        assert!(matches!(error, ScriptError::InvalidStep { index: 1, .. }));

        let error = Script::parse("bad", "- test: 1\n").unwrap_err();
        assert!(matches!(error, ScriptError::InvalidStep { .. }));

        let error = Script::parse("bad", "- test: 1\n  expect: 1\n  any_exception: true\n").unwrap_err();
        assert!(matches!(error, ScriptError::InvalidStep { .. }));

        let error = Script::parse("bad", "- eval: x\n  expect: 1\n").unwrap_err();
        assert!(matches!(error, ScriptError::InvalidStep { .. }));
    }

    #[test]
    fn malformed_yaml_is_a_syntax_error() {
        let error = Script::parse("bad", "- test: [1,\n").unwrap_err();
        assert!(matches!(error, ScriptError::Syntax { .. }));
        let error = Script::parse("bad", "- tset: 1\n").unwrap_err();
        assert!(matches!(error, ScriptError::Syntax { .. }));
    }
}
