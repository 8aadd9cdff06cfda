//! The object scripts talk to: an evaluator plus the session reporting on it.

use crate::errors::HarnessError;
use crate::expect::Expectation;
use crate::runner::{run_case, Evaluator, Outcome};
use crate::session::{ReportSink, Session, Summary};

/// Drives test cases through an [`Evaluator`] and reports them to a
/// [`Session`]. Both live as long as the harness, so every snippet sees the
/// bindings earlier snippets made.
///
/// ```rust
/// use conform::{Engine, Harness, BufferSink};
/// let mut harness = Harness::new(Engine::new(), BufferSink::new());
/// harness.describe("arithmetic");
/// assert!(harness.test("1 + 1", 2));
/// assert!(harness.finish().is_ok());
/// ```
pub struct Harness<E: Evaluator, S: ReportSink> {
    evaluator: E,
    session: Session<S>,
}

impl<E: Evaluator, S: ReportSink> Harness<E, S> {
    pub fn new(evaluator: E, sink: S) -> Self {
        Self {
            evaluator,
            session: Session::new(sink),
        }
    }

    pub fn describe(&mut self, name: &str) {
        self.session.describe(name);
    }

    /// Runs one case and records it. Returns whether it passed.
    pub fn test(&mut self, source: &str, expected: impl Into<Expectation>) -> bool {
        let expected = expected.into();
        let report = run_case(&mut self.evaluator, source, &expected);
        self.session.record(&report)
    }

    /// Short alias for [`Harness::test`].
    pub fn t(&mut self, source: &str, expected: impl Into<Expectation>) -> bool {
        self.test(source, expected)
    }

    /// Evaluates set-up code in the shared context without recording a case.
    pub fn evaluate(&mut self, source: &str) -> Outcome {
        self.evaluator.evaluate(source)
    }

    pub fn finish(&mut self) -> Result<Summary, HarnessError> {
        self.session.finish()
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn into_parts(self) -> (E, Session<S>) {
        (self.evaluator, self.session)
    }
}
