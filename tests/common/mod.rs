#![allow(dead_code)]

use conform::{BufferSink, Engine, Harness, Outcome, Value};

pub type TestHarness = Harness<Engine, BufferSink>;

/// A harness over a fresh engine, reporting into a buffer.
pub fn harness(group: &str) -> TestHarness {
    let mut harness = Harness::new(Engine::new(), BufferSink::new());
    harness.describe(group);
    harness
}

/// Report lines written after the opening banner.
pub fn verdicts(harness: &TestHarness) -> Vec<String> {
    harness.session().sink().lines[4..].to_vec()
}

pub fn last_line(harness: &TestHarness) -> String {
    harness
        .session()
        .sink()
        .lines
        .last()
        .cloned()
        .unwrap_or_default()
}

/// Evaluates set-up code that must complete.
pub fn value_of(harness: &mut TestHarness, source: &str) -> Value {
    match harness.evaluate(source) {
        Outcome::Completed(value) => value,
        Outcome::Threw(thrown) => panic!("`{source}` threw {thrown}"),
    }
}
