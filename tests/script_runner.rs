use std::path::{Path, PathBuf};

use conform::config::exit_code;
use conform::{BufferSink, Engine, Harness, Script, ScriptError, SessionState};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/scripts")
        .join(name)
}

fn run(names: &[&str]) -> (Harness<Engine, BufferSink>, Result<(), ScriptError>) {
    let mut harness = Harness::new(Engine::new(), BufferSink::new());
    let mut result = Ok(());
    for name in names {
        result = Script::load(&fixture(name)).and_then(|script| script.run(&mut harness));
        if result.is_err() {
            break;
        }
    }
    (harness, result)
}

#[test]
fn exception_handling_script_passes() {
    let (harness, result) = run(&["throw.yaml"]);
    result.unwrap();
    let session = harness.session();
    assert_eq!(session.failures(), 0);
    assert_eq!(session.total(), 15);
    assert_eq!(session.state(), SessionState::Finished);
    let text = session.sink().as_text();
    assert!(text.contains("Test: Exercise exception handling"));
    assert!(text.contains("undefinedThing = throw ReferenceError: undefinedThing is not defined - PASS"));
    assert!(text.contains("     15 of 15 sub-tests passed"));
}

#[test]
fn scripts_share_one_engine_and_session() {
    let (harness, result) = run(&["throw.yaml", "grammar.yaml"]);
    result.unwrap();
    assert_eq!(harness.session().total(), 25);
    assert!(harness
        .session()
        .sink()
        .as_text()
        .contains("End: Expressions and shared state\n     25 of 25 sub-tests passed"));
}

#[test]
fn failing_group_stops_the_run() {
    let (harness, result) = run(&["failing.yaml", "grammar.yaml"]);
    let error = result.unwrap_err();
    assert!(matches!(error, ScriptError::Harness(_)));
    assert_eq!(error.exit_code(), exit_code::RUN_FAILED);
    let text = harness.session().sink().as_text();
    assert!(text.contains("1 + 1 = 2 - FAIL\n\t\t(expected 3)"));
    assert!(!text.contains("Expressions and shared state"));
}

#[test]
fn throwing_setup_is_a_script_error() {
    let (harness, result) = run(&["uncaught.yaml"]);
    match result.unwrap_err() {
        ScriptError::Uncaught {
            index, expr, thrown, ..
        } => {
            assert_eq!(index, 2);
            assert_eq!(expr, "missingFunction()");
            assert_eq!(thrown, "ReferenceError: missingFunction is not defined");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(harness.session().total(), 0);
}

#[test]
fn unfinished_groups_leave_the_session_active() {
    let (harness, result) = run(&["unfinished.yaml"]);
    result.unwrap();
    assert_eq!(harness.session().state(), SessionState::Active);
    assert_eq!(harness.session().total(), 1);
}

#[test]
fn missing_scripts_are_not_found() {
    let error = Script::load(&fixture("no-such-script.yaml")).unwrap_err();
    assert!(matches!(error, ScriptError::NotFound { .. }));
    assert_eq!(error.exit_code(), exit_code::NOT_FOUND);
}
