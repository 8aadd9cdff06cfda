//! The `conform` command-line host.
//!
//! Plays the part of the engine's shell: one engine and one session for the
//! whole invocation, report lines on stdout, and a fatal group failure or a
//! broken script turned into a non-zero exit status.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::warn;

use crate::cli::args::{Command, ConformArgs};
use crate::config::{exit_code, HarnessConfig};
use crate::engine::Engine;
use crate::errors::print_error;
use crate::harness::Harness;
use crate::runner::{Evaluator, Outcome};
use crate::script::Script;
use crate::session::SessionState;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() -> ExitCode {
    let args = ConformArgs::parse();
    match args.command {
        Command::Run { scripts, color } => {
            run_scripts(&scripts, &HarnessConfig::default().with_color(color))
        }
        Command::Eval { source } => eval_source(&source, &HarnessConfig::default()),
    }
}

/// Runs every script against the same engine and session. Stops at the first
/// script error or failed `finish`.
fn run_scripts(paths: &[PathBuf], config: &HarnessConfig) -> ExitCode {
    config.init_logging();
    let mut harness = Harness::new(Engine::new(), config.console_sink());

    for path in paths {
        let result = Script::load(path).and_then(|script| script.run(&mut harness));
        if let Err(error) = result {
            let code = error.exit_code();
            print_error(error);
            return ExitCode::from(code);
        }
    }

    let session = harness.session();
    if session.state() == SessionState::Active {
        warn!(
            group = session.current_name().unwrap_or_default(),
            "last group was never finished"
        );
    }
    let summary = session.summary();
    output::print_summary(&summary, paths.len(), config.color.color_choice());
    if summary.failed > 0 {
        ExitCode::from(exit_code::RUN_FAILED)
    } else {
        ExitCode::from(exit_code::SUCCESS)
    }
}

fn eval_source(source: &str, config: &HarnessConfig) -> ExitCode {
    config.init_logging();
    match Engine::new().evaluate(source) {
        Outcome::Completed(value) => {
            output::print_value(&value);
            ExitCode::from(exit_code::SUCCESS)
        }
        Outcome::Threw(thrown) => {
            output::print_uncaught(&thrown, config.color.color_choice());
            ExitCode::from(exit_code::RUN_FAILED)
        }
    }
}
