//! Command-line arguments for the `conform` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ColorMode;

#[derive(Debug, Parser)]
#[command(
    name = "conform",
    version,
    about = "Runs conformance scripts against the reference ECMAScript engine."
)]
pub struct ConformArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run conformance scripts in order against one shared engine and session.
    Run {
        /// Script files, run in the order given.
        #[arg(required = true)]
        scripts: Vec<PathBuf>,
        /// Highlight PASS/FAIL verdicts.
        #[arg(long, value_enum, default_value = "auto")]
        color: ColorMode,
    },
    /// Evaluate one snippet and print the literal of its result.
    Eval {
        /// Source text of the snippet.
        source: String,
    },
}
