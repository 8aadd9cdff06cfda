//! Conform Error Handling
//!
//! Two families of errors exist. A failed assertion is never an error: it is
//! recorded in the session and printed. What does surface as an error is
//! either the fatal end-of-group signal ([`HarnessError`]) or a problem with a
//! conformance script itself ([`ScriptError`]). Both render through miette.

use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::config::exit_code;

/// Raised by `finish()` when the group being closed saw at least one failure.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("{failures} of {total} sub-tests failed (last group: '{group}')")]
    #[diagnostic(
        code(conform::run_failed),
        help("the FAIL lines in the report show each failing expression and what it was expected to produce")
    )]
    RunFailed {
        group: String,
        failures: usize,
        total: usize,
    },
}

/// Problems loading or driving a conformance script.
#[derive(Debug, Error, Diagnostic)]
pub enum ScriptError {
    #[error("script '{path}' not found")]
    #[diagnostic(code(conform::script::not_found))]
    NotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read script '{path}'")]
    #[diagnostic(code(conform::script::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed script: {message}")]
    #[diagnostic(code(conform::script::syntax))]
    Syntax {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("step {index} of '{script}': {reason}")]
    #[diagnostic(
        code(conform::script::invalid_step),
        help("a step holds exactly one of describe, eval, test or finish; a test holds exactly one of expect, throws, any_exception or no_exception")
    )]
    InvalidStep {
        script: String,
        index: usize,
        reason: String,
    },

    #[error("step {index} of '{script}': `{expr}` threw {thrown}")]
    #[diagnostic(
        code(conform::script::uncaught),
        help("set-up snippets and expected values must evaluate without throwing")
    )]
    Uncaught {
        script: String,
        index: usize,
        expr: String,
        thrown: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Harness(#[from] HarnessError),
}

impl ScriptError {
    pub(crate) fn from_io(path: &Path, source: std::io::Error) -> Self {
        let path = path.display().to_string();
        if source.kind() == std::io::ErrorKind::NotFound {
            ScriptError::NotFound { path, source }
        } else {
            ScriptError::Io { path, source }
        }
    }

    /// The process exit status a host should report for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ScriptError::NotFound { .. } => exit_code::NOT_FOUND,
            _ => exit_code::RUN_FAILED,
        }
    }
}

/// Prints an error with full miette diagnostics on stderr.
pub fn print_error<E>(error: E)
where
    E: Diagnostic + Send + Sync + 'static,
{
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}
