//! Conform: an assertion and reporting harness for conformance-testing
//! ECMAScript engines, with a small reference engine to run it against.

pub use crate::config::{ColorMode, HarnessConfig};
pub use crate::engine::Engine;
pub use crate::errors::{HarnessError, ScriptError};
pub use crate::expect::{ExceptionSpec, Expectation, ANY_EXCEPTION, NO_EXCEPTION};
pub use crate::harness::Harness;
pub use crate::literal::{literal, Literalize};
pub use crate::runner::{run_case, CaseReport, Evaluator, Outcome};
pub use crate::script::Script;
pub use crate::session::{BufferSink, ConsoleSink, ReportSink, Session, SessionState, Summary};
pub use crate::value::{ErrorKind, ObjectRef, Value};

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod expect;
pub mod harness;
pub mod literal;
pub mod runner;
pub mod script;
pub mod session;
pub mod value;
