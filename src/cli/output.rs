//! Everything the CLI prints besides the report itself.
//!
//! The report goes to stdout through the session's sink. The closing summary
//! and uncaught throws from `eval` go to stderr so stdout stays exactly the
//! report.

use std::io::Write;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::literal::literal;
use crate::session::Summary;
use crate::value::Value;

/// Prints the run-wide tally after the last script.
pub fn print_summary(summary: &Summary, scripts: usize, choice: ColorChoice) {
    let mut stderr = StandardStream::stderr(choice);
    let color = if summary.failed == 0 { Color::Green } else { Color::Red };
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(
        stderr,
        "{} of {} sub-tests passed",
        summary.passed, summary.total
    );
    let _ = stderr.reset();
    let plural = if scripts == 1 { "" } else { "s" };
    let _ = writeln!(stderr, " ({scripts} script{plural})");
}

/// Prints the result of `conform eval`.
pub fn print_value(value: &Value) {
    println!("{}", literal(value));
}

/// Prints a value that `conform eval` threw and nothing caught.
pub fn print_uncaught(thrown: &Value, choice: ColorChoice) {
    let mut stderr = StandardStream::stderr(choice);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    let _ = write!(stderr, "uncaught exception:");
    let _ = stderr.reset();
    let _ = writeln!(stderr, " throw {}", literal(thrown));
}
