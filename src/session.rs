//! Session state and the report stream.
//!
//! A [`Session`] owns the run-wide counters and writes every banner, verdict
//! and summary line to a [`ReportSink`]. Counters are cumulative: `describe`
//! starts a new group in the report but never resets them, so a process that
//! runs several groups reports a running tally at each `finish`.

use tracing::{info, warn};

use crate::errors::HarnessError;
use crate::runner::CaseReport;

/// Separator line framing each group.
pub const RULE: &str = "===============================";

// Escape sequences for verdict highlighting.
const RESET: &str = "\x1b[m";
const GREEN: &str = "\x1b[32m";
const RED_REVERSE: &str = "\x1b[31;7m";

/// Where report lines go.
pub trait ReportSink {
    fn emit(&mut self, text: &str);

    /// Interactive sinks get highlighted verdicts.
    fn is_interactive(&self) -> bool;
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn emit(&mut self, text: &str) {
        (**self).emit(text)
    }

    fn is_interactive(&self) -> bool {
        (**self).is_interactive()
    }
}

/// ConsoleSink: writes report lines to stdout.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    interactive: bool,
}

impl ConsoleSink {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

impl ReportSink for ConsoleSink {
    fn emit(&mut self, text: &str) {
        println!("{text}");
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

/// BufferSink: collects report lines for tests or programmatic capture.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    pub lines: Vec<String>,
    pub interactive: bool,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interactive() -> Self {
        Self {
            lines: Vec::new(),
            interactive: true,
        }
    }

    pub fn as_text(&self) -> String {
        self.lines.join("\n")
    }
}

impl ReportSink for BufferSink {
    fn emit(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    Finished,
}

/// Counts at the moment a group was finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

pub struct Session<S: ReportSink> {
    sink: S,
    total: usize,
    failures: usize,
    current_name: Option<String>,
    state: SessionState,
}

impl<S: ReportSink> Session<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            total: 0,
            failures: 0,
            current_name: None,
            state: SessionState::Idle,
        }
    }

    /// Opens a group. Counters carry over from earlier groups.
    pub fn describe(&mut self, name: &str) {
        if self.state == SessionState::Active {
            warn!(
                previous = self.current_name.as_deref().unwrap_or_default(),
                next = name,
                "describe called before finish; counts keep accumulating"
            );
        }
        info!(group = name, "group started");
        self.current_name = Some(name.to_string());
        self.state = SessionState::Active;
        self.sink.emit("");
        self.sink.emit(RULE);
        self.sink.emit(&format!("Test: {name}"));
        self.sink.emit("");
    }

    /// Counts a case and prints its verdict line. Returns whether it passed.
    pub fn record(&mut self, report: &CaseReport) -> bool {
        if self.state != SessionState::Active {
            warn!(source = %report.source, "test recorded outside a described group");
        }
        self.total += 1;
        let line = if report.passed {
            format!("{} - {}", report.message(), self.colorize("PASS", GREEN))
        } else {
            self.failures += 1;
            format!(
                "{} - {}\n\t\t(expected {})",
                report.message(),
                self.colorize("FAIL", RED_REVERSE),
                report.expected
            )
        };
        self.sink.emit(&line);
        report.passed
    }

    /// Closes the group and prints the running tally. Any failure so far is
    /// fatal: the caller gets `HarnessError::RunFailed` and should stop.
    pub fn finish(&mut self) -> Result<Summary, HarnessError> {
        if self.state != SessionState::Active {
            warn!(state = ?self.state, "finish called without an open group");
        }
        let name = self.current_name.clone().unwrap_or_default();
        let summary = self.summary();
        self.sink.emit("");
        self.sink.emit(&format!("End: {name}"));
        self.sink.emit(&format!(
            "     {} of {} sub-tests passed",
            summary.passed, summary.total
        ));
        self.sink.emit(RULE);
        self.state = SessionState::Finished;
        info!(group = %name, passed = summary.passed, total = summary.total, "group finished");

        if summary.failed > 0 {
            return Err(HarnessError::RunFailed {
                group: name,
                failures: summary.failed,
                total: summary.total,
            });
        }
        Ok(summary)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            passed: self.total - self.failures,
            failed: self.failures,
            total: self.total,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current_name.as_deref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.sink.is_interactive() {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}
