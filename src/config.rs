//! Configuration for a harness run.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use crate::session::ConsoleSink;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "CONFORM_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

/// Process exit statuses, matching what the engine's shell reports.
pub mod exit_code {
    pub const SUCCESS: u8 = 0;
    /// An uncaught exception: a failed group or a broken script.
    pub const RUN_FAILED: u8 = 3;
    pub const NOT_FOUND: u8 = 4;
}

/// When report lines get PASS/FAIL highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    /// Highlight when stdout is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn use_colors(self) -> bool {
        match self {
            ColorMode::Auto => atty::is(atty::Stream::Stdout),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }

    pub fn color_choice(self) -> termcolor::ColorChoice {
        if self.use_colors() {
            termcolor::ColorChoice::Always
        } else {
            termcolor::ColorChoice::Never
        }
    }
}

/// Settings shared by the CLI host and embedders.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub color: ColorMode,
    pub log_filter: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            color: ColorMode::default(),
            log_filter: std::env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}

impl HarnessConfig {
    pub fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    /// A stdout sink whose interactivity follows the colour mode.
    pub fn console_sink(&self) -> ConsoleSink {
        ConsoleSink::new(self.color.use_colors())
    }

    /// Installs the stderr log subscriber. Calling it twice is harmless.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_new(&self.log_filter)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_modes_ignore_the_terminal() {
        assert!(ColorMode::Always.use_colors());
        assert!(!ColorMode::Never.use_colors());
        let config = HarnessConfig::default().with_color(ColorMode::Never);
        assert!(!crate::session::ReportSink::is_interactive(&config.console_sink()));
    }
}
