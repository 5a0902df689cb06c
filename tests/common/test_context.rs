//! Test context wiring an isolated console and logger

use capscope::config::{LogConfig, LogFormat};
use capscope::{CaptureScope, Console, LogDispatch, Sink};
use std::sync::Arc;
use tracing::Dispatch;

/// A console and logger that no other test can see.
///
/// The console starts out writing to two plain sinks standing in for the real
/// process streams, and `dispatcher` renders events into `logger`.
pub struct TestContext {
    pub console: Console,
    pub logger: LogDispatch,
    pub dispatcher: Dispatch,
    pub real_stdout: Sink,
    pub real_stderr: Sink,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_format(LogFormat::Raw)
    }

    pub fn with_format(format: LogFormat) -> Self {
        let real_stdout = Sink::new();
        let real_stderr = Sink::new();
        let console = Console::new(Arc::new(real_stdout.clone()), Arc::new(real_stderr.clone()));
        let logger = LogDispatch::new();
        let config = LogConfig {
            format,
            use_env: false,
            ..LogConfig::default()
        };
        let dispatcher = logger.dispatch(config.format, config.filter());

        Self {
            console,
            logger,
            dispatcher,
            real_stdout,
            real_stderr,
        }
    }

    pub fn capture(&self) -> CaptureScope<'_> {
        CaptureScope::enter(&self.console, &self.logger)
    }

    /// Runs `f` with this context's logger as the thread's default subscriber.
    pub fn logging<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatcher, f)
    }

    pub fn print_out(&self, text: &str) {
        self.console.print_out(format_args!("{text}"));
    }

    pub fn print_err(&self, text: &str) {
        self.console.print_err(format_args!("{text}"));
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
