//! Scoped capture of stdout, stderr and log output
//!
//! A [`CaptureScope`] swaps the console's stdout and stderr for fresh in-memory
//! sinks and attaches a third sink to the log dispatch. Dropping the scope puts
//! the saved streams back and detaches the log sink, on every exit path
//! including panics.
//!
//! ```
//! use capscope::{captured_output, cprint};
//!
//! let output = {
//!     let scope = captured_output();
//!     cprint!("hello");
//!     scope.output().clone()
//! };
//! assert_eq!(output.stdout.contents(), "hello");
//! ```

use crate::config::LogConfig;
use crate::console::{Console, SharedStream};
use crate::logging::{DestinationId, LogDispatch};
use crate::sink::Sink;
use std::sync::Arc;
use tracing::Dispatch;
use tracing::dispatcher::DefaultGuard;
use tracing::subscriber::NoSubscriber;

/// The three buffers of one capture session.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    /// Everything written to stdout. Reports itself as a terminal.
    pub stdout: Sink,
    /// Everything written to stderr.
    pub stderr: Sink,
    /// Rendered log lines.
    pub log: Sink,
}

impl CapturedOutput {
    fn new() -> Self {
        Self {
            stdout: Sink::terminal(),
            stderr: Sink::new(),
            log: Sink::new(),
        }
    }
}

/// An active capture session. Restores the previous state when dropped.
#[must_use = "output is only captured while the scope is alive"]
pub struct CaptureScope<'a> {
    console: &'a Console,
    logger: &'a LogDispatch,
    saved_stdout: SharedStream,
    saved_stderr: SharedStream,
    destination: DestinationId,
    output: CapturedOutput,
    fallback: Option<DefaultGuard>,
}

impl<'a> CaptureScope<'a> {
    /// Starts capturing the streams of `console` and the events rendered by
    /// `logger`.
    pub fn enter(console: &'a Console, logger: &'a LogDispatch) -> Self {
        let output = CapturedOutput::new();
        let destination = logger.add_destination(output.log.clone());
        let (saved_stdout, saved_stderr) = console.replace(
            Arc::new(output.stdout.clone()),
            Arc::new(output.stderr.clone()),
        );

        Self {
            console,
            logger,
            saved_stdout,
            saved_stderr,
            destination,
            output,
            fallback: None,
        }
    }

    pub fn stdout(&self) -> &Sink {
        &self.output.stdout
    }

    pub fn stderr(&self) -> &Sink {
        &self.output.stderr
    }

    pub fn log(&self) -> &Sink {
        &self.output.log
    }

    pub fn output(&self) -> &CapturedOutput {
        &self.output
    }

    /// Handles to `(stdout, stderr, log)` that stay readable after the scope ends.
    pub fn buffers(&self) -> (Sink, Sink, Sink) {
        (
            self.output.stdout.clone(),
            self.output.stderr.clone(),
            self.output.log.clone(),
        )
    }
}

impl Drop for CaptureScope<'_> {
    fn drop(&mut self) {
        // Whatever the enclosed code installed is discarded.
        self.console.replace(
            Arc::clone(&self.saved_stdout),
            Arc::clone(&self.saved_stderr),
        );
        self.logger.remove_destination(self.destination);
    }
}

/// Captures output of the global console and logger.
///
/// If the subscriber of the current thread does not render to the global
/// logger, usually because [`logging::init`](crate::logging::init) was never
/// called, log events on this thread are rendered as raw messages for the
/// duration of the session. A subscriber that was already active keeps
/// receiving every event it is interested in.
pub fn captured_output() -> CaptureScope<'static> {
    let logger = LogDispatch::global();
    let mut scope = CaptureScope::enter(Console::global(), logger);

    let current = tracing::dispatcher::get_default(Dispatch::clone);
    if !logger.receives_from(&current) {
        let config = LogConfig::fallback();
        let dispatch = if current.is::<NoSubscriber>() {
            logger.dispatch(config.format, config.filter())
        } else {
            logger.dispatch_alongside(config.format, config.filter(), current)
        };
        scope.fallback = Some(tracing::dispatcher::set_default(&dispatch));
    }

    scope
}

/// Runs `f` inside a capture session and returns its result unchanged.
///
/// The session ends before the result, or a panic, reaches the caller.
pub fn with_captured_output<R, F>(f: F) -> R
where
    F: FnOnce(&CapturedOutput) -> R,
{
    let scope = captured_output();
    f(scope.output())
}
