//! capscope - Scoped capture of stdout, stderr and log output
//!
//! Code under test prints through the process-wide [`Console`] (see [`cprint!`])
//! and logs through `tracing`. Inside a [`CaptureScope`] both end up in
//! in-memory [`Sink`]s that a test can read back, and the previous state is
//! restored when the scope is dropped.

pub mod capture;
pub mod cli;
pub mod config;
pub mod console;
pub mod logging;
pub mod selftest;
pub mod sink;

pub use capture::{CaptureScope, CapturedOutput, captured_output, with_captured_output};
pub use config::{LogConfig, LogFormat};
pub use console::{Console, OutputStream, SharedStream};
pub use logging::{LogDispatch, LoggingError};
pub use sink::Sink;
