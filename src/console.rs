//! Replaceable standard output and standard error
//!
//! Rust's `std::io::stdout()` cannot be swapped at runtime, so output that tests
//! want to observe goes through a [`Console`] instead. A console holds the
//! current stdout and stderr streams; either can be replaced and later restored.
//! Code under test writes through [`Console::global()`], usually via the
//! [`cprint!`](crate::cprint) family of macros, while tests that prefer explicit
//! wiring construct their own console with [`Console::new`].

use crate::sink::Sink;
use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// A destination for console text.
pub trait OutputStream: Send + Sync {
    fn write_bytes(&self, buf: &[u8]) -> io::Result<()>;

    fn flush(&self) -> io::Result<()>;

    /// Whether the stream is attached to an interactive terminal.
    fn is_terminal(&self) -> bool;
}

/// Shared handle to a console stream. Identity is `Arc::ptr_eq`.
pub type SharedStream = Arc<dyn OutputStream>;

/// The real standard output of the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessStdout;

impl OutputStream for ProcessStdout {
    fn write_bytes(&self, buf: &[u8]) -> io::Result<()> {
        io::stdout().lock().write_all(buf)
    }

    fn flush(&self) -> io::Result<()> {
        io::stdout().flush()
    }

    fn is_terminal(&self) -> bool {
        io::stdout().is_terminal()
    }
}

/// The real standard error of the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessStderr;

impl OutputStream for ProcessStderr {
    fn write_bytes(&self, buf: &[u8]) -> io::Result<()> {
        io::stderr().lock().write_all(buf)
    }

    fn flush(&self) -> io::Result<()> {
        io::stderr().flush()
    }

    fn is_terminal(&self) -> bool {
        io::stderr().is_terminal()
    }
}

impl OutputStream for Sink {
    fn write_bytes(&self, buf: &[u8]) -> io::Result<()> {
        self.clone().write_all(buf)
    }

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        Sink::is_terminal(self)
    }
}

struct Streams {
    stdout: SharedStream,
    stderr: SharedStream,
}

/// The current stdout and stderr destinations.
pub struct Console {
    streams: RwLock<Streams>,
}

static GLOBAL_CONSOLE: OnceLock<Console> = OnceLock::new();

impl Console {
    pub fn new(stdout: SharedStream, stderr: SharedStream) -> Self {
        Self {
            streams: RwLock::new(Streams { stdout, stderr }),
        }
    }

    /// A console writing to the real process streams.
    pub fn from_std() -> Self {
        Self::new(Arc::new(ProcessStdout), Arc::new(ProcessStderr))
    }

    /// The process-wide console, created on first use.
    pub fn global() -> &'static Console {
        GLOBAL_CONSOLE.get_or_init(Console::from_std)
    }

    pub fn stdout(&self) -> SharedStream {
        Arc::clone(&self.read().stdout)
    }

    pub fn stderr(&self) -> SharedStream {
        Arc::clone(&self.read().stderr)
    }

    /// Installs a new stdout stream, returning the previous one.
    pub fn set_stdout(&self, stream: SharedStream) -> SharedStream {
        std::mem::replace(&mut self.write().stdout, stream)
    }

    /// Installs a new stderr stream, returning the previous one.
    pub fn set_stderr(&self, stream: SharedStream) -> SharedStream {
        std::mem::replace(&mut self.write().stderr, stream)
    }

    /// Replaces both streams at once and returns the previous `(stdout, stderr)`.
    pub fn replace(
        &self,
        stdout: SharedStream,
        stderr: SharedStream,
    ) -> (SharedStream, SharedStream) {
        let mut streams = self.write();
        let previous_stdout = std::mem::replace(&mut streams.stdout, stdout);
        let previous_stderr = std::mem::replace(&mut streams.stderr, stderr);
        (previous_stdout, previous_stderr)
    }

    /// Writes formatted text to the current stdout. Errors are ignored.
    ///
    /// The stream is cloned out of the lock before writing, so a stream may
    /// itself use the console.
    pub fn print_out(&self, args: fmt::Arguments<'_>) {
        let _ = write_args(&*self.stdout(), args);
    }

    /// Writes formatted text to the current stderr. Errors are ignored.
    pub fn print_err(&self, args: fmt::Arguments<'_>) {
        let _ = write_args(&*self.stderr(), args);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Streams> {
        self.streams.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Streams> {
        self.streams.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::from_std()
    }
}

fn write_args(stream: &dyn OutputStream, args: fmt::Arguments<'_>) -> io::Result<()> {
    match args.as_str() {
        Some(text) => stream.write_bytes(text.as_bytes()),
        None => stream.write_bytes(fmt::format(args).as_bytes()),
    }
}

/// Prints to the global console's stdout.
#[macro_export]
macro_rules! cprint {
    ($($arg:tt)*) => {
        $crate::console::Console::global().print_out(::std::format_args!($($arg)*))
    };
}

/// Prints to the global console's stdout, with a newline.
#[macro_export]
macro_rules! cprintln {
    () => {
        $crate::cprint!("\n")
    };
    ($($arg:tt)*) => {
        $crate::console::Console::global()
            .print_out(::std::format_args!("{}\n", ::std::format_args!($($arg)*)))
    };
}

/// Prints to the global console's stderr.
#[macro_export]
macro_rules! ceprint {
    ($($arg:tt)*) => {
        $crate::console::Console::global().print_err(::std::format_args!($($arg)*))
    };
}

/// Prints to the global console's stderr, with a newline.
#[macro_export]
macro_rules! ceprintln {
    () => {
        $crate::ceprint!("\n")
    };
    ($($arg:tt)*) => {
        $crate::console::Console::global()
            .print_err(::std::format_args!("{}\n", ::std::format_args!($($arg)*)))
    };
}
