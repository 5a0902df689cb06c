//! In-memory text sinks

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A cloneable handle to a shared in-memory buffer.
///
/// Clones write into and read from the same buffer. A sink outlives any capture
/// session it was created for, so its contents can be inspected afterwards.
#[derive(Clone, Default)]
pub struct Sink {
    buffer: Arc<Mutex<Vec<u8>>>,
    terminal: bool,
}

impl Sink {
    /// Creates an empty sink that does not report itself as a terminal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty sink that reports itself as an interactive terminal.
    pub fn terminal() -> Self {
        Self {
            buffer: Arc::default(),
            terminal: true,
        }
    }

    /// Whether code writing to this sink should treat it as a terminal.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Appends text to the buffer.
    pub fn write_str(&self, text: &str) {
        self.lock().extend_from_slice(text.as_bytes());
    }

    /// Everything written so far, decoded lossily as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Returns true if both handles refer to the same buffer.
    pub fn ptr_eq(&self, other: &Sink) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("len", &self.len())
            .field("terminal", &self.terminal)
            .finish()
    }
}
