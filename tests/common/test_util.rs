//! Test utilities for capscope tests

use capscope::config::{LogConfig, LogFormat};
use capscope::{Sink, logging};
use std::sync::{Mutex, MutexGuard, Once, PoisonError};
use tracing::{Level, Subscriber};

static GLOBAL_STATE: Mutex<()> = Mutex::new(());
static INIT_LOGGING: Once = Once::new();

/// Serializes tests that touch the global console or logger.
///
/// A test that panics while holding the guard must not fail the rest.
pub fn lock_global_state() -> MutexGuard<'static, ()> {
    GLOBAL_STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Installs the global logger once per test binary, without a stderr destination.
pub fn init_logging(format: LogFormat) {
    INIT_LOGGING.call_once(|| {
        let config = LogConfig {
            level: Level::TRACE,
            format,
            use_env: false,
            stderr: false,
        };
        logging::init(&config).expect("Failed to install global logger");
    });
}

/// A marker that cannot collide with output from other tests.
pub fn unique_marker(label: &str) -> String {
    format!("{label}-{}", uuid::Uuid::new_v4())
}

/// A plain fmt subscriber that knows nothing about capscope, writing to `sink`.
pub fn foreign_subscriber(sink: &Sink, level: Level) -> impl Subscriber + Send + Sync + 'static {
    let sink = sink.clone();
    tracing_subscriber::fmt()
        .with_writer(move || sink.clone())
        .with_max_level(level)
        .with_ansi(false)
        .without_time()
        .finish()
}
