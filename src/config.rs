use clap::ValueEnum;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// How log events are rendered before reaching any destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// The message and its fields only.
    Raw,
    /// Level, target and message on one line, without timestamps.
    Compact,
    /// Timestamp, level and message.
    #[default]
    Full,
}

/// Configuration for the process-wide logger
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Events at this level and above are always kept. `RUST_LOG` can only add
    /// directives for other targets on top of it.
    pub level: Level,

    pub format: LogFormat,

    /// Whether `RUST_LOG` directives are honored.
    pub use_env: bool,

    /// Whether the real stderr is attached as the first log destination.
    pub stderr: bool,
}

impl LogConfig {
    /// Config used when a capture session starts and no logger was initialized.
    /// Like an unconfigured root logger, it passes warnings and errors.
    pub fn fallback() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Raw,
            use_env: false,
            stderr: false,
        }
    }

    pub fn filter(&self) -> EnvFilter {
        let filter = if self.use_env {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::default()
        };
        filter.add_directive(LevelFilter::from_level(self.level).into())
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Full,
            use_env: true,
            stderr: true,
        }
    }
}
