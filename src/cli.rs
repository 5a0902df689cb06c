use crate::config::LogFormat;
use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "capscope",
    version,
    about = "Capture stdout, stderr and log output inside a scope, and check that it is restored afterwards."
)]
pub struct Cli {
    /// Minimum level of log events; RUST_LOG directives take precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: Level,

    /// How log events are rendered
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Full)]
    pub log_format: LogFormat,

    /// Do not write log events to stderr
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the built-in checks of the capture contract
    #[command(visible_alias = "check")]
    Selftest {
        /// Run a single check by name
        #[arg(short, long)]
        check: Option<String>,

        /// List the check names and exit
        #[arg(short, long, conflicts_with = "check")]
        list: bool,
    },

    /// Write a message to stdout, stderr and the log inside a capture, then show what was captured
    Demo {
        /// Message to write
        message: String,
    },
}
