use anyhow::{Result, anyhow};
use capscope::cli::{Cli, Commands};
use capscope::config::LogConfig;
use capscope::{captured_output, ceprint, ceprintln, cprint, cprintln, logging, selftest};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = LogConfig {
        level: cli.log_level,
        format: cli.log_format,
        stderr: !cli.quiet,
        ..LogConfig::default()
    };
    if let Err(e) = logging::init(&config) {
        ceprintln!("{e}");
        return ExitCode::from(2);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Selftest { check, list } => {
            if list {
                for check in selftest::CHECKS {
                    cprintln!("{}", check.name);
                }
                return Ok(());
            }

            if let Some(name) = check
                .as_deref()
                .filter(|name| selftest::find(name).is_none())
            {
                return Err(anyhow!("Unknown check '{name}'"));
            }

            let outcomes = selftest::run_checks(check.as_deref());
            let mut failed = 0;
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(()) => cprintln!("ok      {}", outcome.name),
                    Err(e) => {
                        failed += 1;
                        cprintln!("FAILED  {}: {e}", outcome.name);
                    }
                }
            }

            info!("{} checks run, {} failed", outcomes.len(), failed);
            if failed > 0 {
                return Err(anyhow!("{failed} of {} checks failed", outcomes.len()));
            }
        }
        Commands::Demo { message } => {
            let (out, err, log) = {
                let scope = captured_output();
                cprint!("{message}");
                ceprint!("{message}");
                warn!("{message}");
                scope.buffers()
            };

            cprintln!("stdout (terminal: {}): {:?}", out.is_terminal(), out.contents());
            cprintln!("stderr: {:?}", err.contents());
            cprintln!("log: {:?}", log.contents());
        }
    }

    Ok(())
}
