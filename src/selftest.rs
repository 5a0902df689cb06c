//! Built-in checks of the capture contract
//!
//! Each check drives the global console and logger the way a test would and
//! reports the first violated expectation. The `capscope selftest` command runs
//! them in process.

use crate::capture::{captured_output, with_captured_output};
use crate::console::Console;
use crate::sink::Sink;
use crate::{ceprint, cprint};
use anyhow::{Result, ensure};
use std::panic;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// A named check.
pub struct Check {
    pub name: &'static str,
    run: fn() -> Result<()>,
}

impl Check {
    pub fn run(&self) -> Result<()> {
        (self.run)()
    }
}

/// The result of running one check.
pub struct CheckOutcome {
    pub name: &'static str,
    pub result: Result<()>,
}

pub const CHECKS: &[Check] = &[
    Check {
        name: "stdout_isolation",
        run: stdout_isolation,
    },
    Check {
        name: "stderr_isolation",
        run: stderr_isolation,
    },
    Check {
        name: "log_capture",
        run: log_capture,
    },
    Check {
        name: "log_detachment",
        run: log_detachment,
    },
    Check {
        name: "terminal_flag",
        run: terminal_flag,
    },
    Check {
        name: "restoration",
        run: restoration,
    },
    Check {
        name: "reassignment_undone",
        run: reassignment_undone,
    },
    Check {
        name: "error_propagation",
        run: error_propagation,
    },
    Check {
        name: "panic_safety",
        run: panic_safety,
    },
    Check {
        name: "nested_sessions",
        run: nested_sessions,
    },
];

pub fn find(name: &str) -> Option<&'static Check> {
    CHECKS.iter().find(|check| check.name == name)
}

/// Runs every check, or only `only` when given.
pub fn run_checks(only: Option<&str>) -> Vec<CheckOutcome> {
    CHECKS
        .iter()
        .filter(|check| only.is_none_or(|name| check.name == name))
        .map(|check| CheckOutcome {
            name: check.name,
            result: check.run(),
        })
        .collect()
}

fn marker(label: &str) -> String {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    format!(
        "{label}-{}-{}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    )
}

fn stdout_isolation() -> Result<()> {
    let text = marker("stdout");
    let (out, err, log) = {
        let scope = captured_output();
        cprint!("{text}");
        scope.buffers()
    };

    ensure!(out.contents() == text, "stdout buffer holds {:?}", out.contents());
    ensure!(!err.contents().contains(&text), "stdout text leaked into stderr buffer");
    ensure!(!log.contents().contains(&text), "stdout text leaked into log buffer");
    Ok(())
}

fn stderr_isolation() -> Result<()> {
    let text = marker("stderr");
    let (out, err, log) = {
        let scope = captured_output();
        ceprint!("{text}");
        scope.buffers()
    };

    ensure!(err.contents() == text, "stderr buffer holds {:?}", err.contents());
    ensure!(out.is_empty(), "stderr text leaked into stdout buffer");
    ensure!(!log.contents().contains(&text), "stderr text leaked into log buffer");
    Ok(())
}

fn log_capture() -> Result<()> {
    let text = marker("warn");
    let (out, err, log) = {
        let scope = captured_output();
        warn!("warn: {text}");
        scope.buffers()
    };

    ensure!(
        log.contents().contains(&format!("warn: {text}")),
        "log buffer holds {:?}",
        log.contents()
    );
    ensure!(log.contents().ends_with('\n'), "log line was not terminated");
    ensure!(out.is_empty() && err.is_empty(), "log line leaked into console buffers");
    Ok(())
}

fn log_detachment() -> Result<()> {
    let during = marker("during");
    let after = marker("after");
    let log = {
        let scope = captured_output();
        warn!("{during}");
        scope.log().clone()
    };
    warn!("{after}");

    ensure!(log.contents().contains(&during), "log buffer missed {during}");
    ensure!(!log.contents().contains(&after), "log buffer received {after} after the session");
    Ok(())
}

fn terminal_flag() -> Result<()> {
    let scope = captured_output();
    let console = Console::global();

    ensure!(scope.stdout().is_terminal(), "stdout buffer is not a terminal");
    ensure!(console.stdout().is_terminal(), "captured stdout is not a terminal");
    cprint!("output does not change the flag");
    ensure!(console.stdout().is_terminal(), "captured stdout stopped being a terminal");
    ensure!(!console.stderr().is_terminal(), "captured stderr claims to be a terminal");
    Ok(())
}

fn restoration() -> Result<()> {
    let console = Console::global();
    let (before_out, before_err) = (console.stdout(), console.stderr());
    {
        let _scope = captured_output();
        ensure!(!Arc::ptr_eq(&before_out, &console.stdout()), "stdout was not replaced");
        ensure!(!Arc::ptr_eq(&before_err, &console.stderr()), "stderr was not replaced");
    }

    ensure!(Arc::ptr_eq(&before_out, &console.stdout()), "stdout was not restored");
    ensure!(Arc::ptr_eq(&before_err, &console.stderr()), "stderr was not restored");
    Ok(())
}

fn reassignment_undone() -> Result<()> {
    let console = Console::global();
    let (before_out, before_err) = (console.stdout(), console.stderr());
    {
        let _scope = captured_output();
        console.set_stdout(Arc::new(Sink::new()));
        console.set_stderr(Arc::new(Sink::new()));
    }

    ensure!(Arc::ptr_eq(&before_out, &console.stdout()), "reassigned stdout survived the session");
    ensure!(Arc::ptr_eq(&before_err, &console.stderr()), "reassigned stderr survived the session");
    Ok(())
}

fn error_propagation() -> Result<()> {
    let console = Console::global();
    let before = console.stdout();
    let text = marker("failure");

    let result: Result<(), String> = with_captured_output(|_| Err(text.clone()));

    ensure!(result == Err(text), "error did not propagate unchanged: {result:?}");
    ensure!(Arc::ptr_eq(&before, &console.stdout()), "stdout was not restored after an error");
    Ok(())
}

fn fail_inside_capture() -> usize {
    let scope = captured_output();
    cprint!("about to fail");
    panic!("failure inside capture after {} bytes", scope.stdout().len());
}

fn panic_safety() -> Result<()> {
    let console = Console::global();
    let (before_out, before_err) = (console.stdout(), console.stderr());
    let log = marker("after-panic");

    let hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let result = panic::catch_unwind(fail_inside_capture);
    panic::set_hook(hook);

    ensure!(result.is_err(), "panic did not propagate");
    ensure!(Arc::ptr_eq(&before_out, &console.stdout()), "stdout was not restored after a panic");
    ensure!(Arc::ptr_eq(&before_err, &console.stderr()), "stderr was not restored after a panic");

    let scope = captured_output();
    warn!("{log}");
    ensure!(scope.log().contents().contains(&log), "logging broke after a panic");
    Ok(())
}

fn nested_sessions() -> Result<()> {
    let console = Console::global();
    let before = console.stdout();

    let outer = captured_output();
    cprint!("outer-1 ");
    {
        let inner = captured_output();
        cprint!("inner");
        ensure!(
            inner.stdout().contents() == "inner",
            "inner session saw {:?}",
            inner.stdout().contents()
        );
    }
    cprint!("outer-2");
    ensure!(
        outer.stdout().contents() == "outer-1 outer-2",
        "outer session saw {:?}",
        outer.stdout().contents()
    );

    drop(outer);
    ensure!(Arc::ptr_eq(&before, &console.stdout()), "nested sessions did not unwind");
    Ok(())
}
