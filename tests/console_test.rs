//! Tests for Console stream replacement and in-memory sinks, using isolated instances

mod common;

use capscope::{Console, OutputStream, SharedStream, Sink};
use common::test_context::TestContext;
use std::io::Write;
use std::sync::Arc;

#[test]
fn replace_returns_previous_streams() {
    let first_out: SharedStream = Arc::new(Sink::new());
    let first_err: SharedStream = Arc::new(Sink::new());
    let console = Console::new(Arc::clone(&first_out), Arc::clone(&first_err));

    let (previous_out, previous_err) =
        console.replace(Arc::new(Sink::terminal()), Arc::new(Sink::new()));

    assert!(Arc::ptr_eq(&previous_out, &first_out));
    assert!(Arc::ptr_eq(&previous_err, &first_err));
    assert!(console.stdout().is_terminal());
}

#[test]
fn set_stdout_and_stderr_return_previous() {
    let ctx = TestContext::new();
    let replacement = Sink::new();

    let previous = ctx.console.set_stdout(Arc::new(replacement.clone()));
    ctx.print_out("to replacement");
    ctx.console.set_stdout(previous);
    ctx.print_out("to original");

    assert_eq!(replacement.contents(), "to replacement");
    assert_eq!(ctx.real_stdout.contents(), "to original");

    let previous = ctx.console.set_stderr(Arc::new(replacement.clone()));
    ctx.print_err(" and stderr");
    ctx.console.set_stderr(previous);

    assert_eq!(replacement.contents(), "to replacement and stderr");
    assert!(ctx.real_stderr.is_empty());
}

#[test]
fn capture_swaps_and_restores_injected_console() {
    let ctx = TestContext::new();
    ctx.print_out("before ");

    let (out, err) = {
        let scope = ctx.capture();
        ctx.print_out("inside");
        ctx.print_err("inside err");
        (scope.stdout().clone(), scope.stderr().clone())
    };
    ctx.print_out("after");

    assert_eq!(out.contents(), "inside");
    assert_eq!(err.contents(), "inside err");
    assert_eq!(ctx.real_stdout.contents(), "before after");
    assert!(ctx.real_stderr.is_empty());
}

#[test]
fn injected_capture_reports_terminal_on_stdout_only() {
    let ctx = TestContext::new();

    let _scope = ctx.capture();

    assert!(ctx.console.stdout().is_terminal());
    assert!(!ctx.console.stderr().is_terminal());
}

#[test]
fn print_out_formats_arguments() {
    let ctx = TestContext::new();

    ctx.console.print_out(format_args!("{}-{:03}", "id", 7));

    assert_eq!(ctx.real_stdout.contents(), "id-007");
}

#[test]
fn sink_clones_share_contents() {
    let sink = Sink::new();
    let mut clone = sink.clone();

    clone.write_all(b"bytes ").unwrap();
    sink.write_str("and text");
    OutputStream::write_bytes(&sink, b"!").unwrap();

    assert!(sink.ptr_eq(&clone));
    assert_eq!(clone.contents(), "bytes and text!");
    assert_eq!(sink.len(), "bytes and text!".len());
}

#[test]
fn sink_clear_and_identity() {
    let sink = Sink::terminal();
    sink.write_str("something");
    sink.clear();

    assert!(sink.is_empty());
    assert!(sink.is_terminal());
    assert!(!sink.ptr_eq(&Sink::terminal()));
}

#[test]
fn sink_decodes_invalid_utf8_lossily() {
    let mut sink = Sink::new();
    sink.write_all(&[b'o', b'k', 0xff]).unwrap();

    assert_eq!(sink.contents(), "ok\u{fffd}");
}
