//! Tests for capture sessions next to a subscriber capscope does not own
//! Nothing in this binary calls `logging::init`.

mod common;

use capscope::{LogDispatch, Sink, captured_output};
use common::test_util::{foreign_subscriber, lock_global_state, unique_marker};
use tracing::{Level, debug, info_span, warn};

#[test]
fn thread_subscriber_keeps_receiving_events_and_spans() {
    let _guard = lock_global_state();
    let existing = Sink::new();
    let before = unique_marker("before");
    let during = unique_marker("during");
    let detail = unique_marker("detail");
    let spanned = unique_marker("spanned");
    let after = unique_marker("after");

    let subscriber = foreign_subscriber(&existing, Level::DEBUG);
    let log = tracing::subscriber::with_default(subscriber, || {
        warn!("{before}");
        let log = {
            let scope = captured_output();
            warn!("{during}");
            debug!("{detail}");
            let span = info_span!("request", id = 7);
            let _entered = span.enter();
            warn!("{spanned}");
            scope.log().clone()
        };
        warn!("{after}");
        log
    });

    let existing = existing.contents();
    for marker in [&before, &during, &detail, &spanned, &after] {
        assert!(existing.contains(marker.as_str()), "Existing subscriber missed {marker}: {existing:?}");
    }
    assert!(
        existing
            .lines()
            .any(|line| line.contains(&spanned) && line.contains("request{id=7}")),
        "Span context should reach the existing subscriber: {existing:?}"
    );

    let log = log.contents();
    assert_eq!(log.lines().count(), 2, "{log:?}");
    assert!(log.contains(&during) && log.contains(&spanned), "{log:?}");
    assert!(!log.contains(&before) && !log.contains(&after), "{log:?}");
    assert!(!log.contains(&detail), "Debug events are below the capture level: {log:?}");
}

#[test]
fn global_subscriber_keeps_receiving_events() {
    let _guard = lock_global_state();
    let existing = Sink::new();
    tracing::subscriber::set_global_default(foreign_subscriber(&existing, Level::INFO))
        .expect("No other test installs a global subscriber");
    let before = unique_marker("before");
    let during = unique_marker("during");
    let after = unique_marker("after");

    warn!("{before}");
    let log = {
        let scope = captured_output();
        warn!("{during}");
        scope.log().clone()
    };
    warn!("{after}");

    let existing = existing.contents();
    for marker in [&before, &during, &after] {
        assert!(existing.contains(marker.as_str()), "Existing subscriber missed {marker}: {existing:?}");
    }
    assert_eq!(log.contents(), format!("{during}\n"));
    assert!(!LogDispatch::global().is_installed());
}
