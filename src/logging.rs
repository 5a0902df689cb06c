//! Process-wide log fan-out
//!
//! Log events are rendered once by a `tracing-subscriber` fmt layer and the
//! rendered line is written to every destination attached to a [`LogDispatch`].
//! Destinations can be attached and detached while the subscriber is live, which
//! is what lets a capture session add its own buffer next to the real stderr.
//!
//! A subscriber that is not backed by a [`LogDispatch`] cannot take extra
//! destinations. [`LogDispatch::dispatch_alongside`] builds a subscriber that
//! renders to the dispatch and replays every event and span to that one.

use crate::config::{LogConfig, LogFormat};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use thiserror::Error;
use tracing::span::{Attributes, Id, Record};
use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::{Context, Layered, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, Registry};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("A global tracing subscriber is already installed: {0}")]
    AlreadyInitialized(#[from] tracing::dispatcher::SetGlobalDefaultError),
}

/// Identifies one destination attached to a [`LogDispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DestinationId(u64);

struct Destination {
    id: DestinationId,
    writer: Box<dyn Write + Send>,
}

#[derive(Default)]
struct DispatchInner {
    destinations: Mutex<Vec<Destination>>,
    next_id: AtomicU64,
    installed: AtomicBool,
}

/// A set of log destinations sharing one formatter.
#[derive(Clone, Default)]
pub struct LogDispatch {
    inner: Arc<DispatchInner>,
}

static GLOBAL_DISPATCH: OnceLock<LogDispatch> = OnceLock::new();

impl LogDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide dispatch. It only receives events once [`init`] has
    /// installed it, or while a capture session provides a fallback subscriber.
    pub fn global() -> &'static LogDispatch {
        GLOBAL_DISPATCH.get_or_init(LogDispatch::new)
    }

    /// Whether this dispatch backs the global tracing subscriber.
    pub fn is_installed(&self) -> bool {
        self.inner.installed.load(Ordering::Acquire)
    }

    /// Whether events dispatched to `dispatch` are rendered to this dispatch's
    /// destinations.
    pub fn receives_from(&self, dispatch: &Dispatch) -> bool {
        dispatch
            .downcast_ref::<LogDispatch>()
            .is_some_and(|writer| Arc::ptr_eq(&writer.inner, &self.inner))
    }

    /// Attaches a destination. Existing destinations are unaffected.
    pub fn add_destination<W>(&self, writer: W) -> DestinationId
    where
        W: Write + Send + 'static,
    {
        let id = DestinationId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.destinations().push(Destination {
            id,
            writer: Box::new(writer),
        });
        id
    }

    /// Detaches a destination. Returns false if it was not attached.
    pub fn remove_destination(&self, id: DestinationId) -> bool {
        let mut destinations = self.destinations();
        match destinations.iter().position(|d| d.id == id) {
            Some(index) => {
                destinations.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn destination_count(&self) -> usize {
        self.destinations().len()
    }

    /// Builds a subscriber whose events are rendered with `format` and written
    /// to every destination of this dispatch.
    pub fn dispatch(&self, format: LogFormat, filter: EnvFilter) -> Dispatch {
        let layer = self.fmt_layer::<Layered<EnvFilter, Registry>>(format);
        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        Dispatch::new(subscriber)
    }

    /// Like [`dispatch`](Self::dispatch), but `existing` keeps receiving the
    /// events and spans it is interested in. `filter` only applies to the
    /// rendered output.
    pub fn dispatch_alongside(
        &self,
        format: LogFormat,
        filter: EnvFilter,
        existing: Dispatch,
    ) -> Dispatch {
        let interest = existing.clone();
        let forward = Forward { target: existing }
            .with_filter(filter_fn(move |metadata| interest.enabled(metadata)));
        let subscriber = tracing_subscriber::registry()
            .with(self.fmt_layer::<Registry>(format).with_filter(filter))
            .with(forward);
        Dispatch::new(subscriber)
    }

    fn fmt_layer<S>(&self, format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'span> LookupSpan<'span> + 'static,
    {
        let layer = fmt::layer().with_writer(self.clone()).with_ansi(false);

        match format {
            LogFormat::Raw => layer
                .without_time()
                .with_level(false)
                .with_target(false)
                .boxed(),
            LogFormat::Compact => layer.compact().without_time().boxed(),
            LogFormat::Full => layer.with_target(false).boxed(),
        }
    }

    fn destinations(&self) -> MutexGuard<'_, Vec<Destination>> {
        self.inner
            .destinations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_all_destinations(&self, buf: &[u8]) {
        for destination in self.destinations().iter_mut() {
            // A broken destination must not starve the others.
            let _ = destination.writer.write_all(buf);
        }
    }

    fn flush_all_destinations(&self) {
        for destination in self.destinations().iter_mut() {
            let _ = destination.writer.flush();
        }
    }
}

impl std::fmt::Debug for LogDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogDispatch")
            .field("destinations", &self.destination_count())
            .field("installed", &self.is_installed())
            .finish()
    }
}

/// Replays events and spans to another subscriber.
struct Forward {
    target: Dispatch,
}

/// The span id `Forward::target` assigned to one of our spans.
struct ForwardedSpan(Id);

impl Forward {
    fn forwarded<S>(id: &Id, ctx: &Context<'_, S>) -> Option<Id>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        let span = ctx.span(id)?;
        let extensions = span.extensions();
        extensions.get::<ForwardedSpan>().map(|forwarded| forwarded.0.clone())
    }
}

impl<S> Layer<S> for Forward
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let forwarded = self.target.new_span(attrs);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(ForwardedSpan(forwarded));
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        if let Some(forwarded) = Self::forwarded(id, &ctx) {
            self.target.record(&forwarded, values);
        }
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.target.event(event);
    }

    fn on_enter(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(forwarded) = Self::forwarded(id, &ctx) {
            self.target.enter(&forwarded);
        }
    }

    fn on_exit(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(forwarded) = Self::forwarded(id, &ctx) {
            self.target.exit(&forwarded);
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        if let Some(forwarded) = Self::forwarded(&id, &ctx) {
            self.target.try_close(forwarded);
        }
    }
}

/// Writer handed to the fmt layer for a single rendered event.
pub struct DispatchWriter<'a> {
    dispatch: &'a LogDispatch,
}

impl Write for DispatchWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.dispatch.write_all_destinations(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.dispatch.flush_all_destinations();
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogDispatch {
    type Writer = DispatchWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        DispatchWriter { dispatch: self }
    }
}

/// Installs the global dispatch as the process-wide tracing subscriber.
///
/// When `config.stderr` is set, the real stderr becomes its first destination.
pub fn init(config: &LogConfig) -> Result<LogDispatch, LoggingError> {
    let dispatch = LogDispatch::global();
    let subscriber = dispatch.dispatch(config.format, config.filter());
    tracing::dispatcher::set_global_default(subscriber)?;
    dispatch.inner.installed.store(true, Ordering::Release);

    if config.stderr {
        dispatch.add_destination(io::stderr());
    }

    Ok(dispatch.clone())
}
