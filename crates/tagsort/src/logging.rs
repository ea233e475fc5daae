//! Log line layout for stderr.
//!
//! ```text
//! I    0.042s worker[id=3] moved from=/music/a.mp3 to=/music/A/B/1 -- C.mp3
//! ```

use std::fmt;
use std::io::IsTerminal;
use std::time::Instant;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

/// Severity letter, seconds since startup, span scope, then the event.
#[derive(Clone, Copy, Debug)]
pub struct LineFormat {
    start: Instant,
}

impl LineFormat {
    pub fn new(start: Instant) -> Self {
        Self { start }
    }
}

impl Default for LineFormat {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

fn severity(level: &Level) -> (char, &'static str) {
    match *level {
        Level::ERROR => ('E', "\x1b[31m"),
        Level::WARN => ('W', "\x1b[33m"),
        Level::INFO => ('I', "\x1b[32m"),
        Level::DEBUG => ('D', "\x1b[34m"),
        Level::TRACE => ('T', "\x1b[35m"),
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let (letter, color) = severity(event.metadata().level());
        let elapsed = self.start.elapsed().as_secs_f64();
        if writer.has_ansi_escapes() {
            write!(writer, "{color}{letter}\x1b[0m {elapsed:>8.3}s ")?;
        } else {
            write!(writer, "{letter} {elapsed:>8.3}s ")?;
        }

        match ctx.event_scope() {
            Some(scope) => {
                for span in scope.from_root() {
                    write!(writer, "{}", span.name())?;
                    let ext = span.extensions();
                    if let Some(fields) = ext.get::<FormattedFields<N>>() {
                        if !fields.is_empty() {
                            write!(writer, "[{fields}]")?;
                        }
                    }
                    write!(writer, " ")?;
                }
            }
            None => write!(writer, "main ")?,
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the global subscriber writing to stderr.
///
/// `RUST_LOG` wins; otherwise `info`, or `debug` when `verbose`.
pub fn init(start: Instant, verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .event_format(LineFormat::new(start))
        .try_init()
        .map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))
}
