//! Log formatting for the profiling agent.
//!
//! The agent runs inside someone else's process, so every line it writes is
//! prefixed with `PROFILER` to tell it apart from the host's own output:
//!
//! ```text
//! PROFILER | INFO | Profiling agent started for 'checkout' at 100 Hz
//! PROFILER | WARN | upload{reports=3}: Failed to upload reports: collector unreachable
//! ```

use std::fmt;

use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::config::log_level::LogLevel;

/// Line prefix shared by every agent log line.
pub const LOG_PREFIX: &str = "PROFILER";

/// Formats events as `PROFILER | LEVEL | [span{fields}: ]message fields`.
#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(&mut writer, "{} | {} | ", LOG_PREFIX, metadata.level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                // populated by the fmt layer when the span was created
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Installs the global subscriber at `level`. `RUST_LOG`, when set, wins.
///
/// Returns `false` if a global subscriber was already installed, by this
/// function or by the host.
pub fn init(level: LogLevel) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(Formatter)
        .try_init()
        .is_ok()
}
