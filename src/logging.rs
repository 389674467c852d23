use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use time::{
    format_description::BorrowedFormatItem, macros::format_description, OffsetDateTime, UtcOffset,
};
use tracing::{warn, Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{format, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
    FmtSubscriber,
};

const TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// Install the global subscriber printing events up to `level`.
///
/// The local offset can only be read while the process has a single thread,
/// so this must run before the download thread is spawned. If it cannot be
/// read, times are shown in UTC.
pub fn init_logging(level: Level) -> Result<()> {
    let local_offset = UtcOffset::current_local_offset();

    let subscriber = FmtSubscriber::builder()
        .event_format(StatusLineFormat {
            offset: local_offset.unwrap_or(UtcOffset::UTC),
            show_target: level >= Level::DEBUG,
        })
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .into_diagnostic()
        .wrap_err("Setting default subscriber failed")?;

    if let Err(err) = local_offset {
        warn!("Could not get the local time offset, logging in UTC: {err}");
    }
    Ok(())
}

/// `<time> <level> <thread> [<target>] <fields>`, the target only at Debug level and below
struct StatusLineFormat {
    offset: UtcOffset,
    show_target: bool,
}

fn colored_level(level: Level) -> String {
    match level {
        Level::ERROR => level.red().to_string(),
        Level::WARN => level.yellow().to_string(),
        Level::INFO => level.green().to_string(),
        _ => level.blue().to_string(),
    }
}

impl<S, N> FormatEvent<S, N> for StatusLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let level = *metadata.level();

        let now = OffsetDateTime::now_utc()
            .to_offset(self.offset)
            .format(TIME_FORMAT)
            .map_err(|_| std::fmt::Error)?;
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");

        if writer.has_ansi_escapes() {
            write!(
                writer,
                "{} {:>5} {} ",
                now.dimmed(),
                colored_level(level),
                thread_name.yellow()
            )?;
        } else {
            write!(writer, "{now} {level:>5} {thread_name} ")?;
        }

        if self.show_target {
            write!(writer, "[{}] ", metadata.target())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_keep_their_name_when_colored() {
        for level in [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            let colored = colored_level(level);
            assert!(colored.contains(level.as_str()), "{colored:?}");
            assert!(colored.starts_with('\u{1b}'), "{colored:?}");
        }
    }
}
