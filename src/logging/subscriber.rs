//! Tracing subscriber setup: console formatter and initialisation.
use tracing::Level;

/// Target used by [`Logger::stage`](super::Logger::stage) for section headers.
pub const STAGE_TARGET: &str = "layered_opts::stage";

/// Extracts the `message` field from a [`tracing::Event`].
#[derive(Default)]
struct MessageExtractor {
    message: String,
}

impl tracing::field::Visit for MessageExtractor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn message_of(event: &tracing::Event<'_>) -> String {
    let mut extractor = MessageExtractor::default();
    event.record(&mut extractor);
    extractor.message
}

/// Render one console line, with or without ANSI colour.
fn render(level: Level, target: &str, msg: &str, ansi: bool) -> String {
    let paint = |code: &str, text: &str| {
        if ansi {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    };
    match level {
        Level::ERROR => format!("{} {msg}", paint("31", "ERROR")),
        Level::WARN => format!("{}  {msg}", paint("33", "WARN")),
        Level::INFO if target == STAGE_TARGET => {
            format!("{} {}", paint("1;34", "==>"), paint("1", msg))
        }
        Level::INFO => format!("  {msg}"),
        Level::DEBUG => format!("  {}", paint("2", msg)),
        _ => format!("  {}", paint("2", &format!("[{target}] {msg}"))),
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] that emits the tool's console
/// style.
struct OptsFormatter {
    ansi: bool,
}

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for OptsFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let line = render(
            *metadata.level(),
            metadata.target(),
            &message_of(event),
            self.ansi,
        );
        writeln!(writer, "{line}")
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// All console output goes to stderr so that stdout carries only command
/// results. `RUST_LOG` takes precedence over `verbose` when set.
/// Must be called once at program startup, before any logging.
pub fn init_subscriber(verbose: bool) {
    use std::io::IsTerminal as _;
    use tracing_subscriber::{
        EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
    };

    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let console_layer = fmt::layer()
        .event_format(OptsFormatter {
            ansi: std::io::stderr().is_terminal(),
        })
        .with_writer(std::io::stderr)
        .with_filter(filter);

    tracing_subscriber::registry().with(console_layer).init();
}

/// Lines collected by a [`CaptureLayer`].
#[cfg(test)]
pub(crate) type CapturedLines = std::sync::Arc<std::sync::Mutex<Vec<String>>>;

/// Test layer that renders events without colour and keeps them in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct CaptureLayer {
    lines: CapturedLines,
}

#[cfg(test)]
impl CaptureLayer {
    pub(crate) fn lines(&self) -> CapturedLines {
        std::sync::Arc::clone(&self.lines)
    }
}

#[cfg(test)]
impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let line = render(
            *metadata.level(),
            metadata.target(),
            &message_of(event),
            false,
        );
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_plain_levels() {
        assert_eq!(render(Level::ERROR, "x", "boom", false), "ERROR boom");
        assert_eq!(render(Level::WARN, "x", "careful", false), "WARN  careful");
        assert_eq!(render(Level::INFO, "x", "hello", false), "  hello");
        assert_eq!(render(Level::DEBUG, "x", "detail", false), "  detail");
    }

    #[test]
    fn render_stage_header() {
        assert_eq!(render(Level::INFO, STAGE_TARGET, "Load", false), "==> Load");
    }

    #[test]
    fn render_trace_includes_target() {
        assert_eq!(
            render(Level::TRACE, "layered_opts::opts::view", "copied", false),
            "  [layered_opts::opts::view] copied"
        );
    }

    #[test]
    fn render_with_ansi_wraps_label() {
        let line = render(Level::ERROR, "x", "boom", true);
        assert!(line.starts_with("\x1b[31mERROR\x1b[0m"));
        assert!(line.ends_with("boom"));
    }
}
