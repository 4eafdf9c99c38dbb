//! Logging infrastructure for console output.

mod logger;
mod subscriber;

pub use logger::Logger;
pub use subscriber::{STAGE_TARGET, init_subscriber};

/// Create a Logger backed by an isolated per-thread tracing subscriber that
/// captures every formatted event line, so tests can assert on what was
/// logged.
///
/// Returns a [`tracing::dispatcher::DefaultGuard`] that must be kept alive
/// for the duration of the test; dropping it restores the previous
/// thread-local dispatcher.
#[cfg(test)]
pub(crate) fn isolated_logger() -> (
    Logger,
    subscriber::CapturedLines,
    tracing::dispatcher::DefaultGuard,
) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};
    let capture = subscriber::CaptureLayer::default();
    let lines = capture.lines();
    let subscriber =
        tracing_subscriber::registry().with(capture.with_filter(LevelFilter::TRACE));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (Logger::new(true), lines, guard)
}
