//! Structured console logger used by command handlers.
use std::sync::atomic::{AtomicUsize, Ordering};

use super::subscriber::STAGE_TARGET;

/// Thin wrapper over [`tracing`] with the tool's message vocabulary.
///
/// Library code emits `tracing` events directly; command handlers go through
/// a `Logger` so that stage headers and warning counts stay consistent.
#[derive(Debug)]
pub struct Logger {
    verbose: bool,
    warnings: AtomicUsize,
}

impl Logger {
    /// Create a new logger.
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self {
            verbose,
            warnings: AtomicUsize::new(0),
        }
    }

    /// Whether `--verbose` was given.
    #[must_use]
    pub const fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Number of warnings logged so far.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }
}
