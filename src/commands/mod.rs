//! Subcommand implementations.
pub mod report;
pub mod show;
pub mod version;

use anyhow::{Context as _, Result};
use std::sync::Arc;

use crate::cli::LayerOpts;
use crate::config::load_source;
use crate::logging::Logger;
use crate::opts::{ConfigMap, OptsView, RootRegistry};

/// Shared state produced by the common command setup sequence.
///
/// Loads the source file, wraps it through a [`RootRegistry`], and applies
/// the `--set` overrides on a fresh child layer.
#[derive(Debug)]
pub struct CommandSetup {
    /// Registry that owns the source-to-root mapping for this run.
    pub registry: RootRegistry,
    /// The loaded source dictionary (never modified).
    pub source: Arc<ConfigMap>,
    /// Child layer carrying the overrides.
    pub view: OptsView,
}

impl CommandSetup {
    /// Load the source named by `opts` and build the override layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be loaded or an override cannot
    /// be applied.
    pub fn init(opts: &LayerOpts, log: &Logger) -> Result<Self> {
        log.stage("Loading configuration");
        let source = load_source(&opts.file)
            .with_context(|| format!("loading {}", opts.file.display()))?;
        log.info(&format!(
            "{} top-level keys from {}",
            source.len(),
            opts.file.display()
        ));

        let registry = RootRegistry::default();
        let view = registry.safe_wrap(&source, Some(&opts.layer));

        if !opts.overrides.is_empty() {
            log.stage(&format!("Applying overrides to layer '{}'", opts.layer));
        }
        for o in &opts.overrides {
            if let Some(top) = o.path.first()
                && !source.contains_key(top)
            {
                log.warn(&format!(
                    "override {} adds '{top}', which {} does not define",
                    o.key(),
                    opts.file.display()
                ));
            }
            o.apply(&view)
                .with_context(|| format!("applying override {}", o.key()))?;
            log.debug(&format!("set {} = {}", o.key(), o.value));
        }

        Ok(Self {
            registry,
            source,
            view,
        })
    }

    /// Release the registry entries; the view stays usable.
    pub fn shutdown(&self) {
        self.registry.clear();
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Override;
    use serde_json::json;

    fn layer_opts(dir: &tempfile::TempDir, overrides: &[&str]) -> LayerOpts {
        let file = dir.path().join("minion.toml");
        std::fs::write(&file, "test = false\n\n[grains]\nos = \"Linux\"\n").unwrap();
        LayerOpts {
            file,
            overrides: overrides.iter().map(|o| Override::parse(o).unwrap()).collect(),
            layer: "cli".to_string(),
        }
    }

    #[test]
    fn known_keys_do_not_warn() {
        let dir = tempfile::tempdir().unwrap();
        let (log, _lines, _guard) = crate::logging::isolated_logger();
        let setup = CommandSetup::init(&layer_opts(&dir, &["test=true", "grains.os=Arch"]), &log)
            .unwrap();
        assert_eq!(log.warning_count(), 0);
        assert_eq!(setup.view.get("test").unwrap(), json!(true));
    }

    #[test]
    fn unknown_top_level_key_warns() {
        let dir = tempfile::tempdir().unwrap();
        let (log, lines, _guard) = crate::logging::isolated_logger();
        let setup = CommandSetup::init(&layer_opts(&dir, &["tset=true"]), &log).unwrap();
        assert_eq!(log.warning_count(), 1);
        assert!(lines.lock().unwrap().iter().any(|l| l.contains("adds 'tset'")));
        assert_eq!(setup.view.get("tset").unwrap(), json!(true));
        assert!(!setup.source.contains_key("tset"));
    }
}
