// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed source file and a fluent builder so
// each integration test can wrap a realistic minion-style configuration
// without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use layered_opts::config::load_source;
use layered_opts::opts::{ConfigMap, OptsView, Value};
use serde_json::json;

/// A minion-like configuration used across scenarios.
pub fn minion_config() -> Value {
    json!({
        "grains": {"os": "Linux", "cpu": {"cores": 4}},
        "pillar": {"app": {"db": "mysql"}},
        "ext_pillar": [{"git": "repo"}],
        "file_roots": {"base": ["/srv/salt"]},
        "test": false,
        "log_level": "warning"
    })
}

/// Turn a JSON object literal into a shared source dictionary.
pub fn source_from(value: &Value) -> Arc<ConfigMap> {
    Arc::new(value.as_object().cloned().expect("source must be an object"))
}

/// Root view over [`minion_config`], with tracking enabled.
pub fn minion_root() -> (Arc<ConfigMap>, OptsView) {
    let source = source_from(&minion_config());
    let root = OptsView::from_dict(Arc::clone(&source), true, None);
    (source, root)
}

/// An isolated configuration directory backed by a [`tempfile::TempDir`].
///
/// The directory is automatically deleted when dropped.
pub struct IntegrationTestContext {
    /// Temporary directory holding the source files.
    pub root: tempfile::TempDir,
    /// Source file written by the builder.
    pub source_file: PathBuf,
}

impl IntegrationTestContext {
    /// Create a context whose source file is `minion.toml` with the default
    /// configuration.
    pub fn new() -> Self {
        TestContextBuilder::new().build()
    }

    /// Path to the directory.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Load the source file through the crate's loader.
    pub fn load(&self) -> Arc<ConfigMap> {
        load_source(&self.source_file).expect("load source")
    }
}

/// Fluent builder for [`IntegrationTestContext`].
pub struct TestContextBuilder {
    file_name: String,
    content: String,
}

impl TestContextBuilder {
    /// Begin building a context with the default TOML source.
    pub fn new() -> Self {
        Self {
            file_name: "minion.toml".to_string(),
            content: concat!(
                "test = false\n",
                "log_level = \"warning\"\n",
                "\n",
                "[grains]\n",
                "os = \"Linux\"\n",
                "\n",
                "[pillar.app]\n",
                "db = \"mysql\"\n",
                "\n",
                "[[ext_pillar]]\n",
                "git = \"repo\"\n",
            )
            .to_string(),
        }
    }

    /// Replace the source with `content` written to `file_name`.
    pub fn with_source(mut self, file_name: &str, content: &str) -> Self {
        self.file_name = file_name.to_string();
        self.content = content.to_string();
        self
    }

    /// Write the file and return the configured context.
    pub fn build(self) -> IntegrationTestContext {
        let root = tempfile::tempdir().expect("create temp dir");
        let source_file = root.path().join(&self.file_name);
        std::fs::write(&source_file, &self.content).expect("write source file");
        IntegrationTestContext { root, source_file }
    }
}
