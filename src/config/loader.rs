//! Source file parsing for TOML and JSON documents.
use std::path::Path;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::opts::{ConfigMap, Value};

/// Supported on-disk formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl Format {
    /// Pick the format for `path` from its extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

/// Load a source dictionary from `path`.
///
/// A missing file yields an empty dictionary.
///
/// # Errors
///
/// Returns an error if the extension is unsupported, the file cannot be
/// read or parsed, or its top level is not a table/object.
pub fn load_source(path: &Path) -> Result<Arc<ConfigMap>, ConfigError> {
    let format = Format::from_path(path)?;
    if !path.exists() {
        tracing::debug!("config file {} not found, using empty source", path.display());
        return Ok(Arc::new(ConfigMap::new()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let map = parse_str(&content, format, &path.display().to_string())?;
    tracing::debug!(
        "loaded {} top-level keys from {}",
        map.len(),
        path.display()
    );
    Ok(Arc::new(map))
}

/// Parse `content` as a source dictionary; `origin` names it in errors.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] or [`ConfigError::NotAMapping`].
pub fn parse_str(content: &str, format: Format, origin: &str) -> Result<ConfigMap, ConfigError> {
    let parse_err = |message: String| ConfigError::Parse {
        path: origin.to_string(),
        format: format.label(),
        message,
    };
    let value = match format {
        Format::Toml => {
            let table: toml::Table = toml::from_str(content).map_err(|e| parse_err(e.to_string()))?;
            toml_to_json(toml::Value::Table(table))
        }
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string()))?,
    };
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::NotAMapping(origin.to_string())),
    }
}

/// Convert a TOML value to JSON; datetimes become RFC 3339 strings.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}
