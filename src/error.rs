//! Domain-specific error types for layered configuration views.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! The library returns typed errors ([`OptsError`], [`ConfigError`]) while
//! command handlers at the CLI boundary convert them to [`anyhow::Error`]
//! via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! Error
//! ├── Opts(OptsError)     : lookups, deletes, and proxied container edits
//! └── Config(ConfigError) : loading source files, parsing overrides
//! ```

use thiserror::Error;

/// Top-level error type for the crate.
///
/// Aggregates domain-specific sub-errors and is convertible to
/// [`anyhow::Error`] for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum Error {
    /// Error raised by a layered view or one of its proxies.
    #[error("Options error: {0}")]
    Opts(#[from] OptsError),

    /// Error raised while loading a source file or parsing an override.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by [`OptsView`](crate::opts::OptsView) and its proxies.
///
/// These mirror the errors a plain map or vector would raise; the layering
/// adds no error kinds of its own beyond [`OptsError::NotLocal`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptsError {
    /// The key resolves nowhere in the view, its ancestors, or the root base.
    #[error("Key '{0}' not found")]
    MissingKey(String),

    /// The key is visible through an ancestor but was never written locally,
    /// so this view cannot delete it.
    #[error("Key '{0}' is not in the local layer and cannot be deleted")]
    NotLocal(String),

    /// A list index is outside the current bounds.
    #[error("Index {index} out of range for list of length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Length of the list at the time of the call.
        len: usize,
    },

    /// `remove` was asked to drop a value the list does not contain.
    #[error("Value {0} not found in list")]
    ValueNotFound(String),

    /// The proxied value no longer has the shape the proxy expects.
    #[error("Expected {expected} at '{key}', found {found}")]
    TypeMismatch {
        /// Top-level key (plus nested path) the proxy addresses.
        key: String,
        /// Shape the operation needs (`"object"` or `"array"`).
        expected: &'static str,
        /// Shape actually found.
        found: &'static str,
    },
}

/// Errors that arise from loading source files and parsing overrides.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file could not be parsed in its declared format.
    #[error("Invalid {format} syntax in {path}: {message}")]
    Parse {
        /// Path to the offending file.
        path: String,
        /// Format the file was parsed as (`"TOML"` or `"JSON"`).
        format: &'static str,
        /// Parser message.
        message: String,
    },

    /// The file extension is neither `.toml` nor `.json`.
    #[error("Unsupported config format for {0}: expected .toml or .json")]
    UnsupportedFormat(String),

    /// The document parsed, but its top level is not a mapping.
    #[error("Top level of {0} must be a mapping")]
    NotAMapping(String),

    /// A `--set` override is not of the form `key=value`.
    #[error("Invalid override '{0}': expected KEY=VALUE")]
    InvalidOverride(String),
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    // -----------------------------------------------------------------------
    // OptsError
    // -----------------------------------------------------------------------

    #[test]
    fn missing_key_display() {
        let e = OptsError::MissingKey("pillar".to_string());
        assert_eq!(e.to_string(), "Key 'pillar' not found");
    }

    #[test]
    fn not_local_display() {
        let e = OptsError::NotLocal("grains".to_string());
        assert_eq!(
            e.to_string(),
            "Key 'grains' is not in the local layer and cannot be deleted"
        );
    }

    #[test]
    fn index_out_of_range_display() {
        let e = OptsError::IndexOutOfRange { index: 4, len: 2 };
        assert_eq!(e.to_string(), "Index 4 out of range for list of length 2");
    }

    #[test]
    fn type_mismatch_display() {
        let e = OptsError::TypeMismatch {
            key: "ext_pillar".to_string(),
            expected: "array",
            found: "string",
        };
        assert_eq!(e.to_string(), "Expected array at 'ext_pillar', found string");
    }

    // -----------------------------------------------------------------------
    // ConfigError
    // -----------------------------------------------------------------------

    #[test]
    fn config_error_io_has_source() {
        use std::error::Error as StdError;
        let e = ConfigError::Io {
            path: "/etc/minion.toml".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/etc/minion.toml"));
    }

    #[test]
    fn config_error_parse_display() {
        let e = ConfigError::Parse {
            path: "minion.toml".to_string(),
            format: "TOML",
            message: "expected `=`".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "Invalid TOML syntax in minion.toml: expected `=`"
        );
    }

    #[test]
    fn config_error_invalid_override_display() {
        let e = ConfigError::InvalidOverride("test".to_string());
        assert_eq!(e.to_string(), "Invalid override 'test': expected KEY=VALUE");
    }

    // -----------------------------------------------------------------------
    // Error conversions
    // -----------------------------------------------------------------------

    #[test]
    fn error_from_opts_error() {
        let e: Error = OptsError::MissingKey("x".to_string()).into();
        assert!(e.to_string().contains("Options error"));
        assert!(e.to_string().contains('x'));
    }

    #[test]
    fn error_from_config_error() {
        let e: Error = ConfigError::NotAMapping("a.json".to_string()).into();
        assert!(e.to_string().contains("Configuration error"));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<Error>();
        assert_send_sync::<OptsError>();
        assert_send_sync::<ConfigError>();
    }

    #[test]
    fn opts_error_converts_to_anyhow() {
        let e = OptsError::NotLocal("a".to_string());
        let _anyhow_err: anyhow::Error = e.into();
    }
}
