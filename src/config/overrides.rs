//! `KEY=VALUE` overrides applied on top of a layered view.
use std::str::FromStr;

use crate::error::{ConfigError, OptsError};
use crate::opts::{DictProxy, Entry, OptsView, Value, kind_name};

/// One override: a dotted key path and the value to store there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    /// Path segments; the first is the top-level key.
    pub path: Vec<String>,
    /// Value to assign.
    pub value: Value,
}

impl Override {
    /// Parse `a.b.c=value`.
    ///
    /// The value is read as JSON when it parses (`true`, `3`, `[1,2]`,
    /// `{"k":1}`, `"quoted"`) and kept as a plain string otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if there is no `=` or the key
    /// path has an empty segment.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidOverride(raw.to_string());
        let (key, value) = raw.split_once('=').ok_or_else(invalid)?;
        let path: Vec<String> = key.trim().split('.').map(str::to_string).collect();
        if path.iter().any(String::is_empty) {
            return Err(invalid());
        }
        let value = value.trim();
        let value =
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        Ok(Self { path, value })
    }

    /// The path joined back with dots.
    #[must_use]
    pub fn key(&self) -> String {
        self.path.join(".")
    }

    /// Write the override into `view`.
    ///
    /// A top-level key goes through [`OptsView::set`]; deeper paths go
    /// through proxies, creating missing intermediate objects, so the edit
    /// stays local to `view` and is recorded by its tracker.
    ///
    /// # Errors
    ///
    /// Returns [`OptsError::TypeMismatch`] if an intermediate value exists
    /// but is not an object.
    #[track_caller]
    pub fn apply(&self, view: &OptsView) -> Result<(), OptsError> {
        let Some((top, rest)) = self.path.split_first() else {
            return Ok(());
        };
        let Some((last, middle)) = rest.split_last() else {
            view.set(top.clone(), self.value.clone());
            return Ok(());
        };

        if !view.contains_key(top) {
            view.set(top.clone(), Value::Object(serde_json::Map::new()));
        }
        let mut proxy = Self::as_object(view.get(top)?, top)?;
        let mut walked = top.clone();
        for segment in middle {
            walked.push('.');
            walked.push_str(segment);
            if !proxy.contains_key(segment) {
                proxy.insert(segment.clone(), Value::Object(serde_json::Map::new()))?;
            }
            proxy = Self::as_object(proxy.get(segment)?, &walked)?;
        }
        proxy.insert(last.clone(), self.value.clone())?;
        tracing::debug!("override {} applied to '{}'", self.key(), view.name());
        Ok(())
    }

    fn as_object(entry: Entry, key: &str) -> Result<DictProxy, OptsError> {
        let found = entry.as_scalar().map_or("array", kind_name);
        entry.into_map().ok_or_else(|| OptsError::TypeMismatch {
            key: key.to_string(),
            expected: "object",
            found,
        })
    }
}

impl FromStr for Override {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
