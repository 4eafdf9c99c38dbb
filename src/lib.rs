//! Copy-on-write layered configuration views.
//!
//! One configuration dictionary is loaded once and shared by many
//! consumers. Each consumer gets its own view that reads through to the
//! shared data and keeps its writes to itself, with an optional ledger of
//! every mutation and where it came from.
//!
//! The public API is organised into these layers:
//!
//! - **[`opts`]**: views, copy-on-write proxies, mutation tracking, and the root registry
//! - **[`config`]**: load source dictionaries from TOML/JSON and parse `KEY=VALUE` overrides
//! - **[`error`]**: typed errors for both
//! - **[`commands`]**: the `show`, `report`, and `version` subcommands
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod opts;

pub use error::{ConfigError, Error, OptsError};
pub use opts::{OptsView, RootRegistry};
