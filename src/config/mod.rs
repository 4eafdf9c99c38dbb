//! Loading source dictionaries and command-line overrides.
//!
//! - [`loader`] reads a TOML or JSON file into a shared [`ConfigMap`](crate::opts::ConfigMap)
//! - [`overrides`] parses `a.b.c=value` strings and applies them to a view
pub mod loader;
pub mod overrides;

pub use loader::load_source;
pub use overrides::Override;
