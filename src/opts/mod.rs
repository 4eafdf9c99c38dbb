//! Copy-on-write layered configuration views.
//!
//! A root [`OptsView`] wraps a source dictionary without copying it. Child
//! views read through their ancestors and write only into their own local
//! layer, so one shared configuration can be handed to many consumers that
//! each see their own edits and nobody else's. Nested objects and arrays are
//! handed out behind [`DictProxy`] / [`ListProxy`], which copy on first edit.
//! A [`MutationTracker`] shared by the whole tree records who changed what,
//! and a [`RootRegistry`] makes repeated wrapping of one source produce
//! siblings.
pub mod proxy;
pub mod registry;
pub mod tracker;
pub mod value;
pub mod view;

pub use proxy::{DictProxy, Entry, ListProxy};
pub use registry::RootRegistry;
pub use tracker::{CallSite, ConciseEntry, LedgerEntry, MutationReport, MutationTracker};
pub use value::{ConfigMap, Segment, Value, estimate_size, is_nested, kind_name};
pub use view::{MemoryStats, OptsView};
