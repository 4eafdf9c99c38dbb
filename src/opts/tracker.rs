//! Mutation ledger shared by every view in one tree.
//!
//! The tracker is pure bookkeeping: it records who wrote which key, where
//! from, and what the key held before and after. It never changes how reads
//! or writes behave.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::panic::Location;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Serialize, Serializer};

use super::value::{Value, kind_name};

/// Source location of a write, captured with `#[track_caller]`.
///
/// Public entry points of the views and proxies are annotated so that the
/// location always points at the caller's code, never at this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSite {
    /// Source file of the caller.
    pub file: &'static str,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

impl CallSite {
    /// Capture the location of the (tracked) caller.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        let loc = Location::caller();
        Self {
            file: loc.file(),
            line: loc.line(),
            column: loc.column(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

impl Serialize for CallSite {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Full history of one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    /// Value the key resolved to before its first recorded mutation, or
    /// `None` if it did not exist anywhere in the tree.
    pub original_value: Option<Value>,
    /// Value written by the most recent mutation.
    pub current_value: Value,
    /// Number of recorded mutations.
    pub mutation_count: usize,
    /// Call site of every mutation, oldest first.
    pub call_sites: Vec<CallSite>,
    /// Value written by every mutation, oldest first.
    pub value_history: Vec<Value>,
    /// Name of the view that performed every mutation, oldest first.
    pub writers: Vec<String>,
}

/// Summary of one key for the concise report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConciseEntry {
    /// Number of recorded mutations.
    pub mutation_count: usize,
    /// Where the key was first mutated.
    pub first_mutation: Option<CallSite>,
    /// Type of the original value (`"missing"` if the key was new).
    pub original_type: &'static str,
    /// Type of the current value.
    pub current_type: &'static str,
}

/// Mutation report in either of its two levels of detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MutationReport {
    /// Counts, types, and first mutation site per key.
    Concise(BTreeMap<String, ConciseEntry>),
    /// Complete ledger entry per key.
    Verbose(BTreeMap<String, LedgerEntry>),
}

impl MutationReport {
    /// Mutation count recorded for `key`, if it was ever mutated.
    #[must_use]
    pub fn mutation_count(&self, key: &str) -> Option<usize> {
        match self {
            Self::Concise(m) => m.get(key).map(|e| e.mutation_count),
            Self::Verbose(m) => m.get(key).map(|e| e.mutation_count),
        }
    }

    /// Keys present in the report, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Concise(m) => m.keys().map(String::as_str).collect(),
            Self::Verbose(m) => m.keys().map(String::as_str).collect(),
        }
    }

    /// Number of mutated keys in the report.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Concise(m) => m.len(),
            Self::Verbose(m) => m.len(),
        }
    }

    /// Returns `true` when nothing was mutated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared ledger of every mutation made anywhere in a tree of views.
///
/// One tracker is created with each root and referenced by all of its
/// descendants. Entries are created on a key's first mutation, updated on
/// every later one, and only removed by an explicit [`clear`](Self::clear).
#[derive(Debug)]
pub struct MutationTracker {
    enabled: bool,
    ledger: Mutex<HashMap<String, LedgerEntry>>,
}

impl Default for MutationTracker {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MutationTracker {
    /// Create a tracker; a disabled tracker ignores every recording.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ledger: Mutex::new(HashMap::new()),
        }
    }

    /// Whether mutations are being recorded.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, LedgerEntry>> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a mutation of `key` made by the caller.
    #[track_caller]
    pub fn record_mutation(&self, key: &str, original: Option<&Value>, new: &Value) {
        self.record(key, original, new, CallSite::caller(), "<external>");
    }

    /// Record a mutation with an explicit call site and writer name.
    pub(crate) fn record(
        &self,
        key: &str,
        original: Option<&Value>,
        new: &Value,
        site: CallSite,
        writer: &str,
    ) {
        if !self.enabled {
            return;
        }
        let mut ledger = self.lock();
        if let Some(entry) = ledger.get_mut(key) {
            entry.mutation_count += 1;
            entry.current_value = new.clone();
            entry.call_sites.push(site);
            entry.value_history.push(new.clone());
            entry.writers.push(writer.to_string());
            tracing::trace!(
                "mutation #{} of '{key}' by view '{writer}' at {site}",
                entry.mutation_count
            );
        } else {
            tracing::trace!("first mutation of '{key}' by view '{writer}' at {site}");
            ledger.insert(
                key.to_string(),
                LedgerEntry {
                    original_value: original.cloned(),
                    current_value: new.clone(),
                    mutation_count: 1,
                    call_sites: vec![site],
                    value_history: vec![new.clone()],
                    writers: vec![writer.to_string()],
                },
            );
        }
    }

    /// Build a report of every mutated key.
    #[must_use]
    pub fn get_mutation_report(&self, verbose: bool) -> MutationReport {
        let ledger = self.lock();
        if verbose {
            return MutationReport::Verbose(
                ledger.iter().map(|(k, e)| (k.clone(), e.clone())).collect(),
            );
        }
        MutationReport::Concise(
            ledger
                .iter()
                .map(|(k, e)| {
                    let summary = ConciseEntry {
                        mutation_count: e.mutation_count,
                        first_mutation: e.call_sites.first().copied(),
                        original_type: e.original_value.as_ref().map_or("missing", kind_name),
                        current_type: kind_name(&e.current_value),
                    };
                    (k.clone(), summary)
                })
                .collect(),
        )
    }

    /// Keys mutated at least `min_mutations` times, most mutated first.
    ///
    /// Ties are broken by key name so the order is stable.
    #[must_use]
    pub fn get_hotspot_keys(&self, min_mutations: usize) -> Vec<(String, usize)> {
        let mut hot: Vec<(String, usize)> = self
            .lock()
            .iter()
            .filter(|(_, e)| e.mutation_count >= min_mutations)
            .map(|(k, e)| (k.clone(), e.mutation_count))
            .collect();
        hot.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        hot
    }

    /// Inverted index: every call site and the keys it mutated.
    #[must_use]
    pub fn get_mutation_locations(&self) -> BTreeMap<CallSite, BTreeSet<String>> {
        let mut out: BTreeMap<CallSite, BTreeSet<String>> = BTreeMap::new();
        for (key, entry) in self.lock().iter() {
            for site in &entry.call_sites {
                out.entry(*site).or_default().insert(key.clone());
            }
        }
        out
    }

    /// Snapshot of the ledger entry for `key`.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<LedgerEntry> {
        self.lock().get(key).cloned()
    }

    /// Keys with at least one recorded mutation, sorted.
    #[must_use]
    pub fn mutated_keys(&self) -> BTreeSet<String> {
        self.lock().keys().cloned().collect()
    }

    /// Total number of mutations across all keys.
    #[must_use]
    pub fn total_mutations(&self) -> usize {
        self.lock().values().map(|e| e.mutation_count).sum()
    }

    /// Drop the whole ledger.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn disabled_tracker_records_nothing() {
        let t = MutationTracker::new(false);
        t.record_mutation("x", None, &json!(1));
        assert!(t.get_mutation_report(true).is_empty());
        assert_eq!(t.total_mutations(), 0);
    }

    #[test]
    fn first_mutation_creates_entry() {
        let t = MutationTracker::new(true);
        t.record_mutation("x", Some(&json!(false)), &json!(true));
        let e = t.entry("x").unwrap();
        assert_eq!(e.mutation_count, 1);
        assert_eq!(e.original_value, Some(json!(false)));
        assert_eq!(e.current_value, json!(true));
        assert_eq!(e.value_history, vec![json!(true)]);
        assert_eq!(e.writers, vec!["<external>".to_string()]);
    }

    #[test]
    fn later_mutations_update_entry() {
        let t = MutationTracker::new(true);
        t.record_mutation("x", None, &json!(1));
        t.record_mutation("x", Some(&json!(1)), &json!(2));
        t.record_mutation("x", Some(&json!(2)), &json!(3));
        let e = t.entry("x").unwrap();
        assert_eq!(e.mutation_count, 3);
        assert_eq!(e.original_value, None);
        assert_eq!(e.current_value, json!(3));
        assert_eq!(e.call_sites.len(), 3);
        assert_eq!(e.value_history, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn call_site_points_at_this_file() {
        let t = MutationTracker::new(true);
        t.record_mutation("x", None, &json!(1));
        let site = t.entry("x").unwrap().call_sites[0];
        assert!(site.file.ends_with("tracker.rs"), "got {site}");
    }

    #[test]
    fn concise_report_has_types_and_first_site() {
        let t = MutationTracker::new(true);
        t.record_mutation("grains", Some(&json!({"os": "Linux"})), &json!("flat"));
        t.record_mutation("fresh", None, &json!([1]));
        let MutationReport::Concise(report) = t.get_mutation_report(false) else {
            panic!("expected concise report");
        };
        let grains = &report["grains"];
        assert_eq!(grains.original_type, "object");
        assert_eq!(grains.current_type, "string");
        assert!(grains.first_mutation.is_some());
        assert_eq!(report["fresh"].original_type, "missing");
        assert_eq!(report["fresh"].current_type, "array");
    }

    #[test]
    fn hotspots_are_sorted_by_count() {
        let t = MutationTracker::new(true);
        for _ in 0..3 {
            t.record_mutation("hot", None, &json!(1));
        }
        t.record_mutation("cold", None, &json!(1));
        for _ in 0..2 {
            t.record_mutation("warm", None, &json!(1));
        }
        assert_eq!(
            t.get_hotspot_keys(2),
            vec![("hot".to_string(), 3), ("warm".to_string(), 2)]
        );
        assert_eq!(t.get_hotspot_keys(1).len(), 3);
    }

    #[test]
    fn locations_index_keys_by_site() {
        let t = MutationTracker::new(true);
        for key in ["a", "b"] {
            t.record_mutation(key, None, &json!(0));
        }
        let locations = t.get_mutation_locations();
        assert_eq!(locations.len(), 1);
        let keys = locations.values().next().unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn report_serializes_to_json() {
        let t = MutationTracker::new(true);
        t.record_mutation("x", None, &json!(1));
        let json = serde_json::to_value(t.get_mutation_report(false)).unwrap();
        assert_eq!(json["x"]["mutation_count"], json!(1));
        assert!(json["x"]["first_mutation"].as_str().unwrap().contains("tracker.rs"));
    }

    #[test]
    fn clear_empties_ledger() {
        let t = MutationTracker::default();
        t.record_mutation("x", None, &json!(1));
        t.clear();
        assert!(t.mutated_keys().is_empty());
    }
}
