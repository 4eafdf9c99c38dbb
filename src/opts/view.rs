//! Copy-on-write layered view over a chain of ancestors.
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::ControlFlow;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde::{Serialize, Serializer};

use super::proxy::{DictProxy, Entry, ListProxy, Target};
use super::tracker::{CallSite, MutationReport, MutationTracker};
use super::value::{ConfigMap, Shared, Value, estimate_size};
use crate::error::OptsError;

/// One key of a local layer.
#[derive(Debug, Clone)]
enum Slot {
    Value(Arc<Value>),
    /// The key was written here and then deleted; it stays hidden even if an
    /// ancestor still provides it.
    Deleted,
}

impl Slot {
    fn value(&self) -> Option<&Arc<Value>> {
        match self {
            Self::Value(v) => Some(v),
            Self::Deleted => None,
        }
    }
}

type Layer = HashMap<String, Slot>;

/// Diagnostic memory figures for one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    /// Keys written directly on this view.
    pub local_keys: usize,
    /// Keys visible only through an ancestor or the root base.
    pub shared_keys: usize,
    /// All visible keys.
    pub total_keys: usize,
    /// Rough bytes held by this view's local layer.
    pub local_bytes: usize,
}

struct ViewInner {
    name: String,
    depth: usize,
    parent: Option<OptsView>,
    /// Only set on roots.
    base: Option<Arc<ConfigMap>>,
    local: RwLock<Layer>,
    tracker: Arc<MutationTracker>,
}

/// Weak counterpart of [`OptsView`]; does not keep the view alive.
#[derive(Debug, Clone)]
pub(crate) struct WeakView(Weak<ViewInner>);

impl WeakView {
    pub(crate) fn upgrade(&self) -> Option<OptsView> {
        self.0.upgrade().map(|inner| OptsView { inner })
    }
}

/// A dictionary-like view that reads through its ancestors and writes only
/// into its own local layer.
///
/// Cloning an `OptsView` clones the handle, not the data: both handles refer
/// to the same view. Use [`from_parent`](Self::from_parent) to derive an
/// isolated child and [`to_dict`](Self::to_dict) to take a plain snapshot.
///
/// # Examples
///
/// ```
/// use layered_opts::opts::OptsView;
/// use serde_json::json;
///
/// let source = json!({"test": false, "grains": {"os": "Linux"}});
/// let root = OptsView::from_dict(source.as_object().cloned().unwrap_or_default(), true, None);
/// let child = OptsView::from_parent(&root, Some("sls"));
///
/// child.set("test", true);
/// assert_eq!(child.get("test").unwrap(), json!(true));
/// assert_eq!(root.get("test").unwrap(), json!(false));
/// ```
#[derive(Clone)]
pub struct OptsView {
    inner: Arc<ViewInner>,
}

impl OptsView {
    /// Create a root view over `source`.
    ///
    /// The source is shared, never copied; it stays untouched for the life
    /// of the tree.
    #[must_use]
    pub fn from_dict(
        source: impl Into<Arc<ConfigMap>>,
        track_mutations: bool,
        name: Option<&str>,
    ) -> Self {
        let name = name.unwrap_or("root").to_string();
        let base = source.into();
        tracing::debug!(
            "created root view '{name}' over {} keys (tracking {})",
            base.len(),
            if track_mutations { "on" } else { "off" }
        );
        Self {
            inner: Arc::new(ViewInner {
                name,
                depth: 0,
                parent: None,
                base: Some(base),
                local: RwLock::new(Layer::new()),
                tracker: Arc::new(MutationTracker::new(track_mutations)),
            }),
        }
    }

    /// Create a child of `parent` that shares its tracker.
    #[must_use]
    pub fn from_parent(parent: &Self, name: Option<&str>) -> Self {
        let depth = parent.inner.depth + 1;
        let name = name.map_or_else(
            || format!("{}.child{depth}", parent.inner.name),
            str::to_string,
        );
        tracing::debug!("created view '{name}' under '{}'", parent.inner.name);
        Self {
            inner: Arc::new(ViewInner {
                name,
                depth,
                parent: Some(parent.clone()),
                base: None,
                local: RwLock::new(Layer::new()),
                tracker: Arc::clone(&parent.inner.tracker),
            }),
        }
    }

    /// Shorthand for [`from_parent(self, Some(name))`](Self::from_parent).
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self::from_parent(self, Some(name))
    }

    /// Non-owning handle to this view.
    pub(crate) fn downgrade(&self) -> WeakView {
        WeakView(Arc::downgrade(&self.inner))
    }

    /// The wrapped source dictionary; `None` on non-root views.
    #[must_use]
    pub fn base(&self) -> Option<&Arc<ConfigMap>> {
        self.inner.base.as_ref()
    }

    // -----------------------------------------------------------------------
    // Hierarchy
    // -----------------------------------------------------------------------

    /// Diagnostic label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of ancestors; `0` for a root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.depth
    }

    /// Returns `true` if this view wraps a source directly.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// The parent view, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.inner.parent.as_ref()
    }

    /// The root of this view's tree.
    #[must_use]
    pub fn root(&self) -> &Self {
        self.lineage().last().unwrap_or(self)
    }

    /// Names from this view up to the root.
    #[must_use]
    pub fn hierarchy(&self) -> Vec<String> {
        self.lineage().map(|v| v.inner.name.clone()).collect()
    }

    /// Returns `true` if both handles refer to the same view.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The tracker shared by the whole tree.
    #[must_use]
    pub fn tracker(&self) -> &Arc<MutationTracker> {
        &self.inner.tracker
    }

    /// This view followed by each ancestor, root last.
    fn lineage(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(Some(self), |v| v.inner.parent.as_ref())
    }

    // -----------------------------------------------------------------------
    // Layer access
    // -----------------------------------------------------------------------

    fn read_local(&self) -> RwLockReadGuard<'_, Layer> {
        self.inner
            .local
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_local(&self) -> RwLockWriteGuard<'_, Layer> {
        self.inner
            .local
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Look `key` up in this view's own storage: its local layer, then its
    /// base if it is a root.
    ///
    /// Breaks with the answer if this view decides the key (found or
    /// deleted), continues if resolution has to move on to the parent.
    fn lookup_own(&self, key: &str) -> ControlFlow<Option<Shared>> {
        match self.read_local().get(key) {
            Some(Slot::Value(v)) => {
                return ControlFlow::Break(Some(Shared::Layer(Arc::clone(v))));
            }
            Some(Slot::Deleted) => return ControlFlow::Break(None),
            None => {}
        }
        match self.lookup_base(key) {
            Some(shared) => ControlFlow::Break(Some(shared)),
            None => ControlFlow::Continue(()),
        }
    }

    fn lookup_base(&self, key: &str) -> Option<Shared> {
        let base = self.inner.base.as_ref()?;
        base.contains_key(key).then(|| Shared::Base {
            map: Arc::clone(base),
            key: key.to_string(),
        })
    }

    /// Resolve `key` without touching this view's local layer.
    ///
    /// Safe to call while holding this view's write lock: locks are only
    /// ever taken child first, ancestor second.
    fn resolve_inherited(&self, key: &str) -> Option<Shared> {
        match &self.inner.parent {
            Some(parent) => parent
                .lineage()
                .find_map(|v| match v.lookup_own(key) {
                    ControlFlow::Break(found) => Some(found),
                    ControlFlow::Continue(()) => None,
                })
                .flatten(),
            None => self.lookup_base(key),
        }
    }

    /// Resolve `key` through the local layer and then the ancestor chain.
    ///
    /// The flag is `true` when the value came from this view's local layer.
    pub(crate) fn resolve(&self, key: &str) -> Option<(Shared, bool)> {
        match self.read_local().get(key) {
            Some(Slot::Value(v)) => return Some((Shared::Layer(Arc::clone(v)), true)),
            Some(Slot::Deleted) => return None,
            None => {}
        }
        self.resolve_inherited(key).map(|s| (s, false))
    }

    /// Copy `source` into the local layer under `key`, unless the local layer
    /// already holds that key, in which case the local value wins.
    pub(crate) fn copy_into_local(&self, key: &str, source: &Value) {
        let mut local = self.write_local();
        if let Some(Slot::Value(_)) = local.get(key) {
            return;
        }
        tracing::trace!("copy-on-write: '{key}' copied into view '{}'", self.inner.name);
        local.insert(key.to_string(), Slot::Value(Arc::new(source.clone())));
    }

    /// Apply `edit` to the local value of `key` and record the mutation.
    ///
    /// The edit runs under the write lock, which is not re-entrant: `edit`
    /// must not touch this view. A failing edit records nothing.
    pub(crate) fn edit_local<R>(
        &self,
        key: &str,
        site: CallSite,
        edit: impl FnOnce(&mut Value) -> Result<R, OptsError>,
    ) -> Result<R, OptsError> {
        let tracker = &self.inner.tracker;
        let mut local = self.write_local();
        let Some(Slot::Value(slot)) = local.get_mut(key) else {
            return Err(OptsError::MissingKey(key.to_string()));
        };
        let before = tracker.is_enabled().then(|| Value::clone(&**slot));
        let result = edit(Arc::make_mut(slot))?;
        tracker.record(key, before.as_ref(), &**slot, site, &self.inner.name);
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Mapping interface
    // -----------------------------------------------------------------------

    /// Look `key` up through the local layer, the ancestors, and the root
    /// base.
    ///
    /// Nested objects and arrays come back behind a proxy bound to this view,
    /// so in-place edits copy them into this view first.
    ///
    /// # Errors
    ///
    /// Returns [`OptsError::MissingKey`] if the key resolves nowhere.
    pub fn get(&self, key: &str) -> Result<Entry, OptsError> {
        self.try_get(key)
            .ok_or_else(|| OptsError::MissingKey(key.to_string()))
    }

    /// Like [`get`](Self::get) but returns `None` for missing keys.
    #[must_use]
    pub fn try_get(&self, key: &str) -> Option<Entry> {
        let (shared, owned) = self.resolve(key)?;
        let target = if owned {
            Target::Owned
        } else {
            Target::Alias(shared.clone())
        };
        Some(match shared.value() {
            Value::Object(_) => Entry::Map(DictProxy::new(self.clone(), key, target)),
            Value::Array(_) => Entry::List(ListProxy::new(self.clone(), key, target)),
            scalar => Entry::Scalar(scalar.clone()),
        })
    }

    /// Like [`get`](Self::get) but falls back to `default`.
    #[must_use]
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Entry {
        self.try_get(key)
            .unwrap_or_else(|| Entry::Scalar(default.into()))
    }

    /// Plain copy of the value `key` resolves to.
    ///
    /// # Errors
    ///
    /// Returns [`OptsError::MissingKey`] if the key resolves nowhere.
    pub fn get_value(&self, key: &str) -> Result<Value, OptsError> {
        self.resolve(key)
            .map(|(shared, _)| shared.value().clone())
            .ok_or_else(|| OptsError::MissingKey(key.to_string()))
    }

    /// Write `value` into this view's local layer.
    ///
    /// Ancestors are never touched. The value is stored as given; nested
    /// structures are not copied. Every write is recorded in the tracker
    /// together with the value the key resolved to beforehand.
    #[track_caller]
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let site = CallSite::caller();
        let key = key.into();
        let value = value.into();
        let tracker = &self.inner.tracker;

        let mut local = self.write_local();
        let previous = match local.get(&key) {
            Some(Slot::Value(v)) => Some(Shared::Layer(Arc::clone(v))),
            Some(Slot::Deleted) => None,
            None => {
                tracing::trace!("view '{}' now shadows '{key}'", self.inner.name);
                self.resolve_inherited(&key)
            }
        };
        tracker.record(
            &key,
            previous.as_ref().map(Shared::value),
            &value,
            site,
            &self.inner.name,
        );
        local.insert(key, Slot::Value(Arc::new(value)));
    }

    /// Apply [`set`](Self::set) for every pair in `other`.
    #[track_caller]
    pub fn update<K, V>(&self, other: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (k, v) in other {
            self.set(k, v);
        }
    }

    /// Remove `key` from this view's local layer.
    ///
    /// Only keys this view wrote itself can be deleted. If an ancestor still
    /// provides the key, a deletion marker keeps it hidden from this view and
    /// its descendants until the next [`set`](Self::set).
    ///
    /// # Errors
    ///
    /// Returns [`OptsError::NotLocal`] if the key is only visible through an
    /// ancestor, or [`OptsError::MissingKey`] if it is not visible at all.
    /// Nothing changes on error.
    pub fn delete(&self, key: &str) -> Result<(), OptsError> {
        let mut local = self.write_local();
        let written = local.get(key).map(|slot| slot.value().is_some());
        match written {
            Some(true) => {
                if self.resolve_inherited(key).is_some() {
                    local.insert(key.to_string(), Slot::Deleted);
                } else {
                    local.remove(key);
                }
                tracing::trace!("view '{}' deleted local '{key}'", self.inner.name);
                Ok(())
            }
            Some(false) => Err(OptsError::MissingKey(key.to_string())),
            None if self.resolve_inherited(key).is_some() => {
                Err(OptsError::NotLocal(key.to_string()))
            }
            None => Err(OptsError::MissingKey(key.to_string())),
        }
    }

    /// Returns `true` if `key` resolves anywhere in the chain.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.resolve(key).is_some()
    }

    /// Every visible key, sorted.
    #[must_use]
    pub fn keys(&self) -> BTreeSet<String> {
        let mut decided = BTreeSet::new();
        let mut keys = BTreeSet::new();
        for view in self.lineage() {
            for (k, slot) in view.read_local().iter() {
                if decided.insert(k.clone()) && slot.value().is_some() {
                    keys.insert(k.clone());
                }
            }
            if let Some(base) = &view.inner.base {
                keys.extend(base.keys().filter(|k| !decided.contains(*k)).cloned());
            }
        }
        keys
    }

    /// Entries for every visible key, in key order.
    #[must_use]
    pub fn values(&self) -> Vec<Entry> {
        self.items().into_iter().map(|(_, e)| e).collect()
    }

    /// Key/entry pairs for every visible key, in key order.
    #[must_use]
    pub fn items(&self) -> Vec<(String, Entry)> {
        self.keys()
            .into_iter()
            .filter_map(|k| self.try_get(&k).map(|e| (k, e)))
            .collect()
    }

    /// Number of visible keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Returns `true` when no key is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Keys written directly on this view.
    #[must_use]
    pub fn get_local_keys(&self) -> BTreeSet<String> {
        self.read_local()
            .iter()
            .filter(|(_, slot)| slot.value().is_some())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Keys visible only through an ancestor or the root base.
    #[must_use]
    pub fn get_shared_keys(&self) -> BTreeSet<String> {
        let local = self.get_local_keys();
        self.keys()
            .into_iter()
            .filter(|k| !local.contains(k))
            .collect()
    }

    /// Plain snapshot of every visible key.
    ///
    /// The result shares nothing with the tree.
    #[must_use]
    pub fn to_dict(&self) -> ConfigMap {
        self.keys()
            .into_iter()
            .filter_map(|k| {
                let value = self.resolve(&k)?.0.value().clone();
                Some((k, value))
            })
            .collect()
    }

    /// Alias of [`to_dict`](Self::to_dict).
    #[must_use]
    pub fn copy(&self) -> ConfigMap {
        self.to_dict()
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    /// Mutation report of the shared tracker.
    #[must_use]
    pub fn get_mutation_report(&self, verbose: bool) -> MutationReport {
        self.inner.tracker.get_mutation_report(verbose)
    }

    /// Hotspot keys of the shared tracker.
    #[must_use]
    pub fn get_hotspot_keys(&self, min_mutations: usize) -> Vec<(String, usize)> {
        self.inner.tracker.get_hotspot_keys(min_mutations)
    }

    /// Key counts and an estimate of the bytes held locally.
    #[must_use]
    pub fn get_memory_stats(&self) -> MemoryStats {
        let (written, local_bytes) = {
            let local = self.read_local();
            let mut written = BTreeSet::new();
            let mut bytes = 0;
            for (k, v) in local.iter().filter_map(|(k, slot)| slot.value().map(|v| (k, v))) {
                bytes += size_of::<String>() + k.capacity() + estimate_size(v);
                written.insert(k.clone());
            }
            (written, bytes)
        };
        // Writers may run between the two reads; only count local keys that
        // are still visible so the split always adds up.
        let visible = self.keys();
        let total_keys = visible.len();
        let local_keys = visible.intersection(&written).count();
        MemoryStats {
            local_keys,
            shared_keys: total_keys - local_keys,
            total_keys,
            local_bytes,
        }
    }
}

impl fmt::Debug for OptsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptsView")
            .field("name", &self.inner.name)
            .field("depth", &self.inner.depth)
            .field("local_keys", &self.get_local_keys())
            .field("tracking", &self.inner.tracker.is_enabled())
            .finish_non_exhaustive()
    }
}

impl Serialize for OptsView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_dict().serialize(serializer)
    }
}

impl From<&OptsView> for ConfigMap {
    fn from(view: &OptsView) -> Self {
        view.to_dict()
    }
}
