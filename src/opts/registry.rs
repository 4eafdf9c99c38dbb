//! Source-to-root registry.
//!
//! Wrapping the same source dictionary twice must yield siblings under one
//! root rather than two unrelated trees. The registry remembers which root
//! was built for which source. It holds weak references only, so an entry
//! lapses once every view over its source has been dropped.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::value::ConfigMap;
use super::view::{OptsView, WeakView};

/// One registered source.
#[derive(Debug)]
struct RegistryEntry {
    /// Guards against a recycled address being mistaken for the source.
    source: Weak<ConfigMap>,
    root: WeakView,
}

impl RegistryEntry {
    /// The live root, if it still wraps `source`.
    fn live_root(&self, source: &Arc<ConfigMap>) -> Option<OptsView> {
        let registered = self.source.upgrade()?;
        if !Arc::ptr_eq(&registered, source) {
            return None;
        }
        self.root.upgrade()
    }

    fn is_dead(&self) -> bool {
        self.source.strong_count() == 0 || self.root.upgrade().is_none()
    }
}

/// Maps source dictionaries to the root view wrapping them.
///
/// Create one per process at the composition root and hand it to whatever
/// needs to wrap configuration; call [`clear`](Self::clear) on shutdown.
#[derive(Debug)]
pub struct RootRegistry {
    track_mutations: bool,
    entries: Mutex<HashMap<usize, RegistryEntry>>,
}

impl Default for RootRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RootRegistry {
    /// Create an empty registry whose roots track mutations if
    /// `track_mutations` is set.
    #[must_use]
    pub fn new(track_mutations: bool) -> Self {
        Self {
            track_mutations,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<usize, RegistryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Identity of a source: the address of its allocation.
    fn identity(source: &Arc<ConfigMap>) -> usize {
        Arc::as_ptr(source).addr()
    }

    /// Return a fresh child view of the root wrapping `source`, creating and
    /// registering that root on first use.
    ///
    /// Every call returns a new child, so two calls on the same source give
    /// two siblings that both see writes made on the shared root.
    #[must_use]
    pub fn safe_wrap(&self, source: &Arc<ConfigMap>, name: Option<&str>) -> OptsView {
        let root = self.root_or_insert(source);
        OptsView::from_parent(&root, name)
    }

    fn root_or_insert(&self, source: &Arc<ConfigMap>) -> OptsView {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_dead());
        let purged = before - entries.len();
        if purged > 0 {
            tracing::debug!("registry purged {purged} stale root(s)");
        }

        let id = Self::identity(source);
        if let Some(root) = entries.get(&id).and_then(|e| e.live_root(source)) {
            tracing::debug!("registry hit: reusing root '{}'", root.name());
            return root;
        }

        let root = OptsView::from_dict(Arc::clone(source), self.track_mutations, Some("root"));
        tracing::debug!("registry miss: registered new root over {} keys", source.len());
        entries.insert(
            id,
            RegistryEntry {
                source: Arc::downgrade(source),
                root: root.downgrade(),
            },
        );
        root
    }

    /// The live root registered for `source`, if any.
    #[must_use]
    pub fn root_for(&self, source: &Arc<ConfigMap>) -> Option<OptsView> {
        self.lock()
            .get(&Self::identity(source))
            .and_then(|e| e.live_root(source))
    }

    /// Number of registered sources whose root is still alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().values().filter(|e| !e.is_dead()).count()
    }

    /// Returns `true` if no live root is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every entry. Views already handed out keep working.
    pub fn clear(&self) {
        let mut entries = self.lock();
        tracing::debug!("registry cleared ({} entries)", entries.len());
        entries.clear();
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(v: &serde_json::Value) -> Arc<ConfigMap> {
        Arc::new(v.as_object().cloned().expect("object"))
    }

    #[test]
    fn wrapping_twice_yields_siblings() {
        let registry = RootRegistry::default();
        let src = source(&json!({"test": false, "grains": {"os": "Linux"}}));
        let a = registry.safe_wrap(&src, Some("a"));
        let b = registry.safe_wrap(&src, Some("b"));

        assert_eq!(a.name(), "a");
        assert_eq!(b.name(), "b");
        assert!(a.root().ptr_eq(b.root()));
        assert!(a.root().base().is_some_and(|base| Arc::ptr_eq(base, &src)));

        a.root().set("test", true);
        assert_eq!(a.get("test").unwrap(), json!(true));
        assert_eq!(b.get("test").unwrap(), json!(true));
    }

    #[test]
    fn siblings_stay_isolated_from_each_other() {
        let registry = RootRegistry::default();
        let src = source(&json!({"test": false}));
        let a = registry.safe_wrap(&src, Some("a"));
        let b = registry.safe_wrap(&src, Some("b"));
        a.set("test", true);
        assert_eq!(b.get("test").unwrap(), json!(false));
    }

    #[test]
    fn equal_but_distinct_sources_get_separate_roots() {
        let registry = RootRegistry::default();
        let first = source(&json!({"k": 1}));
        let second = source(&json!({"k": 1}));
        let a = registry.safe_wrap(&first, None);
        let b = registry.safe_wrap(&second, None);
        assert!(!a.root().ptr_eq(b.root()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn entry_lapses_when_views_are_dropped() {
        let registry = RootRegistry::default();
        let src = source(&json!({"k": 1}));
        let view = registry.safe_wrap(&src, None);
        assert_eq!(registry.len(), 1);
        assert!(registry.root_for(&src).is_some());

        drop(view);
        assert!(registry.root_for(&src).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn new_root_after_lapse() {
        let registry = RootRegistry::default();
        let src = source(&json!({"k": 1}));
        let first = registry.safe_wrap(&src, None);
        first.root().set("k", 2);
        drop(first);

        let second = registry.safe_wrap(&src, None);
        assert_eq!(second.get("k").unwrap(), json!(1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_does_not_keep_source_alive() {
        let registry = RootRegistry::default();
        let src = source(&json!({"k": 1}));
        let weak = Arc::downgrade(&src);
        let view = registry.safe_wrap(&src, None);
        drop(src);
        assert!(weak.upgrade().is_some(), "root still holds the source");
        drop(view);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn clear_forgets_roots_but_views_survive() {
        let registry = RootRegistry::default();
        let src = source(&json!({"k": 1}));
        let a = registry.safe_wrap(&src, None);
        registry.clear();
        assert!(registry.is_empty());

        let b = registry.safe_wrap(&src, None);
        assert!(!a.root().ptr_eq(b.root()));
        assert_eq!(a.get("k").unwrap(), json!(1));
    }

    #[test]
    fn tracking_flag_applies_to_new_roots() {
        let registry = RootRegistry::new(false);
        let src = source(&json!({}));
        let view = registry.safe_wrap(&src, None);
        assert!(!view.tracker().is_enabled());
    }
}
