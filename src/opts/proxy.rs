//! Copy-on-write proxies for nested objects and arrays.
//!
//! A proxy is what [`OptsView::get`] hands out when a key resolves to an
//! object or array. Until the first in-place edit it only aliases the
//! ancestor's storage; the edit copies the whole top-level value into the
//! owning view's local layer and then applies itself to that copy. Ancestors
//! never observe the edit.
//!
//! Reading a nested object or array through a proxy fires the copy as well
//! and returns a proxy for that element, addressed by path under the same
//! owner and key. Edits at any depth therefore land in the owner's copy.
use std::fmt;

use serde::{Serialize, Serializer};

use super::tracker::CallSite;
use super::value::{
    ConfigMap, NULL, Segment, Shared, Value, describe_path, kind_name, walk, walk_mut,
};
use super::view::OptsView;
use crate::error::OptsError;

/// Where a proxy currently reads from.
#[derive(Debug, Clone)]
pub(crate) enum Target {
    /// Someone else's storage; nothing has been copied yet.
    Alias(Shared),
    /// The owner's local layer.
    Owned,
}

/// Shape of an element found while indexing.
enum Probe {
    Scalar(Value),
    Object,
    Array,
}

impl Probe {
    fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Array,
            scalar => Self::Scalar(scalar.clone()),
        }
    }
}

/// Bookkeeping shared by both proxy shapes.
///
/// Kept apart from the proxied data: the proxy never stores the value
/// itself, only how to reach it.
#[derive(Debug, Clone)]
struct ProxyCore {
    owner: OptsView,
    key: String,
    path: Vec<Segment>,
    target: Target,
}

impl ProxyCore {
    fn label(&self) -> String {
        describe_path(&self.key, &self.path)
    }

    const fn is_copied(&self) -> bool {
        matches!(self.target, Target::Owned)
    }

    /// Run `f` on the current target without copying anything.
    fn read<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        match &self.target {
            Target::Alias(shared) => f(walk(shared.value(), &self.path).unwrap_or(&NULL)),
            Target::Owned => {
                let resolved = self.owner.resolve(&self.key);
                let top = resolved.as_ref().map_or(&NULL, |(shared, _)| shared.value());
                f(walk(top, &self.path).unwrap_or(&NULL))
            }
        }
    }

    fn mismatch(&self, expected: &'static str, found: &Value) -> OptsError {
        OptsError::TypeMismatch {
            key: self.label(),
            expected,
            found: kind_name(found),
        }
    }

    fn read_object<R>(&self, f: impl FnOnce(&ConfigMap) -> R) -> Result<R, OptsError> {
        self.read(|v| match v {
            Value::Object(map) => Ok(f(map)),
            other => Err(self.mismatch("object", other)),
        })
    }

    fn read_array<R>(&self, f: impl FnOnce(&Vec<Value>) -> R) -> Result<R, OptsError> {
        self.read(|v| match v {
            Value::Array(items) => Ok(f(items)),
            other => Err(self.mismatch("array", other)),
        })
    }

    /// Copy the aliased value into the owner, once.
    fn ensure_copied(&mut self) {
        if let Target::Alias(shared) = &self.target {
            self.owner.copy_into_local(&self.key, shared.value());
            self.target = Target::Owned;
        }
    }

    /// Copy if needed, then edit the owned target in place.
    fn edit<R>(
        &mut self,
        site: CallSite,
        f: impl FnOnce(&mut Value) -> Result<R, OptsError>,
    ) -> Result<R, OptsError> {
        self.ensure_copied();
        let label = self.label();
        let path = &self.path;
        self.owner.edit_local(&self.key, site, |top| {
            let target = walk_mut(top, path).ok_or(OptsError::MissingKey(label))?;
            f(target)
        })
    }

    /// Copy if needed, run `f` on a draft of the target with no lock held,
    /// then store the draft. `f` may read or write the owning view.
    fn edit_detached<R>(
        &mut self,
        site: CallSite,
        f: impl FnOnce(&mut Value) -> Result<R, OptsError>,
    ) -> Result<R, OptsError> {
        self.ensure_copied();
        let mut draft = self.read(Value::clone);
        let result = f(&mut draft)?;
        self.edit(site, |target| {
            *target = draft;
            Ok(result)
        })
    }

    fn edit_object<R>(
        &mut self,
        site: CallSite,
        f: impl FnOnce(&mut ConfigMap) -> R,
    ) -> Result<R, OptsError> {
        let label = self.label();
        self.edit(site, |v| match v {
            Value::Object(map) => Ok(f(map)),
            other => Err(OptsError::TypeMismatch {
                key: label,
                expected: "object",
                found: kind_name(other),
            }),
        })
    }

    fn edit_array<R>(
        &mut self,
        site: CallSite,
        f: impl FnOnce(&mut Vec<Value>) -> Result<R, OptsError>,
    ) -> Result<R, OptsError> {
        let label = self.label();
        self.edit(site, |v| match v {
            Value::Array(items) => f(items),
            other => Err(OptsError::TypeMismatch {
                key: label,
                expected: "array",
                found: kind_name(other),
            }),
        })
    }

    /// Turn an indexed element into an entry; nested elements fire the copy.
    fn entry_for(&mut self, probe: Probe, segment: Segment) -> Entry {
        match probe {
            Probe::Scalar(v) => Entry::Scalar(v),
            Probe::Object => {
                self.ensure_copied();
                Entry::Map(DictProxy {
                    core: self.child(segment),
                })
            }
            Probe::Array => {
                self.ensure_copied();
                Entry::List(ListProxy {
                    core: self.child(segment),
                })
            }
        }
    }

    fn child(&self, segment: Segment) -> Self {
        let mut path = self.path.clone();
        path.push(segment);
        Self {
            owner: self.owner.clone(),
            key: self.key.clone(),
            path,
            target: self.target.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// DictProxy
// ---------------------------------------------------------------------------

/// Proxy for a nested object.
#[derive(Debug, Clone)]
pub struct DictProxy {
    core: ProxyCore,
}

impl DictProxy {
    pub(crate) fn new(owner: OptsView, key: &str, target: Target) -> Self {
        Self {
            core: ProxyCore {
                owner,
                key: key.to_string(),
                path: Vec::new(),
                target,
            },
        }
    }

    /// Top-level key this proxy lives under in its owner.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.core.key
    }

    /// Path from the top-level value to this proxy's target.
    #[must_use]
    pub fn path(&self) -> &[Segment] {
        &self.core.path
    }

    /// The view that receives the copy on first edit.
    #[must_use]
    pub const fn owner(&self) -> &OptsView {
        &self.core.owner
    }

    /// Whether the copy-on-write trigger has fired for this proxy.
    #[must_use]
    pub const fn is_copied(&self) -> bool {
        self.core.is_copied()
    }

    /// Index into the object.
    ///
    /// Scalars are returned by value. A nested object or array first copies
    /// this proxy's value into the owner and is then returned as a proxy.
    ///
    /// # Errors
    ///
    /// [`OptsError::MissingKey`] if `key` is absent, or
    /// [`OptsError::TypeMismatch`] if the target is no longer an object.
    pub fn get(&mut self, key: &str) -> Result<Entry, OptsError> {
        let probe = self
            .core
            .read_object(|map| map.get(key).map(Probe::of))?
            .ok_or_else(|| OptsError::MissingKey(key.to_string()))?;
        Ok(self.core.entry_for(probe, Segment::Key(key.to_string())))
    }

    /// Plain copy of the value under `key`, without firing the copy trigger.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.core
            .read_object(|map| map.get(key).cloned())
            .ok()
            .flatten()
    }

    /// Like [`get_value`](Self::get_value) with a fallback.
    #[must_use]
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get_value(key).unwrap_or_else(|| default.into())
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.core
            .read_object(|map| map.contains_key(key))
            .unwrap_or(false)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.read_object(ConfigMap::len).unwrap_or(0)
    }

    /// Returns `true` if there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Member names.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.core
            .read_object(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Plain copies of the member values.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.core
            .read_object(|map| map.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Plain copies of the members.
    #[must_use]
    pub fn items(&self) -> Vec<(String, Value)> {
        self.core
            .read_object(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Deep copy of the target as a plain value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.core.read(Value::clone)
    }

    /// Set `key` to `value`, returning the previous value.
    ///
    /// # Errors
    ///
    /// [`OptsError::TypeMismatch`] if the target is no longer an object.
    #[track_caller]
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, OptsError> {
        let site = CallSite::caller();
        let (key, value) = (key.into(), value.into());
        self.core.read_object(|_| ())?;
        self.core.edit_object(site, |map| map.insert(key, value))
    }

    /// Remove `key`.
    ///
    /// # Errors
    ///
    /// [`OptsError::MissingKey`] if `key` is absent; nothing is copied.
    #[track_caller]
    pub fn delete(&mut self, key: &str) -> Result<(), OptsError> {
        self.pop_inner(CallSite::caller(), key).map(drop)
    }

    /// Remove `key` and return its value.
    ///
    /// # Errors
    ///
    /// [`OptsError::MissingKey`] if `key` is absent; nothing is copied.
    #[track_caller]
    pub fn pop(&mut self, key: &str) -> Result<Value, OptsError> {
        self.pop_inner(CallSite::caller(), key)
    }

    fn pop_inner(&mut self, site: CallSite, key: &str) -> Result<Value, OptsError> {
        if !self.core.read_object(|map| map.contains_key(key))? {
            return Err(OptsError::MissingKey(key.to_string()));
        }
        self.core
            .edit_object(site, |map| map.remove(key))?
            .ok_or_else(|| OptsError::MissingKey(key.to_string()))
    }

    /// Remove `key` and return its value, or `default` if it is absent.
    ///
    /// # Errors
    ///
    /// [`OptsError::TypeMismatch`] if the target is no longer an object.
    #[track_caller]
    pub fn pop_or(&mut self, key: &str, default: impl Into<Value>) -> Result<Value, OptsError> {
        let site = CallSite::caller();
        self.core.read_object(|_| ())?;
        let removed = self.core.edit_object(site, |map| map.remove(key))?;
        Ok(removed.unwrap_or_else(|| default.into()))
    }

    /// Insert every pair of `other`.
    ///
    /// # Errors
    ///
    /// [`OptsError::TypeMismatch`] if the target is no longer an object.
    #[track_caller]
    pub fn update<K, V>(&mut self, other: impl IntoIterator<Item = (K, V)>) -> Result<(), OptsError>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let site = CallSite::caller();
        let pairs: Vec<(String, Value)> =
            other.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.core.read_object(|_| ())?;
        self.core.edit_object(site, |map| map.extend(pairs))
    }

    /// Return the value under `key`, inserting `default` first if absent.
    ///
    /// # Errors
    ///
    /// [`OptsError::TypeMismatch`] if the target is no longer an object.
    #[track_caller]
    pub fn setdefault(
        &mut self,
        key: impl Into<String>,
        default: impl Into<Value>,
    ) -> Result<Value, OptsError> {
        let site = CallSite::caller();
        let key = key.into();
        let default = default.into();
        self.core.read_object(|_| ())?;
        self.core
            .edit_object(site, |map| map.entry(key).or_insert(default).clone())
    }

    /// Remove every member.
    ///
    /// # Errors
    ///
    /// [`OptsError::TypeMismatch`] if the target is no longer an object.
    #[track_caller]
    pub fn clear(&mut self) -> Result<(), OptsError> {
        let site = CallSite::caller();
        self.core.read_object(|_| ())?;
        self.core.edit_object(site, ConfigMap::clear)
    }

    /// Fire the copy trigger, let `f` edit a draft of the target, then store
    /// the draft.
    ///
    /// `f` runs without any lock held, so it may use the owning view. When
    /// `f` fails nothing is stored.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `f`.
    #[track_caller]
    pub fn with_mut<R>(
        &mut self,
        f: impl FnOnce(&mut Value) -> Result<R, OptsError>,
    ) -> Result<R, OptsError> {
        self.core.edit_detached(CallSite::caller(), f)
    }
}

// ---------------------------------------------------------------------------
// ListProxy
// ---------------------------------------------------------------------------

/// Proxy for a nested array.
#[derive(Debug, Clone)]
pub struct ListProxy {
    core: ProxyCore,
}

impl ListProxy {
    pub(crate) fn new(owner: OptsView, key: &str, target: Target) -> Self {
        Self {
            core: ProxyCore {
                owner,
                key: key.to_string(),
                path: Vec::new(),
                target,
            },
        }
    }

    /// Top-level key this proxy lives under in its owner.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.core.key
    }

    /// Path from the top-level value to this proxy's target.
    #[must_use]
    pub fn path(&self) -> &[Segment] {
        &self.core.path
    }

    /// The view that receives the copy on first edit.
    #[must_use]
    pub const fn owner(&self) -> &OptsView {
        &self.core.owner
    }

    /// Whether the copy-on-write trigger has fired for this proxy.
    #[must_use]
    pub const fn is_copied(&self) -> bool {
        self.core.is_copied()
    }

    fn out_of_range(index: usize, len: usize) -> OptsError {
        OptsError::IndexOutOfRange { index, len }
    }

    /// Index into the array.
    ///
    /// Scalars are returned by value. A nested object or array first copies
    /// this proxy's value into the owner and is then returned as a proxy.
    ///
    /// # Errors
    ///
    /// [`OptsError::IndexOutOfRange`] or [`OptsError::TypeMismatch`].
    pub fn get(&mut self, index: usize) -> Result<Entry, OptsError> {
        let probe = self.core.read_array(|items| {
            items
                .get(index)
                .map(Probe::of)
                .ok_or_else(|| Self::out_of_range(index, items.len()))
        })??;
        Ok(self.core.entry_for(probe, Segment::Index(index)))
    }

    /// Plain copy of the element at `index`, without firing the copy trigger.
    #[must_use]
    pub fn get_value(&self, index: usize) -> Option<Value> {
        self.core
            .read_array(|items| items.get(index).cloned())
            .ok()
            .flatten()
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.read_array(Vec::len).unwrap_or(0)
    }

    /// Returns `true` if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if an element equals `value`.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.core
            .read_array(|items| items.contains(value))
            .unwrap_or(false)
    }

    /// Plain copies of the elements.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.core.read_array(Vec::clone).unwrap_or_default()
    }

    /// Deep copy of the target as a plain value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.core.read(Value::clone)
    }

    /// Append `value`.
    ///
    /// # Errors
    ///
    /// [`OptsError::TypeMismatch`] if the target is no longer an array.
    #[track_caller]
    pub fn push(&mut self, value: impl Into<Value>) -> Result<(), OptsError> {
        let site = CallSite::caller();
        let value = value.into();
        self.core.read_array(|_| ())?;
        self.core.edit_array(site, |items| {
            items.push(value);
            Ok(())
        })
    }

    /// Append every value of `values`.
    ///
    /// # Errors
    ///
    /// [`OptsError::TypeMismatch`] if the target is no longer an array.
    #[track_caller]
    pub fn extend<V: Into<Value>>(
        &mut self,
        values: impl IntoIterator<Item = V>,
    ) -> Result<(), OptsError> {
        let site = CallSite::caller();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.core.read_array(|_| ())?;
        self.core.edit_array(site, |items| {
            items.extend(values);
            Ok(())
        })
    }

    /// Insert `value` before `index`; an index past the end appends.
    ///
    /// # Errors
    ///
    /// [`OptsError::TypeMismatch`] if the target is no longer an array.
    #[track_caller]
    pub fn insert(&mut self, index: usize, value: impl Into<Value>) -> Result<(), OptsError> {
        let site = CallSite::caller();
        let value = value.into();
        self.core.read_array(|_| ())?;
        self.core.edit_array(site, |items| {
            items.insert(index.min(items.len()), value);
            Ok(())
        })
    }

    /// Remove the first element equal to `value`.
    ///
    /// # Errors
    ///
    /// [`OptsError::ValueNotFound`] if no element matches; nothing is copied.
    #[track_caller]
    pub fn remove(&mut self, value: &Value) -> Result<(), OptsError> {
        let site = CallSite::caller();
        if !self.core.read_array(|items| items.contains(value))? {
            return Err(OptsError::ValueNotFound(value.to_string()));
        }
        self.core.edit_array(site, |items| {
            let pos = items
                .iter()
                .position(|v| v == value)
                .ok_or_else(|| OptsError::ValueNotFound(value.to_string()))?;
            items.remove(pos);
            Ok(())
        })
    }

    /// Remove and return the last element.
    ///
    /// # Errors
    ///
    /// [`OptsError::IndexOutOfRange`] if the array is empty; nothing is copied.
    #[track_caller]
    pub fn pop(&mut self) -> Result<Value, OptsError> {
        let site = CallSite::caller();
        if self.core.read_array(Vec::is_empty)? {
            return Err(Self::out_of_range(0, 0));
        }
        self.core
            .edit_array(site, |items| items.pop().ok_or_else(|| Self::out_of_range(0, 0)))
    }

    /// Remove and return the element at `index`.
    ///
    /// # Errors
    ///
    /// [`OptsError::IndexOutOfRange`]; nothing is copied.
    #[track_caller]
    pub fn pop_at(&mut self, index: usize) -> Result<Value, OptsError> {
        self.remove_at(CallSite::caller(), index)
    }

    /// Delete the element at `index`.
    ///
    /// # Errors
    ///
    /// [`OptsError::IndexOutOfRange`]; nothing is copied.
    #[track_caller]
    pub fn delete(&mut self, index: usize) -> Result<(), OptsError> {
        self.remove_at(CallSite::caller(), index).map(drop)
    }

    fn remove_at(&mut self, site: CallSite, index: usize) -> Result<Value, OptsError> {
        let len = self.core.read_array(Vec::len)?;
        if index >= len {
            return Err(Self::out_of_range(index, len));
        }
        self.core.edit_array(site, |items| {
            if index >= items.len() {
                return Err(Self::out_of_range(index, items.len()));
            }
            Ok(items.remove(index))
        })
    }

    /// Replace the element at `index`, returning the previous one.
    ///
    /// # Errors
    ///
    /// [`OptsError::IndexOutOfRange`]; nothing is copied.
    #[track_caller]
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Result<Value, OptsError> {
        let site = CallSite::caller();
        let value = value.into();
        let len = self.core.read_array(Vec::len)?;
        if index >= len {
            return Err(Self::out_of_range(index, len));
        }
        self.core.edit_array(site, |items| {
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or_else(|| Self::out_of_range(index, len))?;
            Ok(std::mem::replace(slot, value))
        })
    }

    /// Remove every element.
    ///
    /// # Errors
    ///
    /// [`OptsError::TypeMismatch`] if the target is no longer an array.
    #[track_caller]
    pub fn clear(&mut self) -> Result<(), OptsError> {
        let site = CallSite::caller();
        self.core.read_array(|_| ())?;
        self.core.edit_array(site, |items| {
            items.clear();
            Ok(())
        })
    }

    /// Fire the copy trigger, let `f` edit a draft of the target, then store
    /// the draft.
    ///
    /// `f` runs without any lock held, so it may use the owning view. When
    /// `f` fails nothing is stored.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `f`.
    #[track_caller]
    pub fn with_mut<R>(
        &mut self,
        f: impl FnOnce(&mut Value) -> Result<R, OptsError>,
    ) -> Result<R, OptsError> {
        self.core.edit_detached(CallSite::caller(), f)
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Result of a lookup: a scalar by value, or a proxy for a nested value.
#[derive(Debug, Clone)]
pub enum Entry {
    /// Null, bool, number, or string.
    Scalar(Value),
    /// Nested object.
    Map(DictProxy),
    /// Nested array.
    List(ListProxy),
}

impl Entry {
    /// Plain deep copy of the entry.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Scalar(v) => v.clone(),
            Self::Map(p) => p.to_value(),
            Self::List(p) => p.to_value(),
        }
    }

    /// Consume the entry into a plain value.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Scalar(v) => v,
            other => other.to_value(),
        }
    }

    /// The scalar, if this entry is one.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// The object proxy, if this entry is one.
    #[must_use]
    pub fn into_map(self) -> Option<DictProxy> {
        match self {
            Self::Map(p) => Some(p),
            _ => None,
        }
    }

    /// The array proxy, if this entry is one.
    #[must_use]
    pub fn into_list(self) -> Option<ListProxy> {
        match self {
            Self::List(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable access to the object proxy, if this entry is one.
    pub const fn as_map_mut(&mut self) -> Option<&mut DictProxy> {
        match self {
            Self::Map(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable access to the array proxy, if this entry is one.
    pub const fn as_list_mut(&mut self) -> Option<&mut ListProxy> {
        match self {
            Self::List(p) => Some(p),
            _ => None,
        }
    }

    fn eq_value(&self, other: &Value) -> bool {
        match self {
            Self::Scalar(v) => v == other,
            Self::Map(p) => p.core.read(|v| v == other),
            Self::List(p) => p.core.read(|v| v == other),
        }
    }
}

impl PartialEq<Value> for Entry {
    fn eq(&self, other: &Value) -> bool {
        self.eq_value(other)
    }
}

impl PartialEq<Entry> for Value {
    fn eq(&self, other: &Entry) -> bool {
        other.eq_value(self)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.eq_value(&other.to_value())
    }
}

impl PartialEq<Value> for DictProxy {
    fn eq(&self, other: &Value) -> bool {
        self.core.read(|v| v == other)
    }
}

impl PartialEq<Value> for ListProxy {
    fn eq(&self, other: &Value) -> bool {
        self.core.read(|v| v == other)
    }
}

impl From<Entry> for Value {
    fn from(entry: Entry) -> Self {
        entry.into_value()
    }
}

impl Serialize for DictProxy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.core.read(|v| v.serialize(serializer))
    }
}

impl Serialize for ListProxy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.core.read(|v| v.serialize(serializer))
    }
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(v) => v.serialize(serializer),
            Self::Map(p) => p.serialize(serializer),
            Self::List(p) => p.serialize(serializer),
        }
    }
}

impl fmt::Display for DictProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.read(|v| write!(f, "{v}"))
    }
}

impl fmt::Display for ListProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.read(|v| write!(f, "{v}"))
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{v}"),
            Self::Map(p) => p.fmt(f),
            Self::List(p) => p.fmt(f),
        }
    }
}
