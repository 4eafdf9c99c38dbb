//! Value model shared by views, proxies, and the tracker.
use std::fmt;
use std::sync::Arc;

pub use serde_json::Value;

/// A plain configuration dictionary, as supplied by callers and produced by
/// [`OptsView::to_dict`](super::OptsView::to_dict).
pub type ConfigMap = serde_json::Map<String, Value>;

/// Stand-in target for lookups that no longer resolve.
pub(crate) static NULL: Value = Value::Null;

/// One step into a nested value: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object member.
    Key(String),
    /// Array element.
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => write!(f, ".{k}"),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// Render `key` followed by `path`, e.g. `pillar.app[0]`.
pub(crate) fn describe_path(key: &str, path: &[Segment]) -> String {
    let mut out = key.to_string();
    for seg in path {
        out.push_str(&seg.to_string());
    }
    out
}

/// Follow `path` into `value`.
pub(crate) fn walk<'a>(value: &'a Value, path: &[Segment]) -> Option<&'a Value> {
    path.iter().try_fold(value, |cur, seg| match seg {
        Segment::Key(k) => cur.as_object()?.get(k),
        Segment::Index(i) => cur.as_array()?.get(*i),
    })
}

/// Follow `path` into `value`, mutably.
pub(crate) fn walk_mut<'a>(value: &'a mut Value, path: &[Segment]) -> Option<&'a mut Value> {
    path.iter().try_fold(value, |cur, seg| match seg {
        Segment::Key(k) => cur.as_object_mut()?.get_mut(k),
        Segment::Index(i) => cur.as_array_mut()?.get_mut(*i),
    })
}

/// Short type name of a value, used by reports and error messages.
#[must_use]
pub const fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns `true` for values that are handed out behind a proxy.
#[must_use]
pub const fn is_nested(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

/// Rough number of bytes held by `value`, including heap allocations.
///
/// Diagnostic only; the figure ignores allocator overhead and map node
/// layout.
#[must_use]
pub fn estimate_size(value: &Value) -> usize {
    let inline = size_of::<Value>();
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => inline,
        Value::String(s) => inline + s.capacity(),
        Value::Array(items) => inline + items.iter().map(estimate_size).sum::<usize>(),
        Value::Object(map) => {
            inline
                + map
                    .iter()
                    .map(|(k, v)| size_of::<String>() + k.capacity() + estimate_size(v))
                    .sum::<usize>()
        }
    }
}

/// A value that lives in someone else's storage: the root base or an
/// ancestor's local layer.
///
/// Holding a `Shared` never copies the value; it only keeps its container
/// alive.
#[derive(Debug, Clone)]
pub(crate) enum Shared {
    /// Entry of a root's base dictionary.
    Base { map: Arc<ConfigMap>, key: String },
    /// Entry of some view's local layer.
    Layer(Arc<Value>),
}

impl Shared {
    pub(crate) fn value(&self) -> &Value {
        match self {
            Self::Base { map, key } => map.get(key).unwrap_or(&NULL),
            Self::Layer(v) => v,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn walk_follows_keys_and_indices() {
        let v = json!({"a": {"b": [10, {"c": true}]}});
        let path = [
            Segment::Key("a".into()),
            Segment::Key("b".into()),
            Segment::Index(1),
            Segment::Key("c".into()),
        ];
        assert_eq!(walk(&v, &path), Some(&json!(true)));
    }

    #[test]
    fn walk_stops_on_shape_mismatch() {
        let v = json!({"a": 1});
        assert!(walk(&v, &[Segment::Key("a".into()), Segment::Index(0)]).is_none());
    }

    #[test]
    fn walk_mut_edits_in_place() {
        let mut v = json!({"list": [1, 2]});
        let slot = walk_mut(&mut v, &[Segment::Key("list".into()), Segment::Index(0)]).unwrap();
        *slot = json!(5);
        assert_eq!(v, json!({"list": [5, 2]}));
    }

    #[test]
    fn describe_path_renders_segments() {
        let path = [Segment::Key("app".into()), Segment::Index(2)];
        assert_eq!(describe_path("pillar", &path), "pillar.app[2]");
    }

    #[test]
    fn nested_values_are_objects_and_arrays() {
        assert!(is_nested(&json!({})));
        assert!(is_nested(&json!([])));
        assert!(!is_nested(&json!("x")));
        assert!(!is_nested(&Value::Null));
    }

    #[test]
    fn estimate_size_grows_with_content() {
        let small = estimate_size(&json!({"a": 1}));
        let large = estimate_size(&json!({"a": 1, "b": "a much longer string value"}));
        assert!(large > small);
    }

    #[test]
    fn shared_base_reads_without_copying() {
        let mut map = ConfigMap::new();
        map.insert("k".into(), json!([1, 2]));
        let map = Arc::new(map);
        let shared = Shared::Base {
            map: Arc::clone(&map),
            key: "k".into(),
        };
        assert_eq!(shared.value(), &json!([1, 2]));
        assert_eq!(Arc::strong_count(&map), 2);
    }
}
