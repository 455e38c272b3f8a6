//! Dot-path lookup into serialized snapshots.

use serde_json::Value;

/// Resolve a dot-separated path such as `pr.labels.0` against a value.
///
/// Object segments match keys; numeric segments index arrays. Returns `None`
/// as soon as a segment does not resolve. An empty path resolves to the
/// root.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }

    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
