// src/objects/status.rs
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Per-node status of one object.
///
/// The status endpoint keys its entries `"<prefix>/<object>/<node...>"`, each
/// holding `{spec, status}`. Entries for other objects are dropped; the node
/// key is whatever follows the object name, or the raw key when nothing does.
pub fn node_statuses(object_name: &str, raw: Map<String, Value>) -> BTreeMap<String, Value> {
    let mut result = BTreeMap::new();
    for (key, value) in raw {
        let mut parts = key.split('/').skip(1);
        if parts.next() != Some(object_name) {
            continue;
        }
        let node = parts.collect::<Vec<_>>().join("/");
        let node = if node.is_empty() { key.clone() } else { node };
        let status = match value {
            Value::Object(mut entry) => entry.remove("status").unwrap_or(Value::Null),
            _ => Value::Null,
        };
        result.insert(node, status);
    }
    result
}
