//! JSON tree edits shared by the store adapters.
//!
//! The database never stores nulls or empty objects, so every edit prunes
//! them on the way back up.

use serde_json::{Map, Value};

/// Split a `/`-separated path into its non-empty segments.
pub(crate) fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Read the subtree at `path`, if any.
pub(crate) fn get_at<'a, S: AsRef<str>>(node: &'a Value, path: &[S]) -> Option<&'a Value> {
    let mut current = node;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get(segment.as_ref())?,
            Value::Array(items) => items.get(segment.as_ref().parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Null => None,
        other => Some(other),
    }
}

/// Replace the subtree at `path` with `data`. A null `data` deletes it.
pub(crate) fn set_at<S: AsRef<str>>(node: &mut Value, path: &[S], data: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = prune(data);
        return;
    };

    match node {
        Value::Object(_) => {}
        Value::Array(items) => *node = array_to_object(std::mem::take(items)),
        _ if data.is_null() => return,
        _ => *node = Value::Object(Map::new()),
    }

    let now_empty = match node {
        Value::Object(map) => {
            let child = map.entry(head.as_ref().to_string()).or_insert(Value::Null);
            set_at(child, rest, data);
            if child.is_null() {
                map.remove(head.as_ref());
            }
            map.is_empty()
        }
        _ => false,
    };

    if now_empty {
        *node = Value::Null;
    }
}

/// Apply each child of `data` at `path`, leaving siblings untouched.
pub(crate) fn merge_at<S: AsRef<str>>(node: &mut Value, path: &[S], data: Value) {
    let Value::Object(children) = data else {
        set_at(node, path, data);
        return;
    };

    for (key, value) in children {
        let mut child_path: Vec<&str> = path.iter().map(|s| s.as_ref()).collect();
        child_path.extend(segments(&key));
        set_at(node, child_path.as_slice(), value);
    }
}

fn array_to_object(items: Vec<Value>) -> Value {
    let map = items
        .into_iter()
        .enumerate()
        .filter(|(_, v)| !v.is_null())
        .map(|(i, v)| (i.to_string(), v))
        .collect();
    Value::Object(map)
}

fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, prune(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if pruned.is_empty() {
                Value::Null
            } else {
                Value::Object(pruned)
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_at_root_replaces_everything() {
        let mut tree = json!({ "a": { "title": "Tacos" } });
        set_at::<&str>(&mut tree, &[], json!({ "b": { "title": "Pizza" } }));
        assert_eq!(tree, json!({ "b": { "title": "Pizza" } }));
    }

    #[test]
    fn test_set_at_creates_and_deletes() {
        let mut tree = Value::Null;
        set_at(&mut tree, &["a"], json!({ "title": "Tacos" }));
        set_at(&mut tree, &["b", "title"], json!("Pizza"));
        assert_eq!(
            tree,
            json!({ "a": { "title": "Tacos" }, "b": { "title": "Pizza" } })
        );

        set_at(&mut tree, &["b", "title"], Value::Null);
        assert_eq!(tree, json!({ "a": { "title": "Tacos" } }));

        set_at(&mut tree, &["a"], Value::Null);
        assert_eq!(tree, Value::Null);
    }

    #[test]
    fn test_set_at_deletes_from_array_shaped_tree() {
        let mut tree = json!([{ "title": "Tacos" }, { "title": "Pizza" }]);
        set_at(&mut tree, &["1"], Value::Null);
        assert_eq!(tree, json!({ "0": { "title": "Tacos" } }));

        let mut sparse = json!([null, { "title": "Soup" }]);
        set_at(&mut sparse, &["1", "cost"], json!("4"));
        assert_eq!(sparse, json!({ "1": { "title": "Soup", "cost": "4" } }));

        let mut scalar = json!("text");
        set_at(&mut scalar, &["a"], Value::Null);
        assert_eq!(scalar, json!("text"));
    }

    #[test]
    fn test_set_at_prunes_null_children() {
        let mut tree = Value::Null;
        set_at(&mut tree, &["a"], json!({ "title": "Soup", "cost": null }));
        assert_eq!(tree, json!({ "a": { "title": "Soup" } }));
    }

    #[test]
    fn test_merge_at_keeps_siblings() {
        let mut tree = json!({ "a": { "title": "Tacos", "cost": "5" } });
        merge_at(&mut tree, &["a"], json!({ "cost": "6", "location": "Lima" }));
        assert_eq!(
            tree,
            json!({ "a": { "title": "Tacos", "cost": "6", "location": "Lima" } })
        );
    }

    #[test]
    fn test_merge_at_with_nested_keys() {
        let mut tree = json!({ "a": { "title": "Tacos" } });
        merge_at::<&str>(&mut tree, &[], json!({ "a/cost": "7", "b": null }));
        assert_eq!(tree, json!({ "a": { "title": "Tacos", "cost": "7" } }));
    }

    #[test]
    fn test_get_at() {
        let tree = json!({ "meals": { "a": { "title": "Tacos" } } });
        assert_eq!(
            get_at(&tree, &["meals", "a", "title"]),
            Some(&json!("Tacos"))
        );
        assert_eq!(get_at(&tree, &["meals", "z"]), None);
        assert_eq!(get_at(&Value::Null, &["meals"]), None);
    }

    #[test]
    fn test_segments() {
        assert_eq!(segments("/"), Vec::<&str>::new());
        assert_eq!(segments("/a/b/"), vec!["a", "b"]);
    }
}
