// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure operations over the nested configuration map.
//!
//! Merging, flattening, diffing and path walking are kept free of any locking
//! so the store can run them inside a single critical section.

use crate::domain::config_value::{ConfigMap, ConfigValue};
use std::collections::{BTreeMap, BTreeSet};

/// A flattened view of a tree: `"a.b.c"` to leaf value.
pub type FlatMap = BTreeMap<String, ConfigValue>;

/// The set of flat keys touched by one update.
pub type ChangeSet = BTreeSet<String>;

/// Deep-merges `src` into `dest`.
///
/// Keys missing from `dest` are copied, nested maps on both sides are merged
/// recursively, and on any other collision the value from `src` replaces the
/// one in `dest`. Merging never fails.
///
/// # Examples
///
/// ```
/// use dyncfg::domain::{tree::merge, ConfigMap, ConfigValue};
///
/// let mut dest = ConfigMap::new();
/// dest.insert("port".to_string(), ConfigValue::Integer(80));
///
/// let mut src = ConfigMap::new();
/// src.insert("port".to_string(), ConfigValue::Integer(8080));
///
/// merge(&mut dest, src);
/// assert_eq!(dest.get("port"), Some(&ConfigValue::Integer(8080)));
/// ```
pub fn merge(dest: &mut ConfigMap, src: ConfigMap) {
    for (key, incoming) in src {
        match incoming {
            ConfigValue::Map(nested) => {
                if let Some(ConfigValue::Map(existing)) = dest.get_mut(&key) {
                    merge(existing, nested);
                    continue;
                }
                dest.insert(key, ConfigValue::Map(nested));
            }
            other => {
                dest.insert(key, other);
            }
        }
    }
}

/// Flattens `map` into leaf paths joined with `delimiter`.
///
/// Sequences are leaves. Empty nested maps contribute no keys. A source key
/// containing `delimiter` can land on the same path as a nested key; the
/// later one in key order wins and a warning is logged.
pub fn flatten(map: &ConfigMap, delimiter: &str) -> FlatMap {
    let mut flat = FlatMap::new();
    flatten_into("", map, delimiter, &mut flat);
    flat
}

fn flatten_into(prefix: &str, map: &ConfigMap, delimiter: &str, flat: &mut FlatMap) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}{}{}", prefix, delimiter, key)
        };
        match value {
            ConfigValue::Map(nested) => flatten_into(&path, nested, delimiter, flat),
            leaf => {
                if flat.insert(path.clone(), leaf.clone()).is_some() {
                    tracing::warn!(key = %path, "flattened key collides with an earlier path");
                }
            }
        }
    }
}

/// Computes the keys that differ between two flattened views.
///
/// A key is changed when it is new, when its value is not deep-equal to the
/// previous one, or when it disappeared.
pub fn diff(previous: &FlatMap, current: &FlatMap) -> ChangeSet {
    let mut changes: ChangeSet = current
        .iter()
        .filter(|(key, value)| previous.get(*key) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect();
    changes.extend(
        previous
            .keys()
            .filter(|key| !current.contains_key(*key))
            .cloned(),
    );
    changes
}

/// Resolves a delimited key against `root` without creating anything.
pub fn lookup<'a>(root: &'a ConfigMap, key: &str, delimiter: &str) -> Option<&'a ConfigValue> {
    let mut segments = key.split(delimiter);
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = current.as_table()?.get(segment)?;
    }
    Some(current)
}

/// Stores `value` at a delimited key, creating (or replacing non-map)
/// intermediate nodes along the way.
pub fn assign(root: &mut ConfigMap, key: &str, delimiter: &str, value: ConfigValue) {
    let mut segments: Vec<&str> = key.split(delimiter).collect();
    let leaf = segments.pop().unwrap_or_default();

    let mut current = root;
    for segment in segments {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| ConfigValue::Map(ConfigMap::new()));
        if !matches!(slot, ConfigValue::Map(_)) {
            *slot = ConfigValue::Map(ConfigMap::new());
        }
        let ConfigValue::Map(next) = slot else {
            return;
        };
        current = next;
    }
    current.insert(leaf.to_string(), value);
}

/// Builds a nested map from flat `(key, value)` pairs.
///
/// Later pairs win when two keys collide.
pub fn unflatten<I>(entries: I, delimiter: &str) -> ConfigMap
where
    I: IntoIterator<Item = (String, ConfigValue)>,
{
    let mut root = ConfigMap::new();
    for (key, value) in entries {
        assign(&mut root, &key, delimiter, value);
    }
    root
}

/// Returns `true` when a watch `prefix` covers the flat `key`.
///
/// Matching is path-segment aware: `"db"` covers `"db"` and `"db.host"` but
/// not `"dbname"`. The empty prefix covers every key.
pub fn prefix_matches(prefix: &str, key: &str, delimiter: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match key.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => prefix.ends_with(delimiter) || rest.starts_with(delimiter),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, ConfigValue)]) -> ConfigMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_merge_copies_missing_keys() {
        let mut dest = map(&[("a", ConfigValue::Integer(1))]);
        merge(&mut dest, map(&[("b", ConfigValue::Integer(2))]));
        assert_eq!(dest.len(), 2);
    }

    #[test]
    fn test_merge_recurses_into_maps() {
        let mut dest = map(&[(
            "server",
            ConfigValue::Map(map(&[("host", ConfigValue::from("localhost"))])),
        )]);
        merge(
            &mut dest,
            map(&[(
                "server",
                ConfigValue::Map(map(&[("port", ConfigValue::Integer(8080))])),
            )]),
        );
        let server = dest.get("server").and_then(ConfigValue::as_table).unwrap();
        assert_eq!(server.get("host"), Some(&ConfigValue::from("localhost")));
        assert_eq!(server.get("port"), Some(&ConfigValue::Integer(8080)));
    }

    #[test]
    fn test_merge_source_wins_on_shape_mismatch() {
        let mut dest = map(&[("a", ConfigValue::Integer(1))]);
        let nested = ConfigValue::Map(map(&[("b", ConfigValue::Integer(2))]));
        merge(&mut dest, map(&[("a", nested.clone())]));
        assert_eq!(dest.get("a"), Some(&nested));

        merge(&mut dest, map(&[("a", ConfigValue::from("flat"))]));
        assert_eq!(dest.get("a"), Some(&ConfigValue::from("flat")));
    }

    #[test]
    fn test_flatten() {
        let root = map(&[
            (
                "server",
                ConfigValue::Map(map(&[
                    ("port", ConfigValue::Integer(8080)),
                    ("tags", ConfigValue::from(vec!["a", "b"])),
                    ("empty", ConfigValue::Map(ConfigMap::new())),
                ])),
            ),
            ("name", ConfigValue::from("demo")),
        ]);
        let flat = flatten(&root, ".");
        assert_eq!(flat.len(), 3);
        assert_eq!(flat.get("server.port"), Some(&ConfigValue::Integer(8080)));
        assert_eq!(flat.get("server.tags"), Some(&ConfigValue::from(vec!["a", "b"])));
        assert_eq!(flat.get("name"), Some(&ConfigValue::from("demo")));

        let flat = flatten(&root, "/");
        assert!(flat.contains_key("server/port"));
    }

    #[test]
    fn test_flatten_delimiter_in_source_key_collides() {
        let root = map(&[
            ("a", ConfigValue::Map(map(&[("b", ConfigValue::Integer(2))]))),
            ("a.b", ConfigValue::Integer(1)),
        ]);

        let flat = flatten(&root, ".");
        assert_eq!(flat.len(), 1);
        assert_eq!(flat.get("a.b"), Some(&ConfigValue::Integer(1)));

        // A delimiter absent from the keys keeps both paths apart.
        let flat = flatten(&root, "/");
        assert_eq!(flat.get("a/b"), Some(&ConfigValue::Integer(2)));
        assert_eq!(flat.get("a.b"), Some(&ConfigValue::Integer(1)));
    }

    #[test]
    fn test_diff_reports_additions_modifications_and_removals() {
        let previous = flatten(
            &map(&[
                ("a", ConfigValue::Integer(1)),
                ("b", ConfigValue::Integer(2)),
                ("c", ConfigValue::Integer(3)),
            ]),
            ".",
        );
        let current = flatten(
            &map(&[
                ("a", ConfigValue::Integer(1)),
                ("b", ConfigValue::Integer(20)),
                ("d", ConfigValue::Integer(4)),
            ]),
            ".",
        );
        let changes = diff(&previous, &current);
        let expected: ChangeSet = ["b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(changes, expected);
    }

    #[test]
    fn test_diff_of_equal_views_is_empty() {
        let view = flatten(&map(&[("a", ConfigValue::from(vec![1i64, 2]))]), ".");
        assert!(diff(&view, &view.clone()).is_empty());
    }

    #[test]
    fn test_lookup() {
        let root = map(&[(
            "a",
            ConfigValue::Map(map(&[("b", ConfigValue::Integer(1))])),
        )]);
        assert_eq!(lookup(&root, "a.b", "."), Some(&ConfigValue::Integer(1)));
        assert!(lookup(&root, "a", ".").unwrap().as_table().is_some());
        assert_eq!(lookup(&root, "a.b.c", "."), None);
        assert_eq!(lookup(&root, "missing", "."), None);
        assert_eq!(lookup(&root, "", "."), None);
    }

    #[test]
    fn test_assign_creates_and_replaces_intermediates() {
        let mut root = map(&[("a", ConfigValue::Integer(1))]);
        assign(&mut root, "a.b.c", ".", ConfigValue::from("deep"));
        assert_eq!(lookup(&root, "a.b.c", "."), Some(&ConfigValue::from("deep")));

        assign(&mut root, "top", ".", ConfigValue::Bool(true));
        assert_eq!(root.get("top"), Some(&ConfigValue::Bool(true)));
    }

    #[test]
    fn test_unflatten_nests_keys() {
        let root = unflatten(
            vec![
                ("server.http.port".to_string(), ConfigValue::from("80")),
                ("server.name".to_string(), ConfigValue::from("api")),
            ],
            ".",
        );
        assert_eq!(
            lookup(&root, "server.http.port", "."),
            Some(&ConfigValue::from("80"))
        );
        assert_eq!(flatten(&root, ".").len(), 2);
    }

    #[test]
    fn test_prefix_matches_path_segments() {
        assert!(prefix_matches("", "anything", "."));
        assert!(prefix_matches("server", "server", "."));
        assert!(prefix_matches("server", "server.http.port", "."));
        assert!(prefix_matches("server.", "server.http", "."));
        assert!(!prefix_matches("server.ht", "server.http2.x", "."));
        assert!(!prefix_matches("db", "dbname", "."));
        assert!(!prefix_matches("client", "server.http", "."));
    }
}
