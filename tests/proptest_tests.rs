// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property-based tests using proptest.
//!
//! These tests use property-based testing to verify the algebra of the tree
//! operations and the lenient conversion rules on arbitrary inputs.

use dyncfg::domain::duration::{format_duration, parse_duration};
use dyncfg::domain::tree::{diff, flatten, merge, unflatten};
use dyncfg::domain::{ConfigMap, ConfigValue};
use dyncfg::service::Configuration;
use proptest::prelude::*;
use std::time::Duration;

fn scalar() -> impl Strategy<Value = ConfigValue> {
    prop_oneof![
        any::<bool>().prop_map(ConfigValue::Bool),
        any::<i64>().prop_map(ConfigValue::Integer),
        "[a-zA-Z0-9 ]{0,8}".prop_map(ConfigValue::from),
        prop::collection::vec(any::<i64>().prop_map(ConfigValue::Integer), 0..3)
            .prop_map(ConfigValue::Sequence),
    ]
}

/// Trees whose nested maps are never empty, so flattening loses nothing.
fn tree() -> impl Strategy<Value = ConfigMap> {
    let value = scalar().prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map("[a-z]{1,4}", inner, 1..4).prop_map(ConfigValue::Map)
    });
    prop::collection::btree_map("[a-z]{1,4}", value, 0..5)
}

fn merged(mut dest: ConfigMap, src: ConfigMap) -> ConfigMap {
    merge(&mut dest, src);
    dest
}

// Flattening then nesting again yields the original tree
proptest! {
    #[test]
    fn test_flatten_roundtrip(root in tree()) {
        let flat = flatten(&root, ".");
        prop_assert_eq!(unflatten(flat, "."), root);
    }
}

// Merging a tree into itself changes nothing
proptest! {
    #[test]
    fn test_merge_idempotent_self(root in tree()) {
        prop_assert_eq!(merged(root.clone(), root.clone()), root);
    }
}

// Merging the same source twice equals merging it once
proptest! {
    #[test]
    fn test_merge_idempotent_source(a in tree(), b in tree()) {
        let once = merged(a, b.clone());
        let twice = merged(once.clone(), b);
        prop_assert_eq!(twice, once);
    }
}

// Every leaf of the source is visible after a merge
proptest! {
    #[test]
    fn test_merge_source_leaves_win(a in tree(), b in tree()) {
        let result = flatten(&merged(a, b.clone()), ".");
        for (key, value) in flatten(&b, ".") {
            prop_assert_eq!(result.get(&key), Some(&value));
        }
    }
}

// Diff of a view against itself is empty; diff against empty is every key
proptest! {
    #[test]
    fn test_diff_identity(root in tree()) {
        let flat = flatten(&root, ".");
        prop_assert!(diff(&flat, &flat).is_empty());

        let all = diff(&Default::default(), &flat);
        prop_assert_eq!(all.len(), flat.len());
    }
}

// Re-applying a payload reports no changes
proptest! {
    #[test]
    fn test_reapply_reports_nothing(a in tree(), b in tree()) {
        let config = Configuration::new();
        config.apply(a).unwrap();
        config.apply(b.clone()).unwrap();
        prop_assert!(config.apply(b).unwrap().is_empty());
    }
}

// Lenient integer accessor: parses or yields zero, never fails
proptest! {
    #[test]
    fn test_get_int_lenient(s in "\\PC{0,12}") {
        let config = Configuration::new();
        config.set("k", s.as_str()).unwrap();
        let expected = s.trim().parse::<i64>().unwrap_or(0);
        prop_assert_eq!(config.get_int("k"), expected);
    }
}

proptest! {
    #[test]
    fn test_i64_parsing_valid(n in prop::num::i64::ANY) {
        let value = ConfigValue::from(n.to_string());
        prop_assert_eq!(value.as_i64("test").unwrap(), n);
    }
}

// Test float parsing
proptest! {
    #[test]
    fn test_f64_parsing_valid(n in prop::num::f64::NORMAL) {
        let value = ConfigValue::from(n.to_string());
        let parsed = value.as_f64("test").unwrap();
        // Allow for floating point precision issues
        prop_assert!((parsed - n).abs() < 1e-10 * n.abs().max(1.0));
    }
}

// Formatted durations parse back to the same value
proptest! {
    #[test]
    fn test_duration_format_roundtrip(nanos in 0u64..1_000_000_000_000_000) {
        let duration = Duration::from_nanos(nanos);
        prop_assert_eq!(parse_duration(&format_duration(duration)).unwrap(), duration);
    }
}

// Test that non-numeric strings fail integer parsing
proptest! {
    #[test]
    fn test_integer_parsing_non_numeric(
        s in "[a-zA-Z]\\PC*" // Strings starting with a letter
    ) {
        let value = ConfigValue::from(s);
        prop_assert!(value.as_i64("test").is_err());
    }
}
