//! Merge algebra for handler results

use serde_json::{Map, Value};

use super::types::MergeMode;
use crate::manifest::deep_merge;

/// Result of merging zero handler results under `mode`
#[must_use]
pub fn identity(mode: MergeMode) -> Value {
    match mode {
        MergeMode::Assign | MergeMode::Merge | MergeMode::Group => Value::Object(Map::new()),
        MergeMode::Push => Value::Array(Vec::new()),
        MergeMode::Replace => Value::Null,
    }
}

/// Merge `(owner, result)` pairs in order
///
/// `assign` and `merge` ignore non-object results; `group` lets a later
/// result from the same owner replace the earlier one.
#[must_use]
pub fn merge_results(mode: MergeMode, results: Vec<(String, Value)>) -> Value {
    match mode {
        MergeMode::Assign => {
            let mut out = Map::new();
            for (_, result) in results {
                if let Value::Object(map) = result {
                    out.extend(map);
                }
            }
            Value::Object(out)
        }
        MergeMode::Merge => results
            .into_iter()
            .filter(|(_, result)| result.is_object())
            .fold(identity(mode), |acc, (_, result)| deep_merge(acc, result)),
        MergeMode::Group => Value::Object(results.into_iter().collect()),
        MergeMode::Push => Value::Array(results.into_iter().map(|(_, result)| result).collect()),
        MergeMode::Replace => results
            .into_iter()
            .next_back()
            .map_or(Value::Null, |(_, result)| result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn results() -> Vec<(String, Value)> {
        vec![
            ("A".to_string(), json!({ "from": "A", "nested": { "a": 1 } })),
            ("B".to_string(), json!({ "from": "B", "nested": { "b": 2 } })),
        ]
    }

    #[test]
    fn test_identities() {
        for mode in [MergeMode::Assign, MergeMode::Merge, MergeMode::Group] {
            assert_eq!(merge_results(mode, Vec::new()), json!({}));
        }
        assert_eq!(merge_results(MergeMode::Push, Vec::new()), json!([]));
        assert_eq!(merge_results(MergeMode::Replace, Vec::new()), Value::Null);
    }

    #[test]
    fn test_assign_is_shallow_and_merge_is_deep() {
        assert_eq!(
            merge_results(MergeMode::Assign, results()),
            json!({ "from": "B", "nested": { "b": 2 } })
        );
        assert_eq!(
            merge_results(MergeMode::Merge, results()),
            json!({ "from": "B", "nested": { "a": 1, "b": 2 } })
        );
    }

    #[test]
    fn test_non_objects_contribute_nothing_to_assign() {
        let mixed = vec![
            ("A".to_string(), json!({ "k": 1 })),
            ("B".to_string(), Value::Null),
            ("C".to_string(), json!(5)),
        ];
        assert_eq!(merge_results(MergeMode::Assign, mixed.clone()), json!({ "k": 1 }));
        assert_eq!(merge_results(MergeMode::Merge, mixed.clone()), json!({ "k": 1 }));
        assert_eq!(merge_results(MergeMode::Push, mixed), json!([{ "k": 1 }, null, 5]));
    }

    #[test]
    fn test_group_push_replace() {
        assert_eq!(
            merge_results(MergeMode::Group, results()),
            json!({
                "A": { "from": "A", "nested": { "a": 1 } },
                "B": { "from": "B", "nested": { "b": 2 } },
            })
        );
        assert_eq!(merge_results(MergeMode::Push, results()).as_array().map(Vec::len), Some(2));
        assert_eq!(merge_results(MergeMode::Replace, results())["from"], "B");
    }
}
