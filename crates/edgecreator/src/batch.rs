//! Chunked batch lookups.
//!
//! Collaborators accept a bounded number of keys per request. [`chunked`]
//! splits a key list into consecutive groups, issues one fetch per group and
//! folds the partial results together with [`Mergeable`].
//!
//! # Example
//!
//! ```
//! # use std::num::NonZeroUsize;
//! # use edgecreator::batch::chunked;
//! let chunk_size = NonZeroUsize::new(2).unwrap();
//! let mut calls = 0;
//! let doubled: Vec<u32> = chunked(&[1, 2, 3], chunk_size, |keys| {
//!     calls += 1;
//!     Ok::<_, std::convert::Infallible>(keys.iter().map(|k| k * 2).collect())
//! })
//! .unwrap();
//!
//! assert_eq!(doubled, vec![2, 4, 6]);
//! assert_eq!(calls, 2);
//! ```

use std::{
    collections::{BTreeMap, HashMap},
    hash::{BuildHasher, Hash},
    num::NonZeroUsize,
};

use indexmap::IndexMap;
use log::{trace, warn};
use serde_json::Value;

/// A partial batch result that can absorb the result of a later group.
pub trait Mergeable: Default {
    /// Fold `other`, fetched after `self`, into `self`.
    fn merge(&mut self, other: Self);
}

impl<T> Mergeable for Vec<T> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

impl<K: Eq + Hash, V, S: BuildHasher + Default> Mergeable for HashMap<K, V, S> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

impl<K: Eq + Hash, V, S: BuildHasher + Default> Mergeable for IndexMap<K, V, S> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

impl<K: Ord, V> Mergeable for BTreeMap<K, V> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

impl Mergeable for Value {
    /// The first non-empty result decides the shape: arrays are concatenated,
    /// objects are merged with later keys winning. Results of another shape
    /// are dropped.
    fn merge(&mut self, other: Self) {
        if is_empty_json(&other) {
            return;
        }
        match (self, other) {
            (Value::Array(items), Value::Array(more)) => items.extend(more),
            (Value::Object(entries), Value::Object(more)) => entries.extend(more),
            (current, other) if is_empty_json(current) => *current = other,
            (current, other) => warn!(
                expected = json_shape(current),
                found = json_shape(&other);
                "Dropping batch result with a different shape"
            ),
        }
    }
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
        _ => false,
    }
}

fn json_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Fetch `keys` in consecutive groups of at most `chunk_size` and merge the
/// results in group order.
///
/// No fetch is issued for an empty key list.
///
/// # Errors
///
/// Returns the first error returned by `fetch`; later groups are not fetched.
pub fn chunked<K, T, E, F>(keys: &[K], chunk_size: NonZeroUsize, mut fetch: F) -> Result<T, E>
where
    T: Mergeable,
    F: FnMut(&[K]) -> Result<T, E>,
{
    let mut merged = T::default();
    for (index, group) in keys.chunks(chunk_size.get()).enumerate() {
        trace!(group = index, keys = group.len(); "Fetching batch group");
        merged.merge(fetch(group)?);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_empty_keys_never_fetch() {
        let mut calls = 0;
        let result: Vec<u8> = chunked(&[] as &[u8], size(3), |_| {
            calls += 1;
            Ok::<_, ()>(vec![1])
        })
        .unwrap();

        assert!(result.is_empty());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_groups_are_bounded() {
        let mut groups = Vec::new();
        let _: Vec<u8> = chunked(&[1, 2, 3, 4, 5], size(2), |keys| {
            groups.push(keys.to_vec());
            Ok::<_, ()>(Vec::new())
        })
        .unwrap();

        assert_eq!(groups, vec![vec![1, 2], vec![3, 4], vec![5]]);
    }

    #[test]
    fn test_maps_merge_with_later_group_winning() {
        let merged: IndexMap<&str, u32> = chunked(&["a", "b"], size(1), |keys| {
            let mut map = IndexMap::new();
            map.insert("shared", if keys[0] == "a" { 1 } else { 2 });
            map.insert(keys[0], 0);
            Ok::<_, ()>(map)
        })
        .unwrap();

        assert_eq!(merged["shared"], 2);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_first_error_stops_fetching() {
        let mut calls = 0;
        let result: Result<Vec<u8>, &str> = chunked(&[1, 2, 3], size(1), |keys| {
            calls += 1;
            if keys[0] == 2 { Err("boom") } else { Ok(vec![keys[0]]) }
        });

        assert_eq!(result, Err("boom"));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_json_arrays_concatenate() {
        let merged: Value = chunked(&[1, 2, 3], size(2), |keys| {
            Ok::<_, ()>(json!(keys))
        })
        .unwrap();

        assert_eq!(merged, json!([1, 2, 3]));
    }

    #[test]
    fn test_json_objects_merge() {
        let merged: Value = chunked(&["x", "y"], size(1), |keys| {
            Ok::<_, ()>(json!({ keys[0]: true, "last": keys[0] }))
        })
        .unwrap();

        assert_eq!(merged, json!({"x": true, "last": "y", "y": true}));
    }

    #[test]
    fn test_json_shape_follows_first_non_empty_result() {
        let merged: Value = chunked(&[0, 1, 2], size(1), |keys| {
            Ok::<_, ()>(match keys[0] {
                0 => json!([]),
                1 => json!({"a": 1}),
                _ => json!([2]),
            })
        })
        .unwrap();

        assert_eq!(merged, json!({"a": 1}));
    }
}
