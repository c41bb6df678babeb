//! Immutable key to value mapping.

use std::collections::HashMap;
use std::collections::hash_map;

use serde::{Deserialize, Serialize};

/// A complete, immutable mapping from ID to name produced by one fetch.
///
/// Snapshots are never mutated after construction; a reload replaces the
/// whole snapshot held by a cache.
///
/// # Example
///
/// ```
/// use idmapper_core::Snapshot;
///
/// let snapshot: Snapshot = [("sk", "Slovakia"), ("us", "USA")].into_iter().collect();
/// assert_eq!(snapshot.get("sk"), Some("Slovakia"));
/// assert_eq!(snapshot.get("cz"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    values: HashMap<String, String>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the snapshot has no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over all entries in unspecified order.
    pub fn iter(&self) -> hash_map::Iter<'_, String, String> {
        self.values.iter()
    }

    /// Consumes the snapshot, returning the underlying map.
    pub fn into_inner(self) -> HashMap<String, String> {
        self.values
    }
}

impl From<HashMap<String, String>> for Snapshot {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl<K, V> FromIterator<(K, V)> for Snapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a String, &'a String);
    type IntoIter = hash_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
