use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key holding the hashed, normalized category
pub const CATEGORY_KEY: &str = "category";
/// Key holding the hashed, normalized author
pub const AUTHOR_KEY: &str = "author";
/// Key holding the reading time as a fraction of 30 minutes
pub const READ_TIME_KEY: &str = "read_time";
/// Prefix of the binary per-tag keys
pub const TAG_PREFIX: &str = "tag_";

/// Sparse numeric representation of a post
///
/// Keys are open-ended (one per tag), so two vectors may have disjoint key
/// sets; a missing key reads as zero. Keys are kept sorted so that sums over
/// a vector always run in the same order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(BTreeMap<String, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), value);
    }

    /// Returns the weight for `key`, zero when absent
    pub fn get(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tag names carried by this vector, without the `tag_` prefix
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.keys().filter_map(|k| k.strip_prefix(TAG_PREFIX))
    }
}

impl FromIterator<(String, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(&str, f64); N]> for FeatureVector {
    fn from(pairs: [(&str, f64); N]) -> Self {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}
