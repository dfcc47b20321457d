//! Turns the category, tags, author and length of a post into a
//! [`FeatureVector`].

use crate::models::feature::{AUTHOR_KEY, CATEGORY_KEY, READ_TIME_KEY, TAG_PREFIX};
use crate::models::FeatureVector;

pub const DEFAULT_CATEGORY: &str = "general";
pub const DEFAULT_AUTHOR: &str = "unknown";
/// Minutes assumed when no body text is available
pub const DEFAULT_READ_TIME: u32 = 5;

const WORDS_PER_MINUTE: usize = 200;
const MAX_READ_TIME: f64 = 30.0;
const HASH_MODULUS: u32 = 1_000_000_000;

/// Structured hints read from displayed content; every field is optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFields {
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub author: Option<String>,
    pub word_count: Option<usize>,
}

/// Labels and reading time before numeric normalization
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeatures {
    pub category: String,
    pub tags: Vec<String>,
    pub author: String,
    pub read_time: u32,
}

impl RawFeatures {
    pub fn from_content(content: &ContentFields) -> Self {
        let category = content
            .category
            .as_deref()
            .map(normalize_label)
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        let author = content
            .author
            .as_deref()
            .map(normalize_label)
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        let mut tags: Vec<String> = Vec::with_capacity(content.tags.len());
        for tag in &content.tags {
            let tag = normalize_label(tag);
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        let read_time = content
            .word_count
            .map(estimate_read_time)
            .unwrap_or(DEFAULT_READ_TIME);

        Self {
            category,
            tags,
            author,
            read_time,
        }
    }

    pub fn normalize(&self) -> FeatureVector {
        let mut vector = FeatureVector::new();
        vector.insert(CATEGORY_KEY, hash_scalar(&self.category));
        vector.insert(AUTHOR_KEY, hash_scalar(&self.author));
        vector.insert(
            READ_TIME_KEY,
            (f64::from(self.read_time) / MAX_READ_TIME).min(1.0),
        );
        for tag in &self.tags {
            vector.insert(format!("{}{}", TAG_PREFIX, tag), 1.0);
        }
        vector
    }
}

/// Extracts the normalized feature vector for one piece of content
pub fn extract(content: &ContentFields) -> FeatureVector {
    RawFeatures::from_content(content).normalize()
}

/// Lowercases, trims and joins whitespace runs with `_`
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Minutes at 200 words per minute, never less than one
pub fn estimate_read_time(word_count: usize) -> u32 {
    let minutes = word_count.div_ceil(WORDS_PER_MINUTE).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

/// Maps a label onto `[0, 1)` through [`string_hash`]
pub fn hash_scalar(label: &str) -> f64 {
    f64::from(string_hash(label) % HASH_MODULUS) / f64::from(HASH_MODULUS)
}

/// 32-bit `h * 31 + c` hash over UTF-16 code units, absolute value
///
/// Stable across runs and platforms so that a label always maps to the
/// same scalar.
pub fn string_hash(value: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in value.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    hash.unsigned_abs()
}
