use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod feature;

pub use feature::FeatureVector;

/// A post the user has opened, most recent first in the history list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub title: String,
    pub category: String,
    pub url: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Kind of user interaction written to the interaction log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    Like,
    Click,
    Scroll,
    ClickFromRecommendation,
}

impl Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InteractionKind::View => "view",
            InteractionKind::Like => "like",
            InteractionKind::Click => "click",
            InteractionKind::Scroll => "scroll",
            InteractionKind::ClickFromRecommendation => "click_from_recommendation",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    pub post_id: String,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub timestamp: i64,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Display data attached to a candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub title: String,
    pub url: String,
    pub category: String,
}

/// A post eligible for recommendation in the current cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub id: String,
    pub features: FeatureVector,
    pub metadata: ItemMetadata,
}

/// One entry of a ranked list, as handed to the presenter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub url: String,
    pub category: String,
    pub similarity: f64,
    pub is_personalized: bool,
    pub is_fallback: bool,
    /// Rounded similarity percentage, only for personalized entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_percent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Recommendation {
    /// Builds a personalized entry from a scored candidate
    pub fn personalized(item: &CandidateItem, similarity: f64) -> Self {
        Self {
            id: item.id.clone(),
            title: non_empty_or(&item.metadata.title, "Untitled Post"),
            url: non_empty_or(&item.metadata.url, "#"),
            category: non_empty_or(&item.metadata.category, "General"),
            similarity,
            is_personalized: true,
            is_fallback: false,
            match_percent: Some((similarity * 100.0).round() as u32),
            reason: None,
        }
    }
}

pub(crate) fn non_empty_or(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Rendered page handed over by the browser on load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
}

/// Response body of the blog's like endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeResponse {
    pub likes_count: u64,
    pub liked: bool,
}
