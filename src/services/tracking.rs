//! Named page triggers and the rules that turn them into interaction events.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::InteractionKind;
use crate::services::page::is_detail_path;
use crate::services::recommender::Recommender;

/// Page time below which leaving the page is not counted as a view
pub const MIN_VIEW_DURATION_MS: u64 = 3_000;
/// Scroll depths, in percent, reported once each per page
pub const SCROLL_MILESTONES: [u32; 4] = [25, 50, 75, 90];

/// Something that happened on the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum Trigger {
    PageExit {
        duration_ms: u64,
        url: String,
    },
    Scroll {
        depth: f64,
    },
    LinkClick {
        href: String,
        #[serde(default)]
        text: String,
    },
    RecommendationClick {
        post_id: String,
        #[serde(default)]
        title: String,
    },
    Like {
        post_id: String,
    },
}

/// Event ready for the interaction log
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEvent {
    pub post_id: String,
    pub kind: InteractionKind,
    pub metadata: serde_json::Value,
}

/// Per-page tracking state
#[derive(Debug, Default)]
pub struct InteractionTracker {
    max_scroll: f64,
    milestones_reached: usize,
}

impl InteractionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the trigger rules; `None` means the trigger is not logged
    pub fn resolve(&mut self, trigger: &Trigger, current_post_id: Option<&str>) -> Option<TrackedEvent> {
        match trigger {
            Trigger::PageExit { duration_ms, url } => {
                if *duration_ms <= MIN_VIEW_DURATION_MS {
                    return None;
                }
                Some(TrackedEvent {
                    post_id: current_post_id?.to_string(),
                    kind: InteractionKind::View,
                    metadata: json!({ "duration": duration_ms, "url": url }),
                })
            }
            Trigger::Scroll { depth } => {
                let post_id = current_post_id?;
                let milestone = self.advance_scroll(*depth)?;
                Some(TrackedEvent {
                    post_id: post_id.to_string(),
                    kind: InteractionKind::Scroll,
                    metadata: json!({ "depth": self.max_scroll, "milestone": milestone }),
                })
            }
            Trigger::LinkClick { href, text } => {
                let post_id = post_id_from_href(href)?;
                Some(TrackedEvent {
                    post_id,
                    kind: InteractionKind::Click,
                    metadata: json!({ "text": text.trim(), "href": href }),
                })
            }
            Trigger::RecommendationClick { post_id, title } => Some(TrackedEvent {
                post_id: post_id.clone(),
                kind: InteractionKind::ClickFromRecommendation,
                metadata: json!({ "title": title, "source": "knn_recommendations" }),
            }),
            Trigger::Like { post_id } => Some(TrackedEvent {
                post_id: post_id.clone(),
                kind: InteractionKind::Like,
                metadata: json!({}),
            }),
        }
    }

    /// Returns the deepest milestone newly crossed, if any
    fn advance_scroll(&mut self, depth: f64) -> Option<u32> {
        if depth.is_finite() {
            self.max_scroll = self.max_scroll.max(depth);
        }

        let crossed = SCROLL_MILESTONES
            .iter()
            .take_while(|&&m| self.max_scroll >= f64::from(m))
            .count();
        if crossed <= self.milestones_reached {
            return None;
        }
        self.milestones_reached = crossed;
        Some(SCROLL_MILESTONES[crossed - 1])
    }
}

/// Post id of a link into a post, taken from its last path segment
pub fn post_id_from_href(href: &str) -> Option<String> {
    let path = href.split(|c: char| c == '?' || c == '#').next()?;
    if !is_detail_path(path) {
        return None;
    }
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

/// Resolves `trigger` and records it; returns whether anything was logged
pub fn track(recommender: &mut Recommender, tracker: &mut InteractionTracker, trigger: &Trigger) -> bool {
    let current = recommender.current_post_id().map(str::to_string);
    match tracker.resolve(trigger, current.as_deref()) {
        Some(event) => {
            recommender.record_interaction(&event.post_id, event.kind, event.metadata);
            true
        }
        None => false,
    }
}
