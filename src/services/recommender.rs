use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::{load_or_default, save_best_effort, KeyValueStore, StoreKey},
    error::{AppError, AppResult},
    models::{non_empty_or, CandidateItem, InteractionKind, ItemMetadata, PageSnapshot, Recommendation},
    services::{extractor::extract, history::HistoryStore, page::scan_page, similarity::similarity},
};

/// Known items persisted between sessions
pub const ITEM_CACHE_CAPACITY: usize = 200;
/// Fixed score of a recently viewed fallback entry
pub const RECENTLY_VIEWED_SIMILARITY: f64 = 0.7;
/// Fixed score of a canned suggestion
pub const SUGGESTION_SIMILARITY: f64 = 0.5;

struct Suggestion {
    title: &'static str,
    category: &'static str,
    reason: &'static str,
}

const DEFAULT_SUGGESTIONS: [Suggestion; 5] = [
    Suggestion {
        title: "Getting Started with Django",
        category: "Django",
        reason: "Popular post",
    },
    Suggestion {
        title: "Python Best Practices",
        category: "Python",
        reason: "Trending now",
    },
    Suggestion {
        title: "Web Development Tips",
        category: "Web Dev",
        reason: "Editor's pick",
    },
    Suggestion {
        title: "JavaScript Fundamentals",
        category: "JavaScript",
        reason: "Beginner friendly",
    },
    Suggestion {
        title: "Database Design Patterns",
        category: "Database",
        reason: "Must read",
    },
];

/// Tunables of a recommender session
#[derive(Debug, Clone)]
pub struct RecommenderSettings {
    /// Default length of a ranked list
    pub limit: usize,
    /// Personalized candidates at or below this similarity are dropped
    pub similarity_threshold: f64,
    /// How long a ranked list is served from cache
    pub cache_ttl: Duration,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            limit: 5,
            similarity_threshold: 0.1,
            cache_ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommenderState {
    Uninitialized,
    Ready,
}

/// Candidates keyed by id, iterated in first-insertion order
#[derive(Debug, Default)]
struct CandidatePool {
    items: Vec<CandidateItem>,
    index: HashMap<String, usize>,
}

impl CandidatePool {
    /// Inserts or replaces in place; a replaced item keeps its position
    fn upsert(&mut self, item: CandidateItem) {
        match self.index.get(&item.id) {
            Some(&position) => self.items[position] = item,
            None => {
                self.index.insert(item.id.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }

    fn get(&self, id: &str) -> Option<&CandidateItem> {
        self.index.get(id).map(|&position| &self.items[position])
    }

    fn iter(&self) -> impl Iterator<Item = &CandidateItem> {
        self.items.iter()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

struct CachedRanking {
    limit: usize,
    computed_at: Instant,
    recommendations: Vec<Recommendation>,
}

/// Recommendation session for one page view
///
/// Built once when a page loads and handed to whatever needs it. History and
/// the known-item cache live in the injected store and survive the session;
/// candidates and the ranking cache do not.
pub struct Recommender {
    store: Arc<dyn KeyValueStore>,
    settings: RecommenderSettings,
    history: HistoryStore,
    items: CandidatePool,
    state: RecommenderState,
    current_post_id: Option<String>,
    /// Current item that is not a post of its own and is kept out of storage
    ephemeral_id: Option<String>,
    cached: Option<CachedRanking>,
    cycles: u64,
}

impl Recommender {
    pub fn new(store: Arc<dyn KeyValueStore>, settings: RecommenderSettings) -> Self {
        let history = HistoryStore::load(store.clone());
        Self {
            store,
            settings,
            history,
            items: CandidatePool::default(),
            state: RecommenderState::Uninitialized,
            current_post_id: None,
            ephemeral_id: None,
            cached: None,
            cycles: 0,
        }
    }

    /// Fresh, uninitialized session over the same store and settings
    pub fn new_session(&self) -> Self {
        Self::new(self.store.clone(), self.settings.clone())
    }

    pub fn state(&self) -> RecommenderState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == RecommenderState::Ready
    }

    pub fn settings(&self) -> &RecommenderSettings {
        &self.settings
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn current_post_id(&self) -> Option<&str> {
        self.current_post_id.as_deref()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn candidate(&self, id: &str) -> Option<&CandidateItem> {
        self.items.get(id)
    }

    /// Number of ranking passes run so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Reads the page, updates history and ranks the first list
    ///
    /// Calling it again once ready does nothing and returns `true`.
    pub fn initialize(&mut self, page: &PageSnapshot) -> bool {
        if self.is_ready() {
            return true;
        }

        tracing::info!(url = %page.url, "Initializing recommendations");

        let scanned = scan_page(page);
        let current = scanned.current;

        let stored: Vec<CandidateItem> = load_or_default(self.store.as_ref(), &StoreKey::KnownItems);
        for item in stored {
            self.items.upsert(item);
        }

        self.items.upsert(CandidateItem {
            id: current.id.clone(),
            features: extract(&current.content),
            metadata: ItemMetadata {
                title: current.title.clone(),
                url: current.url.clone(),
                category: current.category.clone(),
            },
        });

        if scanned.is_detail_view {
            self.record_view(&current.id, &current.title, &current.category, &current.url);
        } else {
            self.ephemeral_id = Some(current.id.clone());
        }

        for item in scanned.candidates {
            self.items.upsert(CandidateItem {
                features: extract(&item.content),
                id: item.id,
                metadata: item.metadata,
            });
        }
        self.persist_items();

        self.current_post_id = Some(current.id);
        self.rank_and_cache(self.settings.limit);
        self.state = RecommenderState::Ready;

        tracing::info!(
            items = self.items.len(),
            history = self.history.len(),
            "Recommendations initialized"
        );
        true
    }

    /// Adds or replaces a candidate from an external content source
    pub fn register_item(&mut self, item: CandidateItem) {
        self.items.upsert(item);
        self.cached = None;
    }

    pub fn record_view(&mut self, id: &str, title: &str, category: &str, url: &str) {
        self.history.record_view(id, title, category, url);
        self.cached = None;
    }

    pub fn record_interaction(
        &mut self,
        post_id: &str,
        kind: InteractionKind,
        metadata: serde_json::Value,
    ) {
        self.history.record_interaction(post_id, kind, metadata);
    }

    /// Ranks candidates against the averaged history profile
    ///
    /// Falls back to [`Self::fallback_recommendations`] when there is no
    /// history or nothing clears the similarity threshold.
    pub fn get_recommendations(&self, limit: usize) -> Vec<Recommendation> {
        if self.history.is_empty() {
            return self.fallback_recommendations(limit);
        }

        let profile = self
            .history
            .average_features(|id| self.items.get(id).map(|item| &item.features));

        let mut ranked: Vec<Recommendation> = self
            .items
            .iter()
            .filter(|item| !self.history.contains(&item.id))
            .filter(|item| self.current_post_id.as_deref() != Some(item.id.as_str()))
            .filter_map(|item| {
                let score = similarity(&profile, &item.features);
                (score > self.settings.similarity_threshold)
                    .then(|| Recommendation::personalized(item, score))
            })
            .collect();

        if ranked.is_empty() {
            tracing::debug!("No candidate cleared the threshold, using fallback");
            return self.fallback_recommendations(limit);
        }

        // sort_by is stable, so ties keep insertion order
        ranked.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        ranked.truncate(limit);
        ranked
    }

    /// Recently viewed posts, topped up with canned suggestions
    pub fn fallback_recommendations(&self, limit: usize) -> Vec<Recommendation> {
        let mut fallback: Vec<Recommendation> = self
            .history
            .entries()
            .iter()
            .take(limit)
            .map(|entry| Recommendation {
                id: entry.id.clone(),
                title: non_empty_or(&entry.title, "Recently Viewed"),
                url: non_empty_or(&entry.url, "#"),
                category: non_empty_or(&entry.category, "General"),
                similarity: RECENTLY_VIEWED_SIMILARITY,
                is_personalized: false,
                is_fallback: true,
                match_percent: None,
                reason: Some("Recently viewed".to_string()),
            })
            .collect();

        let remaining = limit.saturating_sub(fallback.len());
        fallback.extend(
            DEFAULT_SUGGESTIONS
                .iter()
                .take(remaining)
                .map(|suggestion| Recommendation {
                    id: format!("default_{}", Uuid::new_v4().simple()),
                    title: suggestion.title.to_string(),
                    url: "#".to_string(),
                    category: suggestion.category.to_string(),
                    similarity: SUGGESTION_SIMILARITY,
                    is_personalized: false,
                    is_fallback: true,
                    match_percent: None,
                    reason: Some(suggestion.reason.to_string()),
                }),
        );

        fallback
    }

    /// Cached ranking for `limit`, recomputed once it expires
    pub fn current(&mut self, limit: usize) -> Vec<Recommendation> {
        if let Some(cached) = &self.cached {
            if cached.limit == limit && cached.computed_at.elapsed() < self.settings.cache_ttl {
                return cached.recommendations.clone();
            }
        }
        self.rank_and_cache(limit)
    }

    /// Drops the cached ranking and ranks again
    pub fn refresh(&mut self, limit: usize) -> AppResult<Vec<Recommendation>> {
        if !self.is_ready() {
            return Err(AppError::NotInitialized);
        }
        self.cached = None;
        Ok(self.rank_and_cache(limit))
    }

    fn rank_and_cache(&mut self, limit: usize) -> Vec<Recommendation> {
        let recommendations = self.get_recommendations(limit);
        self.cycles += 1;

        tracing::debug!(
            cycle = self.cycles,
            count = recommendations.len(),
            personalized = recommendations.iter().any(|r| r.is_personalized),
            "Ranked recommendations"
        );

        self.cached = Some(CachedRanking {
            limit,
            computed_at: Instant::now(),
            recommendations: recommendations.clone(),
        });
        recommendations
    }

    fn persist_items(&self) {
        let keep: Vec<&CandidateItem> = self
            .items
            .iter()
            .filter(|item| self.ephemeral_id.as_deref() != Some(item.id.as_str()))
            .collect();
        let start = keep.len().saturating_sub(ITEM_CACHE_CAPACITY);
        save_best_effort(self.store.as_ref(), &StoreKey::KnownItems, &keep[start..]);
    }
}

/// Runs `work` against the locked session on the blocking pool
///
/// Anything that writes through to the store goes here: the store may block
/// on I/O.
pub async fn with_session<T, F>(session: &Arc<RwLock<Recommender>>, work: F) -> AppResult<T>
where
    F: FnOnce(&mut Recommender) -> T + Send + 'static,
    T: Send + 'static,
{
    let mut guard = session.clone().write_owned().await;
    tokio::task::spawn_blocking(move || work(&mut *guard))
        .await
        .map_err(|e| AppError::Internal(format!("Session task failed: {}", e)))
}
