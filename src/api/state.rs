use std::sync::Arc;

use tokio::sync::RwLock;

use crate::db::KeyValueStore;
use crate::services::{InteractionTracker, LikeClient, Recommender, RecommenderSettings};

/// Shared application state
///
/// Holds the live recommendation session. A new page replaces the session
/// inside the same lock, so the refresh task keeps pointing at it.
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<RwLock<Recommender>>,
    pub tracker: Arc<RwLock<InteractionTracker>>,
    pub likes: Arc<dyn LikeClient>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        settings: RecommenderSettings,
        likes: Arc<dyn LikeClient>,
    ) -> Self {
        Self {
            recommender: Arc::new(RwLock::new(Recommender::new(store, settings))),
            tracker: Arc::new(RwLock::new(InteractionTracker::new())),
            likes,
        }
    }
}
