use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::{HistoryEntry, LikeResponse, PageSnapshot, Recommendation};
use crate::services::{
    likes::{is_valid_post_id, like_post},
    recommender::with_session,
    tracking::track,
    InteractionTracker, Trigger,
};

use super::AppState;

// Request/Response types

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub current_post_id: Option<String>,
    /// Candidates known to the new session
    pub items: usize,
    pub recommendations: Vec<Recommendation>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Starts a session for a freshly loaded page
pub async fn load_page(
    State(state): State<AppState>,
    Json(page): Json<PageSnapshot>,
) -> AppResult<Json<PageResponse>> {
    if page.url.trim().is_empty() {
        return Err(AppError::InvalidInput("Page url cannot be empty".to_string()));
    }

    *state.tracker.write().await = InteractionTracker::new();

    let response = with_session(&state.recommender, move |recommender| {
        *recommender = recommender.new_session();
        recommender.initialize(&page);
        let limit = recommender.settings().limit;

        PageResponse {
            current_post_id: recommender.current_post_id().map(str::to_string),
            items: recommender.item_count(),
            recommendations: recommender.current(limit),
        }
    })
    .await?;

    Ok(Json(response))
}

/// Current ranking, served from cache while it is fresh
pub async fn get_recommendations(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let mut recommender = state.recommender.write().await;
    if !recommender.is_ready() {
        return Err(AppError::NotInitialized);
    }
    let limit = query.limit.unwrap_or(recommender.settings().limit);
    Ok(Json(recommender.current(limit)))
}

/// Forces a new ranking pass
pub async fn refresh_recommendations(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let mut recommender = state.recommender.write().await;
    let limit = query.limit.unwrap_or(recommender.settings().limit);
    let list = recommender.refresh(limit)?;
    tracing::info!(count = list.len(), "Recommendations refreshed on request");
    Ok(Json(list))
}

/// Viewing history, most recent first
pub async fn get_history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    let recommender = state.recommender.read().await;
    Json(recommender.history().entries().to_vec())
}

/// Feeds one page trigger into the interaction log
pub async fn record_interaction(
    State(state): State<AppState>,
    Json(trigger): Json<Trigger>,
) -> AppResult<StatusCode> {
    let mut tracker = state.tracker.clone().write_owned().await;

    let recorded = with_session(&state.recommender, move |recommender| {
        track(recommender, &mut tracker, &trigger)
    })
    .await?;

    Ok(if recorded {
        StatusCode::ACCEPTED
    } else {
        StatusCode::NO_CONTENT
    })
}

/// Forwards a like to the blog
pub async fn like(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Json<LikeResponse>> {
    if !is_valid_post_id(&post_id) {
        return Err(AppError::InvalidInput(format!("Invalid post id: {:?}", post_id)));
    }

    like_post(state.likes.as_ref(), &state.recommender, &post_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::ExternalApi(format!("Could not like post {}", post_id)))
}
