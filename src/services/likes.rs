/// Client for the blog's like endpoint
///
/// `POST {base}/api/posts/{id}/like/` with the CSRF token and a JSON content
/// type. Failures are logged and never retried.
use std::sync::Arc;

use reqwest::{Client as HttpClient, Url};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{InteractionKind, LikeResponse},
    services::recommender::{with_session, Recommender},
};

pub const CSRF_HEADER: &str = "X-CSRFToken";

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LikeClient: Send + Sync {
    /// Toggles the like on `post_id` and returns the new count
    async fn like(&self, post_id: &str) -> AppResult<LikeResponse>;
}

#[derive(Clone)]
pub struct HttpLikeClient {
    http_client: HttpClient,
    base_url: String,
    csrf_token: Option<String>,
}

impl HttpLikeClient {
    pub fn new(base_url: impl Into<String>, csrf_token: Option<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.into(),
            csrf_token,
        }
    }

    fn like_url(&self, post_id: &str) -> AppResult<Url> {
        if !is_valid_post_id(post_id) {
            return Err(AppError::InvalidInput(format!("Invalid post id: {:?}", post_id)));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::InvalidInput(format!("Invalid blog base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::InvalidInput("Blog base url cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(["api", "posts", post_id, "like", ""]);
        Ok(url)
    }
}

/// Post ids are slugs: ASCII letters, digits, `-` and `_`
pub fn is_valid_post_id(post_id: &str) -> bool {
    !post_id.is_empty()
        && post_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait::async_trait]
impl LikeClient for HttpLikeClient {
    async fn like(&self, post_id: &str) -> AppResult<LikeResponse> {
        let mut request = self
            .http_client
            .post(self.like_url(post_id)?)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Like endpoint returned status {}: {}",
                status, body
            )));
        }

        let like: LikeResponse = response.json().await?;
        Ok(like)
    }
}

/// Likes a post and records the interaction on success
///
/// Returns `None` on any failure, after logging it.
pub async fn like_post(
    client: &dyn LikeClient,
    recommender: &Arc<RwLock<Recommender>>,
    post_id: &str,
) -> Option<LikeResponse> {
    match client.like(post_id).await {
        Ok(like) => {
            let id = post_id.to_string();
            let recorded = with_session(recommender, move |session| {
                session.record_interaction(&id, InteractionKind::Like, serde_json::json!({}))
            })
            .await;
            if let Err(e) = recorded {
                tracing::error!(post_id = %post_id, error = %e, "Could not record like");
            }
            tracing::info!(
                post_id = %post_id,
                likes = like.likes_count,
                liked = like.liked,
                "Post liked"
            );
            Some(like)
        }
        Err(e) => {
            tracing::error!(post_id = %post_id, error = %e, "Like request failed");
            None
        }
    }
}
