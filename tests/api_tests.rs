use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use blog_recommender::{
    api::{create_router, AppState},
    db::{KeyValueStore, MemoryStore},
    error::{AppError, AppResult},
    models::LikeResponse,
    services::{LikeClient, RecommenderSettings},
};

const RUST_POST: &str = r#"
    <html><head><title>Ownership in Practice - Blog</title></head><body>
      <article class="post">
        <span class="category">Rust</span>
        <span class="tag">ownership</span>
        <span class="tag">borrowing</span>
        <span class="author">Ferris</span>
        <div class="post-content">Every value has exactly one owner at a time.</div>
      </article>
      <div class="post-card" data-post-id="lifetimes">
        <h4>Lifetimes Explained</h4>
        <a href="/post/lifetimes/">more</a>
        <span class="badge">Rust</span>
        <span class="tag">borrowing</span>
      </div>
    </body></html>
"#;

const HOME_PAGE: &str = r#"
    <html><head><title>Blog</title></head><body>
      <div class="post-card" data-post-id="pasta">
        <h3>Fresh Pasta at Home</h3>
        <a href="/post/pasta/">read</a>
        <span class="badge">Cooking</span>
        <span class="tag">dinner</span>
      </div>
      <div class="post-card" data-post-id="smart-pointers">
        <h3>Smart Pointers</h3>
        <a href="/post/smart-pointers/">read</a>
        <span class="badge">Rust</span>
        <span class="tag">ownership</span>
        <span class="tag">borrowing</span>
      </div>
    </body></html>
"#;

/// Like endpoint double that answers with a fixed outcome
struct StubLikes {
    fail: bool,
}

#[async_trait::async_trait]
impl LikeClient for StubLikes {
    async fn like(&self, _post_id: &str) -> AppResult<LikeResponse> {
        if self.fail {
            Err(AppError::ExternalApi("status 403".to_string()))
        } else {
            Ok(LikeResponse {
                likes_count: 3,
                liked: true,
            })
        }
    }
}

fn app_with(store: Arc<dyn KeyValueStore>, fail_likes: bool) -> Router {
    let state = AppState::new(
        store,
        RecommenderSettings::default(),
        Arc::new(StubLikes { fail: fail_likes }),
    );
    create_router(state)
}

fn app() -> Router {
    app_with(Arc::new(MemoryStore::new()), false)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        tokio_test::assert_ok!(serde_json::from_slice::<Value>(&bytes))
    };
    (status, value)
}

async fn load_page(app: &Router, url: &str, html: &str) -> Value {
    let (status, body) = send(app, "POST", "/pages", Some(json!({ "url": url, "html": html }))).await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn test_health_check() {
    let (status, body) = send(&app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_recommendations_unavailable_before_first_page() {
    let app = app();

    let (status, body) = send(&app, "GET", "/recommendations", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("not initialized"));

    let (status, _) = send(&app, "POST", "/recommendations/refresh", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_detail_page_personalizes_and_records_history() {
    let app = app();

    let body = load_page(&app, "https://blog.example.com/post/ownership/", RUST_POST).await;
    assert_eq!(body["currentPostId"], "ownership");
    assert_eq!(body["items"], 2);
    assert_eq!(body["recommendations"][0]["id"], "lifetimes");
    assert_eq!(body["recommendations"][0]["isPersonalized"], true);
    assert!(body["recommendations"][0]["matchPercent"].is_u64());

    let (status, history) = send(&app, "GET", "/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["id"], "ownership");
    assert_eq!(history[0]["title"], "Ownership in Practice");
}

#[tokio::test]
async fn test_history_carries_into_next_page() {
    let app = app();
    load_page(&app, "https://blog.example.com/post/ownership/", RUST_POST).await;

    let body = load_page(&app, "https://blog.example.com/", HOME_PAGE).await;
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations[0]["id"], "smart-pointers");
    assert!(recommendations.iter().all(|r| r["id"] != "ownership"));
}

#[tokio::test]
async fn test_history_persists_in_shared_store() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    load_page(
        &app_with(store.clone(), false),
        "https://blog.example.com/post/ownership/",
        RUST_POST,
    )
    .await;

    let (_, history) = send(&app_with(store, false), "GET", "/history", None).await;
    assert_eq!(history[0]["id"], "ownership");
}

#[tokio::test]
async fn test_listing_without_history_falls_back() {
    let app = app();
    load_page(&app, "https://blog.example.com/", HOME_PAGE).await;

    let (status, body) = send(&app, "GET", "/recommendations?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert!(list.iter().all(|r| r["isFallback"] == true));
    assert_eq!(list[0]["reason"], "Popular post");

    let (status, body) = send(&app, "POST", "/recommendations/refresh?limit=3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_interactions_are_filtered_by_trigger_rules() {
    let app = app();
    load_page(&app, "https://blog.example.com/post/ownership/", RUST_POST).await;

    let short_exit = json!({ "trigger": "page_exit", "duration_ms": 1200, "url": "/post/ownership/" });
    let (status, _) = send(&app, "POST", "/interactions", Some(short_exit)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let scroll = json!({ "trigger": "scroll", "depth": 30.0 });
    let (status, _) = send(&app, "POST", "/interactions", Some(scroll.clone())).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _) = send(&app, "POST", "/interactions", Some(scroll)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let outside = json!({ "trigger": "link_click", "href": "/about/" });
    let (status, _) = send(&app, "POST", "/interactions", Some(outside)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let into_post = json!({ "trigger": "link_click", "href": "/post/lifetimes/", "text": "more" });
    let (status, _) = send(&app, "POST", "/interactions", Some(into_post)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_new_page_resets_scroll_milestones() {
    let app = app();
    let scroll = json!({ "trigger": "scroll", "depth": 60.0 });

    load_page(&app, "https://blog.example.com/post/ownership/", RUST_POST).await;
    let (status, _) = send(&app, "POST", "/interactions", Some(scroll.clone())).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    load_page(&app, "https://blog.example.com/post/ownership/", RUST_POST).await;
    let (status, _) = send(&app, "POST", "/interactions", Some(scroll)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_like_proxy() {
    let (status, body) = send(&app(), "POST", "/posts/42/like", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "likes_count": 3, "liked": true }));

    let (status, body) = send(&app_with(Arc::new(MemoryStore::new()), true), "POST", "/posts/42/like", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("42"));
}

#[tokio::test]
async fn test_like_rejects_non_slug_post_id() {
    let app = app();
    load_page(&app, "https://blog.example.com/post/ownership/", RUST_POST).await;

    for uri in ["/posts/a.b/like", "/posts/42%3Fx=1/like", "/posts/%2E%2E/like"] {
        let (status, _) = send(&app, "POST", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }

    let (_, history) = send(&app, "GET", "/history", None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_page_url_rejected() {
    let (status, _) = send(&app(), "POST", "/pages", Some(json!({ "url": " ", "html": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_id_echoed() {
    let id = "0b8a2b2e-6c1c-4a57-9f7e-3a2f0e7d9c11";
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], id);
}
