//! A stand-in for the public placeholder API.
//!
//! Serves a fixed set of posts and accepts writes without keeping them, the
//! same way the public service behaves: every `POST` answers `id: 101`.
//! Mutations can be made to fail on demand.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use shelf_engine::SeedItem;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Id the placeholder assigns to every created item.
pub const CREATED_ID: u64 = 101;

/// Number of posts served by default.
pub const DEFAULT_POST_COUNT: u64 = 100;

/// Shared state of the mock API.
#[derive(Debug, Clone)]
pub struct MockApi {
    posts: Arc<Vec<SeedItem>>,
    fail_mutations: Arc<AtomicBool>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new(DEFAULT_POST_COUNT)
    }
}

impl MockApi {
    pub fn new(post_count: u64) -> Self {
        let posts = (1..=post_count)
            .map(|id| SeedItem {
                id,
                title: format!("sample post {id}"),
                body: format!("body of sample post {id}"),
            })
            .collect();

        Self {
            posts: Arc::new(posts),
            fail_mutations: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make `POST`, `PUT` and `DELETE` answer 500 (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.fail_mutations.store(failing, Ordering::SeqCst);
    }

    pub fn is_failing(&self) -> bool {
        self.fail_mutations.load(Ordering::SeqCst)
    }

    /// Routes under `/posts`, with trace and CORS layers.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/posts", get(list_posts).post(create_post))
            .route("/posts/{id}", get(get_post).put(update_post).delete(delete_post))
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.clone())
    }

    /// Serve until the listener fails.
    pub async fn serve(self, listener: tokio::net::TcpListener) -> std::io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Mock API listening on http://{}/posts", addr);
        }
        axum::serve(listener, self.router()).await
    }

    fn injected_failure(&self) -> Option<Response> {
        self.is_failing().then(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "injected failure" })),
            )
                .into_response()
        })
    }
}

/// GET /posts
async fn list_posts(State(api): State<MockApi>) -> Json<Vec<SeedItem>> {
    Json(api.posts.as_ref().clone())
}

/// GET /posts/{id}
async fn get_post(State(api): State<MockApi>, Path(id): Path<u64>) -> Response {
    match api.posts.iter().find(|p| p.id == id) {
        Some(post) => Json(post.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({}))).into_response(),
    }
}

/// POST /posts - echoes the body with the fixed created id.
async fn create_post(State(api): State<MockApi>, Json(mut body): Json<Value>) -> Response {
    if let Some(failure) = api.injected_failure() {
        return failure;
    }
    if let Some(object) = body.as_object_mut() {
        object.insert("id".to_string(), json!(CREATED_ID));
    }
    (StatusCode::CREATED, Json(body)).into_response()
}

/// PUT /posts/{id} - echoes the body.
async fn update_post(
    State(api): State<MockApi>,
    Path(id): Path<String>,
    Json(mut body): Json<Value>,
) -> Response {
    if let Some(failure) = api.injected_failure() {
        return failure;
    }
    if let Some(object) = body.as_object_mut() {
        object.insert("id".to_string(), json!(id));
    }
    Json(body).into_response()
}

/// DELETE /posts/{id}
async fn delete_post(State(api): State<MockApi>, Path(_id): Path<String>) -> Response {
    if let Some(failure) = api.injected_failure() {
        return failure;
    }
    Json(json!({})).into_response()
}
