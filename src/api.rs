// src/api.rs
// Read-only query API over the story store. No pipeline logic lives here.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::models::Story;
use crate::store::{StoreError, StoryStore};

const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<StoryStore>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "ok" }))
        .route("/stories", get(list_stories))
        .route("/stories/{hn_id}", get(get_story))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "HN AI Scraper API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "stories": "/stories",
            "story_by_id": "/stories/{hn_id}",
        }
    }))
}

#[derive(serde::Deserialize)]
struct ListQuery {
    /// Substring filter over title, category, subcategory, and tags.
    q: Option<String>,
    limit: Option<usize>,
}

type ApiError = (StatusCode, Json<Value>);

async fn list_stories(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Story>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let stories = state
        .store
        .search(params.q.as_deref(), limit)
        .map_err(internal_error)?;
    Ok(Json(stories))
}

async fn get_story(
    State(state): State<AppState>,
    Path(hn_id): Path<i64>,
) -> Result<Json<Story>, ApiError> {
    match state.store.get_by_hn_id(hn_id) {
        Ok(Some(story)) => Ok(Json(story)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("story with hn_id {hn_id} not found") })),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

fn internal_error(e: StoreError) -> ApiError {
    tracing::error!(error = ?e, "store query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
}
