//! HTTP handlers for the knowledge base
//!
//! - GET  /api/v1/knowledge          whole knowledge base
//! - GET  /api/v1/knowledge/search   best lexical match, no fallback
//! - POST /api/v1/knowledge/reload   rebuild from the configured source (admin)

use super::store::KnowledgeStore;
use crate::auth::{authenticate, Role};
use crate::error::ApiError;
use crate::session::SessionManager;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state for knowledge handlers
#[derive(Clone)]
pub struct KnowledgeState {
    pub store: Arc<KnowledgeStore>,
    pub sessions: Arc<SessionManager>,
    /// Similarity a search hit must exceed to count as a match
    pub threshold: f64,
}

/// Create the knowledge router
pub fn knowledge_router(state: KnowledgeState) -> Router {
    Router::new()
        .route("/api/v1/knowledge", get(get_knowledge))
        .route("/api/v1/knowledge/search", get(search))
        .route("/api/v1/knowledge/reload", post(reload))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KnowledgeResponse {
    lines: usize,
    built_at: i64,
    knowledge: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    index: usize,
    line: String,
    score: f64,
    matched: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReloadResponse {
    lines: usize,
    vocabulary: usize,
    built_at: i64,
}

/// GET /api/v1/knowledge
async fn get_knowledge(
    State(state): State<KnowledgeState>,
    headers: HeaderMap,
) -> Result<Json<KnowledgeResponse>, ApiError> {
    authenticate(&state.sessions, &headers, None).await?;
    let snapshot = state.store.snapshot().await;
    Ok(Json(KnowledgeResponse {
        lines: snapshot.corpus().len(),
        built_at: snapshot.built_at(),
        knowledge: snapshot.kb().to_json(),
    }))
}

/// GET /api/v1/knowledge/search?q=
async fn search(
    State(state): State<KnowledgeState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    authenticate(&state.sessions, &headers, None).await?;
    if query.q.trim().is_empty() {
        return Err(ApiError::bad_request("Query parameter 'q' must not be empty"));
    }

    let snapshot = state.store.snapshot().await;
    let hit = snapshot.index().query(&query.q);
    let (line, _) = snapshot
        .corpus()
        .get(hit.index)
        .ok_or_else(|| ApiError::internal("Index and corpus out of step"))?;

    Ok(Json(SearchResponse {
        index: hit.index,
        line: line.to_string(),
        score: hit.score,
        matched: hit.score > state.threshold,
    }))
}

/// POST /api/v1/knowledge/reload
async fn reload(
    State(state): State<KnowledgeState>,
    headers: HeaderMap,
) -> Result<Json<ReloadResponse>, ApiError> {
    let session = authenticate(&state.sessions, &headers, Some(Role::Admin)).await?;
    tracing::info!(admin = %session.username, "Knowledge base reload requested");

    let snapshot = state.store.reload().await?;
    Ok(Json(ReloadResponse {
        lines: snapshot.corpus().len(),
        vocabulary: snapshot.index().vocabulary_len(),
        built_at: snapshot.built_at(),
    }))
}
