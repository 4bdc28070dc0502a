//! HTTP handlers for the student chatbot
//!
//! - POST /api/v1/chat          answer a question, recording both turns
//! - GET  /api/v1/chat/history  transcript of the current login
//! - POST /api/v1/chat/new      start a fresh conversation

use crate::auth::{authenticate, Role};
use crate::error::ApiError;
use crate::knowledge::KbValue;
use crate::retrieval::{Answer, RetrievalPipeline};
use crate::session::{ChatMessage, SessionManager};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state for chat handlers
#[derive(Clone)]
pub struct ChatState {
    pub pipeline: Arc<RetrievalPipeline>,
    pub sessions: Arc<SessionManager>,
}

/// Create the chat router
pub fn chat_router(state: ChatState) -> Router {
    Router::new()
        .route("/api/v1/chat", post(ask))
        .route("/api/v1/chat/history", get(history))
        .route("/api/v1/chat/new", post(new_chat))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<KbValue>,
}

impl From<Answer> for ChatResponse {
    fn from(answer: Answer) -> Self {
        let text = answer.text();
        let source = answer.source();
        match answer {
            Answer::Direct { value, score, .. } => Self {
                answer: text,
                source,
                score: Some(score),
                value: Some(value),
            },
            Answer::Generated { .. } | Answer::Fallback { .. } => Self {
                answer: text,
                source,
                score: None,
                value: None,
            },
        }
    }
}

/// POST /api/v1/chat
async fn ask(
    State(state): State<ChatState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session = authenticate(&state.sessions, &headers, Some(Role::Student)).await?;

    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("Query must not be empty"));
    }

    session.push_message(ChatMessage::user(query)).await;
    let answer = state.pipeline.answer(query).await?;
    tracing::debug!(user = %session.username, source = answer.source(), "Answered chat query");

    let response = ChatResponse::from(answer);
    session
        .push_message(ChatMessage::assistant(response.answer.clone()))
        .await;
    Ok(Json(response))
}

/// GET /api/v1/chat/history
async fn history(
    State(state): State<ChatState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let session = authenticate(&state.sessions, &headers, Some(Role::Student)).await?;
    Ok(Json(session.transcript().await))
}

/// POST /api/v1/chat/new
async fn new_chat(
    State(state): State<ChatState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let session = authenticate(&state.sessions, &headers, Some(Role::Student)).await?;
    session.clear_transcript().await;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::handler::tests::{login_as, make_state};
    use crate::knowledge::{KnowledgeBase, KnowledgeStore};
    use crate::llm::{FakeGenerator, GenerationFallback, NO_ANSWER};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn chat_state(sessions: Arc<SessionManager>, generator: FakeGenerator) -> ChatState {
        let store = KnowledgeStore::from_kb(KnowledgeBase::builtin().unwrap()).unwrap();
        ChatState {
            pipeline: Arc::new(RetrievalPipeline::new(
                Arc::new(store),
                GenerationFallback::new(Arc::new(generator)),
            )),
            sessions,
        }
    }

    fn ask_request(token: &str, query: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/chat")
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::from(serde_json::json!({ "query": query }).to_string()))
            .unwrap()
    }

    fn authed_get(token: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_direct_answer_and_history() {
        let auth = make_state();
        let token = login_as(&auth, "ravi", Role::Student).await;
        let state = chat_state(auth.sessions.clone(), FakeGenerator::failing());

        let resp = chat_router(state.clone())
            .oneshot(ask_request(&token, "exam fee"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["answer"], "1200");
        assert_eq!(json["source"], "direct");
        assert_eq!(json["value"], 1200);

        let resp = chat_router(state)
            .oneshot(authed_get(&token, "/api/v1/chat/history"))
            .await
            .unwrap();
        let json = body_json(resp).await;
        let turns = json.as_array().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0]["role"], "user");
        assert_eq!(turns[0]["content"], "exam fee");
        assert_eq!(turns[1]["role"], "assistant");
        assert_eq!(turns[1]["content"], "1200");
    }

    #[tokio::test]
    async fn test_generated_answer_has_no_score() {
        let auth = make_state();
        let token = login_as(&auth, "ravi", Role::Student).await;
        let state = chat_state(auth.sessions.clone(), FakeGenerator::replying("Paris."));

        let resp = chat_router(state)
            .oneshot(ask_request(&token, "what is the capital of France"))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["answer"], "Paris.");
        assert_eq!(json["source"], "generated");
        assert!(json.get("score").is_none());
    }

    #[tokio::test]
    async fn test_generator_failure_still_answers() {
        let auth = make_state();
        let token = login_as(&auth, "ravi", Role::Student).await;
        let state = chat_state(auth.sessions.clone(), FakeGenerator::failing());

        let resp = chat_router(state)
            .oneshot(ask_request(&token, "what is the capital of France"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["answer"], NO_ANSWER);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let auth = make_state();
        let token = login_as(&auth, "ravi", Role::Student).await;
        let state = chat_state(auth.sessions.clone(), FakeGenerator::failing());

        let resp = chat_router(state.clone())
            .oneshot(ask_request(&token, "   "))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let session = state.sessions.get_session(&token).await.unwrap();
        assert!(session.transcript().await.is_empty());
    }

    #[tokio::test]
    async fn test_admin_cannot_chat() {
        let auth = make_state();
        let token = login_as(&auth, "warden", Role::Admin).await;
        let state = chat_state(auth.sessions.clone(), FakeGenerator::failing());

        let resp = chat_router(state)
            .oneshot(ask_request(&token, "exam fee"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unauthenticated() {
        let state = chat_state(Arc::new(SessionManager::new()), FakeGenerator::failing());
        let resp = chat_router(state)
            .oneshot(ask_request("bogus", "exam fee"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_new_chat_clears_history() {
        let auth = make_state();
        let token = login_as(&auth, "ravi", Role::Student).await;
        let state = chat_state(auth.sessions.clone(), FakeGenerator::failing());

        chat_router(state.clone())
            .oneshot(ask_request(&token, "exam fee"))
            .await
            .unwrap();

        let resp = chat_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/chat/new")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let session = state.sessions.get_session(&token).await.unwrap();
        assert!(session.transcript().await.is_empty());
    }
}
