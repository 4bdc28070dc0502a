//! Unified API router for the helpdesk
//!
//! Merges all module routers into a single axum `Router` with CORS and
//! request tracing.
//!
//! ## Endpoint Map
//!
//! | Prefix                     | Module     | Description                         |
//! |----------------------------|------------|-------------------------------------|
//! | `/health`                  | api        | Liveness probe                      |
//! | `/api/v1/auth/*`           | auth       | Register, login, logout, profile    |
//! | `/api/v1/chat*`            | chat       | Chatbot and transcript              |
//! | `/api/v1/complaints*`      | complaints | Student complaint box               |
//! | `/api/v1/admin/complaints*`| complaints | Admin review queue                  |
//! | `/api/v1/knowledge*`       | knowledge  | Browse, search, reload              |

use crate::auth::{auth_router, AuthState};
use crate::chat::{chat_router, ChatState};
use crate::complaints::{complaints_router, ComplaintsState};
use crate::knowledge::{knowledge_router, KnowledgeState};
use axum::{
    http::{header, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Per-module handler states
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub chat: ChatState,
    pub complaints: ComplaintsState,
    pub knowledge: KnowledgeState,
}

/// Build the complete helpdesk HTTP application
///
/// Merges all module routers, adds CORS and tracing middleware, and returns
/// a single `Router` ready to be served by `axum::serve`.
pub fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    let cors = build_cors(cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_router(state.auth))
        .merge(chat_router(state.chat))
        .merge(complaints_router(state.complaints))
        .merge(knowledge_router(state.knowledge))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::handler::tests::make_state;
    use crate::config::DEFAULT_THRESHOLD;
    use crate::knowledge::{KnowledgeBase, KnowledgeStore};
    use crate::llm::{FakeGenerator, GenerationFallback};
    use crate::retrieval::RetrievalPipeline;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn make_app() -> Router {
        let auth = make_state();
        let store = Arc::new(KnowledgeStore::from_kb(KnowledgeBase::builtin().unwrap()).unwrap());
        let pipeline = Arc::new(RetrievalPipeline::new(
            store.clone(),
            GenerationFallback::new(Arc::new(FakeGenerator::failing())),
        ));
        let state = AppState {
            chat: ChatState {
                pipeline,
                sessions: auth.sessions.clone(),
            },
            complaints: ComplaintsState {
                db: auth.db.clone(),
                sessions: auth.sessions.clone(),
            },
            knowledge: KnowledgeState {
                store,
                sessions: auth.sessions.clone(),
                threshold: DEFAULT_THRESHOLD,
            },
            auth,
        };
        build_app(state, &[])
    }

    fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let resp = health_check().await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_route() {
        let resp = make_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_student_journey() {
        let app = make_app();

        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/v1/auth/register",
                None,
                serde_json::json!({
                    "username": "ravi",
                    "email": "ravi@pvpsit.ac.in",
                    "password": "pw"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/v1/auth/login",
                None,
                serde_json::json!({"username": "ravi", "password": "pw", "role": "student"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let token = body_json(resp).await["token"].as_str().unwrap().to_string();

        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/v1/chat",
                Some(&token),
                serde_json::json!({"query": "management quota"}),
            ))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["answer"], "200000");
        assert_eq!(json["source"], "direct");

        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/v1/complaints",
                Some(&token),
                serde_json::json!({"issueType": "Other", "description": "Wi-Fi down in library"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .oneshot(post_json("/api/v1/auth/logout", Some(&token), serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_build_cors_empty_origins() {
        let _cors = build_cors(&[]);
    }

    #[test]
    fn test_build_cors_with_origins() {
        let _cors = build_cors(&[
            "http://localhost:8501".to_string(),
            "https://helpdesk.example.edu".to_string(),
        ]);
    }
}
