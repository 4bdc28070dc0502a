//! HTTP handlers for the auth API
//!
//! - POST /api/v1/auth/register  create a student or admin account
//! - POST /api/v1/auth/login     role-scoped login, returns a bearer token
//! - POST /api/v1/auth/logout    end the session and drop its transcript
//! - GET  /api/v1/auth/me        current account

use super::password::{hash_password, verify_password};
use super::types::*;
use crate::config::AuthConfig;
use crate::error::{ApiError, Error};
use crate::session::{Session, SessionManager};
use crate::storage::Database;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

/// Shared state for auth handlers
#[derive(Clone)]
pub struct AuthState {
    pub db: Arc<Database>,
    pub sessions: Arc<SessionManager>,
    pub config: Arc<AuthConfig>,
}

/// Create the auth router
pub fn auth_router(state: AuthState) -> Router {
    Router::new()
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/me", get(me))
        .with_state(state)
}

/// Resolve the bearer token in `headers` to a live session.
///
/// With `required` set, sessions of any other role are rejected.
pub async fn authenticate(
    sessions: &SessionManager,
    headers: &HeaderMap,
    required: Option<Role>,
) -> Result<Arc<Session>, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let session = sessions
        .get_session(token)
        .await
        .ok_or_else(|| ApiError::unauthorized("Session expired or unknown"))?;

    if let Some(role) = required {
        if session.role != role {
            return Err(ApiError::forbidden(format!(
                "This endpoint requires the {} portal",
                role
            )));
        }
    }

    session.touch().await;
    Ok(session)
}

/// POST /api/v1/auth/register
async fn register(
    State(state): State<AuthState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = request.username.trim();
    let email = request.email.trim();

    if username.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let domain = match request.role {
        Role::Student => &state.config.student_email_domain,
        Role::Admin => &state.config.admin_email_domain,
    };
    if !email.ends_with(domain.as_str()) || email.len() == domain.len() {
        return Err(ApiError::bad_request(format!(
            "{} accounts need an email ending in {}",
            request.role, domain
        )));
    }

    let user = User {
        username: username.to_string(),
        email: email.to_string(),
        password_hash: hash_password(&request.password, state.config.bcrypt_cost).await?,
        role: request.role,
    };

    if !state.db.register_user(&user)? {
        return Err(ApiError::conflict("Username or email already exists"));
    }

    tracing::info!("Registered {} account {}", user.role, user.username);
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = verify_login(&state.db, &request).await?;
    let session = state.sessions.create_session(&user).await;
    Ok(Json(LoginResponse {
        token: session.token.clone(),
        user: UserProfile::from(&user),
    }))
}

/// Check a login against the account stored for the requested portal
async fn verify_login(db: &Database, request: &LoginRequest) -> crate::error::Result<User> {
    let invalid = || Error::Auth("Invalid credentials".to_string());

    let user = db
        .get_user(request.username.trim())?
        .filter(|user| user.role == request.role)
        .ok_or_else(invalid)?;

    if !verify_password(&request.password, &user.password_hash).await {
        tracing::debug!("Rejected password for {}", user.username);
        return Err(invalid());
    }

    Ok(user)
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let session = authenticate(&state.sessions, &headers, None).await?;
    state.sessions.terminate_session(&session.token).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
async fn me(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, ApiError> {
    let session = authenticate(&state.sessions, &headers, None).await?;
    let user = state
        .db
        .get_user(&session.username)?
        .ok_or_else(|| ApiError::not_found("Account no longer exists"))?;
    Ok(Json(UserProfile::from(&user)))
}
