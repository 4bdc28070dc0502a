//! HTTP handlers for the complaint box
//!
//! Student portal:
//! - POST /api/v1/complaints             file a complaint
//! - GET  /api/v1/complaints?status=     own complaints, newest first
//! - POST /api/v1/complaints/:id/read    acknowledge a resolved complaint
//!
//! Admin portal:
//! - GET   /api/v1/admin/complaints      complaints not yet read
//! - PATCH /api/v1/admin/complaints/:id  set status and response

use super::types::*;
use crate::auth::{authenticate, Role};
use crate::error::ApiError;
use crate::session::SessionManager;
use crate::storage::Database;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use std::sync::Arc;

/// Shared state for complaint handlers
#[derive(Clone)]
pub struct ComplaintsState {
    pub db: Arc<Database>,
    pub sessions: Arc<SessionManager>,
}

/// Create the complaints router
pub fn complaints_router(state: ComplaintsState) -> Router {
    Router::new()
        .route("/api/v1/complaints", post(create_complaint))
        .route("/api/v1/complaints", get(list_own_complaints))
        .route("/api/v1/complaints/:id/read", post(mark_read))
        .route("/api/v1/admin/complaints", get(list_active_complaints))
        .route("/api/v1/admin/complaints/:id", patch(update_complaint))
        .with_state(state)
}

// =============================================================================
// Student handlers
// =============================================================================

/// POST /api/v1/complaints
async fn create_complaint(
    State(state): State<ComplaintsState>,
    headers: HeaderMap,
    Json(request): Json<CreateComplaintRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authenticate(&state.sessions, &headers, Some(Role::Student)).await?;

    let description = request.description.trim();
    if description.is_empty() {
        return Err(ApiError::bad_request("Description must not be empty"));
    }

    let student_name = match &request.student_name {
        Some(name) => name.trim(),
        None => session.username.as_str(),
    };

    let complaint = state.db.save_complaint(
        &session.username,
        student_name,
        request.issue_type,
        description,
    )?;
    tracing::info!(
        id = complaint.id,
        issue = %complaint.issue_type,
        "Complaint filed"
    );
    Ok((StatusCode::CREATED, Json(complaint)))
}

/// GET /api/v1/complaints
async fn list_own_complaints(
    State(state): State<ComplaintsState>,
    headers: HeaderMap,
    Query(filter): Query<ComplaintFilter>,
) -> Result<Json<Vec<Complaint>>, ApiError> {
    let session = authenticate(&state.sessions, &headers, Some(Role::Student)).await?;
    let complaints = state
        .db
        .list_user_complaints(&session.username, filter.status)?;
    Ok(Json(complaints))
}

/// POST /api/v1/complaints/:id/read
async fn mark_read(
    State(state): State<ComplaintsState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Complaint>, ApiError> {
    let session = authenticate(&state.sessions, &headers, Some(Role::Student)).await?;

    let mut complaint = state
        .db
        .get_complaint(id)?
        .filter(|c| c.username == session.username)
        .ok_or_else(|| ApiError::not_found(format!("Complaint {} not found", id)))?;

    if complaint.status != ComplaintStatus::Resolved {
        return Err(ApiError::conflict(format!(
            "Complaint {} is {}, only resolved complaints can be marked read",
            id, complaint.status
        )));
    }

    state
        .db
        .update_complaint(id, ComplaintStatus::Read, &complaint.admin_response)?;
    complaint.status = ComplaintStatus::Read;
    Ok(Json(complaint))
}

// =============================================================================
// Admin handlers
// =============================================================================

/// GET /api/v1/admin/complaints
async fn list_active_complaints(
    State(state): State<ComplaintsState>,
    headers: HeaderMap,
) -> Result<Json<ActiveComplaints>, ApiError> {
    authenticate(&state.sessions, &headers, Some(Role::Admin)).await?;

    let complaints: Vec<Complaint> = state
        .db
        .list_complaints()?
        .into_iter()
        .filter(|c| c.status.is_active())
        .collect();
    Ok(Json(ActiveComplaints {
        count: complaints.len(),
        complaints,
    }))
}

/// PATCH /api/v1/admin/complaints/:id
async fn update_complaint(
    State(state): State<ComplaintsState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<UpdateComplaintRequest>,
) -> Result<Json<Complaint>, ApiError> {
    let session = authenticate(&state.sessions, &headers, Some(Role::Admin)).await?;

    if request.status == ComplaintStatus::Read {
        return Err(ApiError::bad_request(
            "Only the student can mark a complaint as read",
        ));
    }
    let response = request.response.trim();
    if request.status == ComplaintStatus::Resolved && response.is_empty() {
        return Err(ApiError::bad_request(
            "A response is required to resolve a complaint",
        ));
    }

    if !state.db.update_complaint(id, request.status, response)? {
        return Err(ApiError::not_found(format!("Complaint {} not found", id)));
    }
    tracing::info!(id, status = %request.status, admin = %session.username, "Complaint updated");

    let complaint = state
        .db
        .get_complaint(id)?
        .ok_or_else(|| ApiError::not_found(format!("Complaint {} not found", id)))?;
    Ok(Json(complaint))
}
