//! Login session management

use super::transcript::ChatMessage;
use crate::auth::types::{Role, User};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A logged-in user
#[derive(Debug)]
pub struct Session {
    /// Opaque bearer token
    pub token: String,
    /// Account name
    pub username: String,
    /// Portal the user logged into
    pub role: Role,
    /// Creation timestamp
    pub created_at: i64,
    /// Last activity timestamp
    last_activity: Arc<RwLock<i64>>,
    /// Chat transcript for this login
    transcript: Arc<RwLock<Vec<ChatMessage>>>,
}

impl Session {
    /// Create a new session for `user`
    pub fn new(user: &User) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            token: Uuid::new_v4().to_string(),
            username: user.username.clone(),
            role: user.role,
            created_at: now,
            last_activity: Arc::new(RwLock::new(now)),
            transcript: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Update last activity
    pub async fn touch(&self) {
        *self.last_activity.write().await = chrono::Utc::now().timestamp_millis();
    }

    /// Get last activity timestamp
    pub async fn last_activity(&self) -> i64 {
        *self.last_activity.read().await
    }

    /// Append a transcript entry
    pub async fn push_message(&self, message: ChatMessage) {
        self.transcript.write().await.push(message);
    }

    /// Copy of the transcript, oldest first
    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.read().await.clone()
    }

    /// Drop the transcript; returns how many entries were removed
    pub async fn clear_transcript(&self) -> usize {
        let mut transcript = self.transcript.write().await;
        let removed = transcript.len();
        transcript.clear();
        removed
    }
}

/// Session manager
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
    /// Sessions idle longer than this are rejected on lookup
    max_idle_ms: Option<i64>,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_idle_ms: None,
        }
    }

    /// Create a session manager that expires sessions idle for `max_idle_ms`
    pub fn with_idle_timeout(max_idle_ms: i64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_idle_ms: Some(max_idle_ms),
        }
    }

    /// Start a session for an authenticated user
    pub async fn create_session(&self, user: &User) -> Arc<Session> {
        let session = Arc::new(Session::new(user));
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());

        tracing::info!("Created {} session for {}", session.role, session.username);
        session
    }

    /// Get a live session by token; an expired one is terminated instead
    pub async fn get_session(&self, token: &str) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(token).cloned()?;

        if let Some(max_idle_ms) = self.max_idle_ms {
            let idle_time = chrono::Utc::now().timestamp_millis() - session.last_activity().await;
            if idle_time > max_idle_ms {
                tracing::debug!("Session for {} expired on lookup", session.username);
                self.terminate_session(token).await;
                return None;
            }
        }

        Some(session)
    }

    /// End a session and discard its transcript
    pub async fn terminate_session(&self, token: &str) -> Option<Arc<Session>> {
        let session = self.sessions.write().await.remove(token)?;
        session.clear_transcript().await;
        tracing::info!("Terminated session for {}", session.username);
        Some(session)
    }

    /// Get session count
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Clean up sessions idle for longer than `max_idle_ms`
    pub async fn cleanup_inactive(&self, max_idle_ms: i64) -> usize {
        let now = chrono::Utc::now().timestamp_millis();
        let sessions: Vec<Arc<Session>> = {
            let sessions = self.sessions.read().await;
            sessions.values().cloned().collect()
        };

        let mut cleaned = 0;
        for session in sessions {
            let idle_time = now - session.last_activity().await;
            if idle_time > max_idle_ms && self.terminate_session(&session.token).await.is_some() {
                cleaned += 1;
            }
        }

        if cleaned > 0 {
            tracing::info!("Cleaned up {} inactive sessions", cleaned);
        }

        cleaned
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
