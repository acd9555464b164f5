//! In-memory login sessions and flash messages
//!
//! A session is created at login and identified by a random token carried in
//! an `HttpOnly` cookie. Flash messages queued on a session are consumed by
//! the next rendered page.

use axum::http::{header, HeaderMap};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "survey_session";

/// Category of a flash message (used as CSS class)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    user_id: i64,
    flashes: Vec<Flash>,
}

/// Shared session map
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for a user, returning its token
    pub async fn create(&self, user_id: i64) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.write().await.insert(
            token.clone(),
            Session {
                user_id,
                flashes: Vec::new(),
            },
        );
        token
    }

    pub async fn user_id(&self, token: &str) -> Option<i64> {
        self.sessions.read().await.get(token).map(|s| s.user_id)
    }

    pub async fn remove(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// Queue a flash message; ignored for unknown tokens
    pub async fn flash(&self, token: &str, level: FlashLevel, message: impl Into<String>) {
        if let Some(session) = self.sessions.write().await.get_mut(token) {
            session.flashes.push(Flash::new(level, message));
        }
    }

    /// Remove and return queued flash messages
    pub async fn take_flashes(&self, token: &str) -> Vec<Flash> {
        self.sessions
            .write()
            .await
            .get_mut(token)
            .map(|s| std::mem::take(&mut s.flashes))
            .unwrap_or_default()
    }
}

/// Session token from the request's `Cookie` headers
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value opening a session
pub fn session_cookie(token: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, token)
}

/// `Set-Cookie` value clearing the session cookie
pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}
