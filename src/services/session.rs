// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Short-lived server-side sessions for the OAuth round trip.
//!
//! The browser only holds an opaque session id in a cookie; the anti-CSRF
//! state lives here. Sessions are single use: `take` removes the entry
//! whether or not the caller goes on to succeed.

use crate::error::AppError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// How long a login may take between redirect and callback.
pub const OAUTH_SESSION_TTL: Duration = Duration::from_secs(10 * 60);

/// State captured at login time.
#[derive(Debug, Clone)]
pub struct OAuthSession {
    pub state: String,
    pub expires_at: Instant,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `state` under a new random session id and return the id.
    async fn create(&self, state: String) -> Result<String, AppError>;

    /// Remove and return the session. Expired sessions yield `None`.
    async fn take(&self, session_id: &str) -> Result<Option<OAuthSession>, AppError>;
}

/// Per-process session store.
///
/// Adequate for a single instance; a multi-instance deployment needs a
/// shared backend behind the same trait.
pub struct MemorySessionStore {
    sessions: DashMap<String, OAuthSession>,
    ttl: Duration,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_ttl(OAUTH_SESSION_TTL)
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, state: String) -> Result<String, AppError> {
        let now = Instant::now();
        // Abandoned logins never reach `take`; drop them here.
        self.sessions.retain(|_, s| s.expires_at > now);

        let session_id = uuid::Uuid::new_v4().to_string();
        self.sessions.insert(
            session_id.clone(),
            OAuthSession {
                state,
                expires_at: now + self.ttl,
            },
        );
        Ok(session_id)
    }

    async fn take(&self, session_id: &str) -> Result<Option<OAuthSession>, AppError> {
        Ok(self
            .sessions
            .remove(session_id)
            .map(|(_, session)| session)
            .filter(|session| session.expires_at > Instant::now()))
    }
}
