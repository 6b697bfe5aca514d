use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::UserProfile;

/// Bearer token pair plus the issue time of the current access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    /// When the current access token was issued. Set at login, advanced on
    /// every successful refresh.
    pub issued_at: DateTime<Utc>,
}

impl TokenSet {
    pub fn new(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            issued_at: Utc::now(),
        }
    }
}

/// The unit of persistence: user payload, tokens, and the write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub tokens: TokenSet,
    /// When this session was last written (login, token rotation, or user
    /// payload refresh). Drives the freshness check during bootstrap.
    pub cached_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user: Option<UserProfile>, tokens: TokenSet) -> Self {
        Self {
            user,
            tokens,
            cached_at: Utc::now(),
        }
    }

    /// Age of the cached session. Clock skew yields zero.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.cached_at).to_std().unwrap_or_default()
    }

    pub fn is_fresh(&self, window: Duration) -> bool {
        self.age() <= window
    }

    /// Swap in a freshly issued access token.
    pub fn rotate_access_token(&mut self, access_token: String) {
        self.tokens.access_token = access_token;
        self.tokens.issued_at = Utc::now();
        self.cached_at = Utc::now();
    }

    /// Merge a freshly fetched user payload into the session.
    pub fn update_user(&mut self, user: UserProfile) {
        self.user = Some(user);
        self.cached_at = Utc::now();
    }
}

/// Externally observable authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Unauthenticated,
    Authenticated,
}

impl SessionPhase {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionPhase::Authenticated)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Unauthenticated => write!(f, "unauthenticated"),
            SessionPhase::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Snapshot published to subscribers on every state transition.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// True from construction until the first bootstrap pass completes.
    pub loading: bool,
    pub user: Option<UserProfile>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Unauthenticated,
            loading: true,
            user: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
