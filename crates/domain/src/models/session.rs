//! Server-side admin session state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::recent_ids::RecentIdSet;

/// Identity of the admin a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPrincipal {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub last_login: DateTime<Utc>,
}

/// Position of a session in the two-factor login flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
    AwaitingCredentials,
    /// Password accepted, one-time code outstanding. No access granted.
    AwaitingOtp { user_id: String, email: String },
    /// Admin without 2FA; only profile and 2FA management are reachable.
    PendingSetup(SessionPrincipal),
    Authenticated(SessionPrincipal),
}

impl AuthState {
    pub fn principal(&self) -> Option<&SessionPrincipal> {
        match self {
            AuthState::PendingSetup(p) | AuthState::Authenticated(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn requires_2fa_setup(&self) -> bool {
        matches!(self, AuthState::PendingSetup(_))
    }
}

/// Everything stored for one browser session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSession {
    pub id: String,
    pub auth: AuthState,
    /// Candidate TOTP secret during enrollment. Never persisted to the user.
    #[serde(default)]
    pub pending_2fa_secret: Option<String>,
    pub read_notifications: RecentIdSet,
    pub viewed_emergencies: RecentIdSet,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    pub fn new(id: String, ttl: Duration, id_capacity: usize, now: DateTime<Utc>) -> Self {
        Self {
            id,
            auth: AuthState::AwaitingCredentials,
            pending_2fa_secret: None,
            read_notifications: RecentIdSet::with_capacity(id_capacity),
            viewed_emergencies: RecentIdSet::with_capacity(id_capacity),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn touch(&mut self, ttl: Duration, now: DateTime<Utc>) {
        self.expires_at = now + ttl;
    }

    /// Drops all per-session state.
    pub fn reset(&mut self) {
        self.auth = AuthState::AwaitingCredentials;
        self.pending_2fa_secret = None;
        self.read_notifications.clear();
        self.viewed_emergencies.clear();
    }
}
