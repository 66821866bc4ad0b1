//! Check-in token model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Short-lived, revocable credential scoped to one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CheckinToken {
    /// Opaque, unguessable token string
    pub id: String,
    pub event_id: i64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl CheckinToken {
    /// Usable iff not revoked and `now < expires_at`
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }

    pub fn revoked(&self) -> Self {
        Self { revoked: true, ..self.clone() }
    }
}

/// Metadata for the currently usable token of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStatus {
    pub event_id: i64,
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub remaining_seconds: i64,
}

impl TokenStatus {
    pub fn of(token: &CheckinToken, now: DateTime<Utc>) -> Self {
        Self {
            event_id: token.event_id,
            token: token.id.clone(),
            issued_at: token.issued_at,
            expires_at: token.expires_at,
            remaining_seconds: (token.expires_at - now).num_seconds().max(0),
        }
    }
}

/// Caller-facing result of issuing a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinPass {
    pub event_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub deep_link: String,
    /// String to encode into the scannable code
    pub qr_payload: String,
    /// Rendered image, when an image renderer is configured
    pub image: Option<String>,
}
