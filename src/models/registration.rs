//! Registration model

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub event_id: i64,
    pub user_id: i64,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
}

/// Registration lifecycle: `pending -> {confirmed, waitlisted} -> cancelled`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Waitlisted,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Confirmed => "confirmed",
            RegistrationStatus::Waitlisted => "waitlisted",
            RegistrationStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the registration still occupies the user's single active slot
    pub fn is_active(&self) -> bool {
        !matches!(self, RegistrationStatus::Cancelled)
    }

    /// Allowed transitions of the registration state machine
    pub fn can_transition_to(&self, next: RegistrationStatus) -> bool {
        use RegistrationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Waitlisted)
                | (Waitlisted, Confirmed)
                | (Confirmed, Cancelled)
                | (Waitlisted, Cancelled)
        )
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RegistrationStatus::Pending),
            "confirmed" => Ok(RegistrationStatus::Confirmed),
            "waitlisted" => Ok(RegistrationStatus::Waitlisted),
            "cancelled" => Ok(RegistrationStatus::Cancelled),
            other => Err(format!("unknown registration status: {}", other)),
        }
    }
}

impl Registration {
    /// Start a new registration in the `pending` state
    pub fn pending(event_id: i64, user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            status: RegistrationStatus::Pending,
            created_at: now,
        }
    }

    /// Move to `next`, returning the updated row, or `None` if the move is illegal
    pub fn transitioned(&self, next: RegistrationStatus) -> Option<Self> {
        if !self.status.can_transition_to(next) {
            return None;
        }
        Some(Self { status: next, ..self.clone() })
    }
}

impl<'r> FromRow<'r, PgRow> for Registration {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            event_id: row.try_get("event_id")?,
            user_id: row.try_get("user_id")?,
            status: RegistrationStatus::from_str(&status).map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: e.into(),
            })?,
            created_at: row.try_get("created_at")?,
        })
    }
}
