//! Event model
//!
//! Events are authored elsewhere; the engine only reads them. Their
//! lifecycle status is derived from the clock and never stored.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub location: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Absent means unlimited
    pub max_attendees: Option<i32>,
    pub registration_required: bool,
    /// Only meaningful when `registration_required` is set
    pub registration_deadline: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Time-derived lifecycle status of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Past,
}

impl Event {
    /// Derive the status at `now`. Both window bounds count as ongoing.
    pub fn status(&self, now: DateTime<Utc>) -> EventStatus {
        if now < self.start_at {
            EventStatus::Upcoming
        } else if now <= self.end_at {
            EventStatus::Ongoing
        } else {
            EventStatus::Past
        }
    }

    /// Capacity as an unsigned limit; non-positive values are treated as zero seats
    pub fn capacity(&self) -> Option<u32> {
        self.max_attendees.map(|max| u32::try_from(max).unwrap_or(0))
    }

    pub fn registration_deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.registration_deadline.is_some_and(|deadline| now > deadline)
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Upcoming => write!(f, "upcoming"),
            EventStatus::Ongoing => write!(f, "ongoing"),
            EventStatus::Past => write!(f, "past"),
        }
    }
}

/// Read-only view returned by a successful token validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub event_id: i64,
    pub title: String,
    pub location: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: EventStatus,
    pub max_attendees: Option<i32>,
    pub current_attendees: u32,
    pub registration_required: bool,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub token_expires_at: DateTime<Utc>,
    pub is_valid: bool,
}
