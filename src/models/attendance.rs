//! Attendance record model

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::event::{Event, EventStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub event_id: i64,
    pub user_id: i64,
    /// `None` for events that do not require registration
    pub registration_id: Option<Uuid>,
    pub status: AttendanceStatus,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
}

/// Physical attendance lifecycle
///
/// `NoShow` is never stored; it is how a `Registered` record reads once the
/// event is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Registered,
    CheckedIn,
    CheckedOut,
    NoShow,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Registered => "registered",
            AttendanceStatus::CheckedIn => "checked_in",
            AttendanceStatus::CheckedOut => "checked_out",
            AttendanceStatus::NoShow => "no_show",
        }
    }

    /// Checked in at some point, whether or not the user has left
    pub fn has_attended(&self) -> bool {
        matches!(self, AttendanceStatus::CheckedIn | AttendanceStatus::CheckedOut)
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(AttendanceStatus::Registered),
            "checked_in" => Ok(AttendanceStatus::CheckedIn),
            "checked_out" => Ok(AttendanceStatus::CheckedOut),
            "no_show" => Ok(AttendanceStatus::NoShow),
            other => Err(format!("unknown attendance status: {}", other)),
        }
    }
}

impl AttendanceRecord {
    pub fn registered(event_id: i64, user_id: i64, registration_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            registration_id,
            status: AttendanceStatus::Registered,
            check_in_at: None,
            check_out_at: None,
        }
    }

    /// Status as seen at `now`, classifying stale `registered` rows as no-shows
    pub fn effective_status(&self, event: &Event, now: DateTime<Utc>) -> AttendanceStatus {
        if self.status == AttendanceStatus::Registered && event.status(now) == EventStatus::Past {
            AttendanceStatus::NoShow
        } else {
            self.status
        }
    }

    /// Copy of this record with the no-show classification applied
    pub fn classified(&self, event: &Event, now: DateTime<Utc>) -> Self {
        Self {
            status: self.effective_status(event, now),
            ..self.clone()
        }
    }
}

impl<'r> FromRow<'r, PgRow> for AttendanceRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            event_id: row.try_get("event_id")?,
            user_id: row.try_get("user_id")?,
            registration_id: row.try_get("registration_id")?,
            status: AttendanceStatus::from_str(&status).map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: e.into(),
            })?,
            check_in_at: row.try_get("check_in_at")?,
            check_out_at: row.try_get("check_out_at")?,
        })
    }
}
