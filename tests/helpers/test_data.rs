//! Test data helpers for creating events

use chrono::{DateTime, Duration, TimeZone, Utc};
use event_admission::models::Event;

/// Fixed reference start time used across scenarios
pub fn event_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 14, 19, 0, 0).unwrap()
}

/// Active three-hour event starting at [`event_start`]
pub fn create_test_event(id: i64, registration_required: bool, max_attendees: Option<i32>) -> Event {
    Event {
        id,
        title: format!("Test social #{}", id),
        location: Some("Main hall".to_string()),
        start_at: event_start(),
        end_at: event_start() + Duration::hours(3),
        max_attendees,
        registration_required,
        registration_deadline: None,
        is_active: true,
    }
}

/// Registration-required event with a limited number of slots
pub fn create_limited_event(id: i64, max_attendees: i32) -> Event {
    create_test_event(id, true, Some(max_attendees))
}

/// Registration-free event people simply walk into
pub fn create_walk_in_event(id: i64, max_attendees: Option<i32>) -> Event {
    create_test_event(id, false, max_attendees)
}
