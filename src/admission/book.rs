//! Per-event engine state
//!
//! An [`EventBook`] is only ever touched through the event's lock in
//! [`CapacityLedger`](super::capacity::CapacityLedger). Operations are planned
//! against a borrowed book, persisted, and only then applied, so a failed
//! commit leaves the book exactly as it was.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{AttendanceRecord, CheckinToken, Event, Registration, RegistrationStatus};
use super::capacity::CapacityCounter;
use super::store::{Changeset, StoredEventState, Write};

/// The planned result of an operation
#[derive(Debug, Clone)]
pub struct Transition<T> {
    pub changeset: Changeset,
    /// Counter state after the operation
    pub capacity: CapacityCounter,
    pub outcome: T,
}

#[derive(Debug)]
pub struct EventBook {
    event_id: i64,
    loaded: bool,
    capacity: CapacityCounter,
    /// Full history in creation order, cancelled rows included
    registrations: Vec<Registration>,
    attendance: HashMap<i64, AttendanceRecord>,
    tokens: Vec<CheckinToken>,
}

impl EventBook {
    pub fn new(event_id: i64) -> Self {
        Self {
            event_id,
            loaded: false,
            capacity: CapacityCounter::default(),
            registrations: Vec::new(),
            attendance: HashMap::new(),
            tokens: Vec::new(),
        }
    }

    pub fn event_id(&self) -> i64 {
        self.event_id
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn hydrate(&mut self, state: StoredEventState) {
        let mut registrations = state.registrations;
        registrations.sort_by_key(|registration| registration.created_at);

        self.registrations = registrations;
        self.attendance = state
            .attendance
            .into_iter()
            .map(|record| (record.user_id, record))
            .collect();
        self.tokens = state.tokens;
        self.capacity = CapacityCounter::new(self.capacity.max_attendees(), self.counted_attendees());
        self.loaded = true;
    }

    /// Forget the loaded rows; the next entry hydrates again
    pub fn unload(&mut self) {
        self.loaded = false;
    }

    /// Pick up the latest capacity from the authoring side
    pub fn sync_event(&mut self, event: &Event) {
        self.capacity.set_limit(event.capacity());
    }

    pub fn capacity(&self) -> CapacityCounter {
        self.capacity
    }

    /// The counter as it stands under `event`'s current limit
    pub fn capacity_for(&self, event: &Event) -> CapacityCounter {
        let mut capacity = self.capacity;
        capacity.set_limit(event.capacity());
        capacity
    }

    pub fn current_attendees(&self) -> u32 {
        self.capacity.current_attendees()
    }

    /// Confirmed registrations plus registration-free check-ins, counted from rows
    pub fn counted_attendees(&self) -> u32 {
        let confirmed = self
            .registrations
            .iter()
            .filter(|registration| registration.status == RegistrationStatus::Confirmed)
            .count();
        let walk_ins = self
            .attendance
            .values()
            .filter(|record| record.registration_id.is_none() && record.status.has_attended())
            .count();
        u32::try_from(confirmed + walk_ins).unwrap_or(u32::MAX)
    }

    pub fn active_registration(&self, user_id: i64) -> Option<&Registration> {
        self.registrations
            .iter()
            .find(|registration| registration.user_id == user_id && registration.status.is_active())
    }

    pub fn confirmed_registration(&self, user_id: i64) -> Option<&Registration> {
        self.active_registration(user_id)
            .filter(|registration| registration.status == RegistrationStatus::Confirmed)
    }

    /// Whether the user already holds a slot through a registration-free check-in
    pub fn holds_walk_in_slot(&self, user_id: i64) -> bool {
        self.attendance(user_id)
            .is_some_and(|record| record.registration_id.is_none() && record.status.has_attended())
    }

    pub fn earliest_waitlisted(&self) -> Option<&Registration> {
        self.registrations
            .iter()
            .find(|registration| registration.status == RegistrationStatus::Waitlisted)
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn attendance(&self, user_id: i64) -> Option<&AttendanceRecord> {
        self.attendance.get(&user_id)
    }

    pub fn attendance_records(&self) -> impl Iterator<Item = &AttendanceRecord> {
        self.attendance.values()
    }

    pub fn find_token(&self, token: &str) -> Option<&CheckinToken> {
        self.tokens.iter().find(|candidate| candidate.id == token)
    }

    pub fn usable_token(&self, now: DateTime<Utc>) -> Option<&CheckinToken> {
        self.tokens.iter().find(|token| token.is_usable(now))
    }

    /// Tokens not yet revoked, expired ones included
    pub fn unrevoked_tokens(&self) -> impl Iterator<Item = &CheckinToken> {
        self.tokens.iter().filter(|token| !token.revoked)
    }

    /// Apply a committed transition
    pub fn apply(&mut self, changeset: Changeset, capacity: CapacityCounter) {
        for write in changeset.writes {
            match write {
                Write::Registration(registration) => {
                    match self.registrations.iter_mut().find(|existing| existing.id == registration.id) {
                        Some(existing) => *existing = registration,
                        None => self.registrations.push(registration),
                    }
                }
                Write::Attendance(record) => {
                    self.attendance.insert(record.user_id, record);
                }
                Write::RemoveAttendance(id) => {
                    self.attendance.retain(|_, record| record.id != id);
                }
                Write::Token(token) => match self.tokens.iter_mut().find(|existing| existing.id == token.id) {
                    Some(existing) => *existing = token,
                    None => self.tokens.push(token),
                },
            }
        }
        self.capacity = capacity;

        debug_assert_eq!(
            self.capacity.current_attendees(),
            self.counted_attendees(),
            "capacity counter drifted from rows for event {}",
            self.event_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;
    use chrono::Duration;

    #[test]
    fn test_hydrate_recounts_from_rows() {
        let now = Utc::now();
        let confirmed = Registration {
            status: RegistrationStatus::Confirmed,
            ..Registration::pending(1, 10, now)
        };
        let waitlisted = Registration {
            status: RegistrationStatus::Waitlisted,
            ..Registration::pending(1, 11, now + Duration::seconds(1))
        };
        let cancelled = Registration {
            status: RegistrationStatus::Cancelled,
            ..Registration::pending(1, 12, now - Duration::seconds(5))
        };
        let walk_in = AttendanceRecord {
            status: AttendanceStatus::CheckedOut,
            check_in_at: Some(now),
            check_out_at: Some(now),
            ..AttendanceRecord::registered(1, 13, None)
        };
        let pending_walk_in = AttendanceRecord::registered(1, 14, None);

        let mut book = EventBook::new(1);
        book.hydrate(StoredEventState {
            registrations: vec![waitlisted.clone(), confirmed.clone(), cancelled.clone()],
            attendance: vec![walk_in, pending_walk_in],
            tokens: vec![],
        });

        assert!(book.is_loaded());
        assert_eq!(book.current_attendees(), 2);
        assert_eq!(book.registrations()[0].id, cancelled.id);
        assert_eq!(book.earliest_waitlisted().map(|r| r.id), Some(waitlisted.id));
        assert_eq!(book.active_registration(10).map(|r| r.id), Some(confirmed.id));
        assert!(book.active_registration(12).is_none());
    }

    #[test]
    fn test_usable_token_skips_revoked_and_expired() {
        let now = Utc::now();
        let expired = CheckinToken {
            id: "old".to_string(),
            event_id: 1,
            issued_at: now - Duration::hours(3),
            expires_at: now - Duration::hours(1),
            revoked: false,
        };
        let revoked = CheckinToken {
            id: "revoked".to_string(),
            expires_at: now + Duration::hours(1),
            revoked: true,
            ..expired.clone()
        };
        let live = CheckinToken {
            id: "live".to_string(),
            expires_at: now + Duration::hours(1),
            ..expired.clone()
        };

        let mut book = EventBook::new(1);
        book.hydrate(StoredEventState {
            registrations: vec![],
            attendance: vec![],
            tokens: vec![expired, revoked, live],
        });

        assert_eq!(book.usable_token(now).map(|t| t.id.as_str()), Some("live"));
        assert_eq!(book.unrevoked_tokens().count(), 2);
        assert!(book.find_token("revoked").is_some());
        assert!(book.find_token("missing").is_none());
    }
}
