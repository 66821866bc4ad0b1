//! Registration state machine
//!
//! Planners here are pure: they read an [`EventBook`] and return the
//! [`Transition`] an operation would make, or the domain error it fails with.

use chrono::{DateTime, Utc};

use crate::models::{AttendanceRecord, Event, EventStatus, Registration, RegistrationStatus};
use crate::utils::errors::{AdmissionError, AdmissionResult};
use super::book::{EventBook, Transition};
use super::capacity::{Admission, CapacityCounter};
use super::store::{Changeset, Write};

/// What a successful cancellation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    pub cancelled: Registration,
    /// Waitlisted registration confirmed into the freed slot
    pub promoted: Option<Registration>,
}

/// Eligibility check shared by [`register`] and the coordinator's predicate
pub fn check_can_register(book: &EventBook, event: &Event, user_id: i64, now: DateTime<Utc>) -> AdmissionResult<()> {
    if !event.is_active {
        return Err(AdmissionError::EventInactive);
    }
    if !event.registration_required {
        return Err(AdmissionError::RegistrationNotRequired);
    }
    match event.status(now) {
        EventStatus::Past => return Err(AdmissionError::RegistrationClosed),
        EventStatus::Ongoing if event.registration_deadline_passed(now) => {
            return Err(AdmissionError::RegistrationClosed)
        }
        _ => {}
    }
    if book.active_registration(user_id).is_some() {
        return Err(AdmissionError::AlreadyRegistered);
    }
    Ok(())
}

pub fn register(
    book: &EventBook,
    event: &Event,
    user_id: i64,
    now: DateTime<Utc>,
) -> AdmissionResult<Transition<Registration>> {
    check_can_register(book, event, user_id, now)?;

    let mut capacity = book.capacity_for(event);
    let mut changeset = Changeset::new();
    let pending = Registration::pending(event.id, user_id, now);

    // A user already checked in without registration keeps the slot they hold
    let next = if book.holds_walk_in_slot(user_id) {
        RegistrationStatus::Confirmed
    } else {
        match capacity.try_admit() {
            Admission::Granted => RegistrationStatus::Confirmed,
            Admission::Denied => RegistrationStatus::Waitlisted,
        }
    };
    let registration = transition(&pending, next)?;

    changeset.push(Write::Registration(registration.clone()));
    if registration.status == RegistrationStatus::Confirmed {
        changeset.push(Write::Attendance(attendance_for(book, &registration)));
    }

    Ok(Transition { changeset, capacity, outcome: registration })
}

pub fn check_can_cancel(book: &EventBook, event: &Event, user_id: i64, now: DateTime<Utc>) -> AdmissionResult<()> {
    if book.active_registration(user_id).is_none() {
        return Err(AdmissionError::NoActiveRegistration);
    }
    if event.status(now) != EventStatus::Upcoming {
        return Err(AdmissionError::CancellationWindowClosed);
    }
    Ok(())
}

pub fn cancel(
    book: &EventBook,
    event: &Event,
    user_id: i64,
    now: DateTime<Utc>,
) -> AdmissionResult<Transition<Cancellation>> {
    check_can_cancel(book, event, user_id, now)?;
    let current = book.active_registration(user_id).ok_or(AdmissionError::NoActiveRegistration)?;

    let mut capacity = book.capacity_for(event);
    let mut changeset = Changeset::new();
    let cancelled = transition(current, RegistrationStatus::Cancelled)?;
    changeset.push(Write::Registration(cancelled.clone()));

    if let Some(record) = book.attendance(user_id) {
        changeset.push(Write::RemoveAttendance(record.id));
    }

    let mut promoted = None;
    if current.status == RegistrationStatus::Confirmed {
        capacity.release();
        promoted = promote_next(book, event, now, &mut capacity, &mut changeset);
    }

    Ok(Transition {
        changeset,
        capacity,
        outcome: Cancellation { cancelled, promoted },
    })
}

/// Waitlist promotion hook
///
/// Confirms the earliest waitlisted registration if the ledger grants a slot.
/// Yields `None` when there is nobody waiting, no room, or the event is over.
pub fn promote_waitlist(book: &EventBook, event: &Event, now: DateTime<Utc>) -> Transition<Option<Registration>> {
    let mut capacity = book.capacity_for(event);
    let mut changeset = Changeset::new();
    let promoted = promote_next(book, event, now, &mut capacity, &mut changeset);
    Transition { changeset, capacity, outcome: promoted }
}

fn promote_next(
    book: &EventBook,
    event: &Event,
    now: DateTime<Utc>,
    capacity: &mut CapacityCounter,
    changeset: &mut Changeset,
) -> Option<Registration> {
    if !event.is_active || event.status(now) == EventStatus::Past {
        return None;
    }
    let candidate = book.earliest_waitlisted()?;
    if !book.holds_walk_in_slot(candidate.user_id) && capacity.try_admit() == Admission::Denied {
        return None;
    }

    let promoted = candidate.transitioned(RegistrationStatus::Confirmed)?;
    changeset.push(Write::Registration(promoted.clone()));
    changeset.push(Write::Attendance(attendance_for(book, &promoted)));
    Some(promoted)
}

/// Attendance row that accompanies a confirmed registration
fn attendance_for(book: &EventBook, registration: &Registration) -> AttendanceRecord {
    match book.attendance(registration.user_id) {
        Some(existing) => AttendanceRecord {
            registration_id: Some(registration.id),
            ..existing.clone()
        },
        None => AttendanceRecord::registered(registration.event_id, registration.user_id, Some(registration.id)),
    }
}

fn transition(registration: &Registration, next: RegistrationStatus) -> AdmissionResult<Registration> {
    registration.transitioned(next).ok_or_else(|| {
        // Unreachable through the planners above
        tracing::error!(
            registration_id = %registration.id,
            from = %registration.status,
            to = %next,
            "Illegal registration transition"
        );
        AdmissionError::NoActiveRegistration
    })
}
