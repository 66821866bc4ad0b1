//! Attendance state machine
//!
//! `registered -> checked_in -> checked_out`. A `registered` record of a past
//! event reads as `no_show`; that classification happens at query time (see
//! [`AttendanceRecord::effective_status`]) and is never written.

use chrono::{DateTime, Utc};

use crate::models::{AttendanceRecord, AttendanceStatus, Event, EventStatus};
use crate::utils::errors::{AdmissionError, AdmissionResult};
use super::book::{EventBook, Transition};
use super::capacity::Admission;
use super::store::{Changeset, Write};

fn check_event_running(event: &Event, now: DateTime<Utc>) -> AdmissionResult<()> {
    if !event.is_active {
        return Err(AdmissionError::EventInactive);
    }
    if event.status(now) != EventStatus::Ongoing {
        return Err(AdmissionError::EventNotOngoing);
    }
    Ok(())
}

/// The record a check-in would update, created lazily when missing
///
/// The record is linked to the user's confirmed registration whenever one
/// exists, even if the event no longer requires registration, so a slot the
/// registration already holds is never charged twice.
fn record_for_check_in(book: &EventBook, event: &Event, user_id: i64) -> AdmissionResult<AttendanceRecord> {
    let registration_id = book.confirmed_registration(user_id).map(|registration| registration.id);
    if event.registration_required && registration_id.is_none() {
        return Err(AdmissionError::NotRegistered);
    }

    Ok(match book.attendance(user_id) {
        Some(record) => AttendanceRecord {
            registration_id,
            ..record.clone()
        },
        None => AttendanceRecord::registered(event.id, user_id, registration_id),
    })
}

/// Eligibility check shared by [`mark_attendance`] and the coordinator's predicate
pub fn check_can_mark_attendance(
    book: &EventBook,
    event: &Event,
    user_id: i64,
    now: DateTime<Utc>,
) -> AdmissionResult<()> {
    mark_attendance(book, event, user_id, now).map(|_| ())
}

pub fn mark_attendance(
    book: &EventBook,
    event: &Event,
    user_id: i64,
    now: DateTime<Utc>,
) -> AdmissionResult<Transition<AttendanceRecord>> {
    check_event_running(event, now)?;
    let record = record_for_check_in(book, event, user_id)?;
    if record.check_in_at.is_some() || record.status.has_attended() {
        return Err(AdmissionError::AlreadyAttended);
    }

    let mut capacity = book.capacity_for(event);
    // Check-ins without a confirmed registration count attendees here and only here
    if record.registration_id.is_none() && capacity.try_admit() == Admission::Denied {
        return Err(AdmissionError::CapacityExceeded);
    }

    let checked_in = AttendanceRecord {
        status: AttendanceStatus::CheckedIn,
        check_in_at: Some(now),
        ..record
    };

    let mut changeset = Changeset::new();
    changeset.push(Write::Attendance(checked_in.clone()));
    Ok(Transition { changeset, capacity, outcome: checked_in })
}

pub fn check_out(
    book: &EventBook,
    event: &Event,
    user_id: i64,
    now: DateTime<Utc>,
) -> AdmissionResult<Transition<AttendanceRecord>> {
    check_event_running(event, now)?;
    let record = book
        .attendance(user_id)
        .filter(|record| record.status == AttendanceStatus::CheckedIn)
        .ok_or(AdmissionError::NotCheckedIn)?;

    let checked_out = AttendanceRecord {
        status: AttendanceStatus::CheckedOut,
        check_out_at: Some(now),
        ..record.clone()
    };

    let mut changeset = Changeset::new();
    changeset.push(Write::Attendance(checked_out.clone()));
    Ok(Transition {
        changeset,
        capacity: book.capacity(),
        outcome: checked_out,
    })
}
