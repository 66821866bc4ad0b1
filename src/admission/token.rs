//! Check-in token service
//!
//! At most one token per event is usable at a time. Issuing revokes every
//! token of the event that is not already revoked, expired ones included, so
//! the "one unrevoked token per event" constraint holds in storage too.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::models::{CheckinToken, Event, EventSnapshot, EventStatus, TokenStatus};
use crate::utils::errors::{AdmissionError, AdmissionResult};
use super::book::{EventBook, Transition};
use super::store::{Changeset, Write};

/// Turns a check-in payload into a scannable image
///
/// Rendering happens outside the event's critical section.
#[async_trait]
pub trait ImageRenderer: Send + Sync {
    async fn render(&self, payload: &str) -> Result<String, String>;
}

pub fn issue(
    book: &EventBook,
    event: &Event,
    token: String,
    expiry_hours: u32,
    now: DateTime<Utc>,
) -> AdmissionResult<Transition<CheckinToken>> {
    if !event.is_active {
        return Err(AdmissionError::EventInactive);
    }
    if event.status(now) == EventStatus::Past {
        return Err(AdmissionError::EventEnded);
    }

    let mut changeset = revocations(book);
    let issued = CheckinToken {
        id: token,
        event_id: event.id,
        issued_at: now,
        expires_at: now + Duration::hours(i64::from(expiry_hours)),
        revoked: false,
    };
    changeset.push(Write::Token(issued.clone()));

    Ok(Transition {
        changeset,
        capacity: book.capacity(),
        outcome: issued,
    })
}

/// Revoke the current token; a no-op when nothing is usable
pub fn revoke(book: &EventBook, now: DateTime<Utc>) -> Transition<Option<CheckinToken>> {
    let revoked = book.usable_token(now).map(CheckinToken::revoked);
    let changeset = if revoked.is_some() { revocations(book) } else { Changeset::new() };
    Transition {
        changeset,
        capacity: book.capacity(),
        outcome: revoked,
    }
}

fn revocations(book: &EventBook) -> Changeset {
    let mut changeset = Changeset::new();
    for token in book.unrevoked_tokens() {
        changeset.push(Write::Token(token.revoked()));
    }
    changeset
}

pub fn status(book: &EventBook, now: DateTime<Utc>) -> Option<TokenStatus> {
    book.usable_token(now).map(|token| TokenStatus::of(token, now))
}

/// Check a scanned token without touching any state
///
/// Not found, revoked and expired are reported distinctly, in that order.
pub fn validate(book: &EventBook, event: &Event, token: &str, now: DateTime<Utc>) -> AdmissionResult<EventSnapshot> {
    let found = book.find_token(token).ok_or(AdmissionError::TokenNotFound)?;
    if found.revoked {
        return Err(AdmissionError::TokenRevoked);
    }
    if now >= found.expires_at {
        return Err(AdmissionError::TokenExpired);
    }

    Ok(EventSnapshot {
        event_id: event.id,
        title: event.title.clone(),
        location: event.location.clone(),
        start_at: event.start_at,
        end_at: event.end_at,
        status: event.status(now),
        max_attendees: event.max_attendees,
        current_attendees: book.current_attendees(),
        registration_required: event.registration_required,
        registration_deadline: event.registration_deadline,
        token_expires_at: found.expires_at,
        is_valid: true,
    })
}
