//! Admission coordinator
//!
//! The single entry point clients call to ask "can X happen now" and to make
//! it happen. Every state-changing operation runs the same sequence:
//!
//! 1. read the event from the catalog (outside any lock),
//! 2. enter the event's critical section in the [`CapacityLedger`],
//! 3. plan the transition against the current book and clock,
//! 4. commit the planned writes to the store,
//! 5. apply them to the book.
//!
//! A rejection in step 3 or a failure in step 4 leaves nothing changed.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::validation::validate_admission_config;
use crate::config::AdmissionConfig;
use url::Url;

use crate::models::{
    AttendanceRecord, CheckinPass, Event, EventSnapshot, EventStatus, Registration, TokenStatus,
};
use crate::utils::errors::{AdmissionError, AdmissionResult, EngineError};
use crate::utils::helpers::{checkin_deep_link, format_timestamp, generate_token, redact_token};
use crate::utils::logging::{
    log_admission_decision, log_admission_rejection, log_store_operation, log_token_action,
};
use super::book::{EventBook, Transition};
use super::capacity::CapacityLedger;
use super::clock::Clock;
use super::store::{AdmissionStore, EventCatalog};
use super::token::ImageRenderer;
use super::{attendance, registration, token};

pub struct AdmissionCoordinator {
    catalog: Arc<dyn EventCatalog>,
    store: Arc<dyn AdmissionStore>,
    clock: Arc<dyn Clock>,
    ledger: CapacityLedger,
    config: AdmissionConfig,
    checkin_base_url: Url,
    renderer: Option<Arc<dyn ImageRenderer>>,
}

impl std::fmt::Debug for AdmissionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionCoordinator")
            .field("ledger", &self.ledger)
            .field("config", &self.config)
            .field("renderer", &self.renderer.is_some())
            .finish_non_exhaustive()
    }
}

impl AdmissionCoordinator {
    pub fn new(
        catalog: Arc<dyn EventCatalog>,
        store: Arc<dyn AdmissionStore>,
        clock: Arc<dyn Clock>,
        config: AdmissionConfig,
    ) -> Result<Self, EngineError> {
        validate_admission_config(&config)?;
        let checkin_base_url = Url::parse(&config.checkin_base_url)?;
        Ok(Self {
            catalog,
            store,
            clock,
            ledger: CapacityLedger::new(config.lock_timeout()),
            config,
            checkin_base_url,
            renderer: None,
        })
    }

    /// Attach an image renderer for check-in passes
    pub fn with_renderer(mut self, renderer: Arc<dyn ImageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    async fn load_event(&self, event_id: i64) -> AdmissionResult<Event> {
        self.catalog
            .find_event(event_id)
            .await?
            .ok_or(AdmissionError::EventNotFound { event_id })
    }

    /// Run one planned operation inside the event's critical section
    async fn mutate<T, F>(&self, event_id: i64, event: &Event, plan: F) -> AdmissionResult<T>
    where
        F: FnOnce(&EventBook, DateTime<Utc>) -> AdmissionResult<Transition<T>>,
    {
        let mut book = self.ledger.enter(event_id, self.store.as_ref()).await?;
        book.sync_event(event);

        let now = self.clock.now();
        let transition = plan(&*book, now)?;

        if !transition.changeset.is_empty() {
            let started = Instant::now();
            let committed = self.store.commit(event_id, &transition.changeset).await;
            let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            log_store_operation("commit", event_id, elapsed, committed.is_ok());
            committed?;
        }

        book.apply(transition.changeset, transition.capacity);
        Ok(transition.outcome)
    }

    /// Run a read-only query against the event's book
    async fn observe<T, F>(&self, event_id: i64, query: F) -> AdmissionResult<T>
    where
        F: FnOnce(&EventBook, DateTime<Utc>) -> AdmissionResult<T>,
    {
        let book = self.ledger.observe(event_id, self.store.as_ref()).await?;
        let now = self.clock.now();
        query(&*book, now)
    }

    fn report<T>(&self, event_id: i64, user_id: Option<i64>, action: &str, result: &AdmissionResult<T>) {
        if let Err(err) = result {
            log_admission_rejection(event_id, user_id, action, err);
        }
    }

    /// Register a user for an event that requires registration
    ///
    /// Returns the new registration, `confirmed` when a slot was granted and
    /// `waitlisted` otherwise.
    pub async fn register(&self, event_id: i64, user_id: i64) -> AdmissionResult<Registration> {
        let result = async {
            let event = self.load_event(event_id).await?;
            self.mutate(event_id, &event, |book, now| registration::register(book, &event, user_id, now))
                .await
        }
        .await;

        match &result {
            Ok(registration) => log_admission_decision(event_id, user_id, "register", registration.status.as_str()),
            Err(_) => self.report(event_id, Some(user_id), "register", &result),
        }
        result
    }

    /// Cancel the user's active registration before the event starts
    ///
    /// Freeing a confirmed slot promotes the earliest waitlisted registration;
    /// whether or not that succeeds does not affect the cancelling user.
    pub async fn cancel_registration(&self, event_id: i64, user_id: i64) -> AdmissionResult<()> {
        let result = async {
            let event = self.load_event(event_id).await?;
            self.mutate(event_id, &event, |book, now| registration::cancel(book, &event, user_id, now))
                .await
        }
        .await;

        match &result {
            Ok(cancellation) => {
                log_admission_decision(event_id, user_id, "cancel", cancellation.cancelled.status.as_str());
                if let Some(promoted) = &cancellation.promoted {
                    log_admission_decision(event_id, promoted.user_id, "promote", promoted.status.as_str());
                }
            }
            Err(_) => self.report(event_id, Some(user_id), "cancel", &result),
        }
        result.map(|_| ())
    }

    /// Confirm the earliest waitlisted registration if capacity allows
    pub async fn promote_waitlist(&self, event_id: i64) -> AdmissionResult<Option<Registration>> {
        let result = async {
            let event = self.load_event(event_id).await?;
            self.mutate(event_id, &event, |book, now| Ok(registration::promote_waitlist(book, &event, now)))
                .await
        }
        .await;

        match &result {
            Ok(Some(promoted)) => log_admission_decision(event_id, promoted.user_id, "promote", promoted.status.as_str()),
            Ok(None) => debug!(event_id = event_id, "No waitlisted registration promoted"),
            Err(_) => self.report(event_id, None, "promote", &result),
        }
        result
    }

    /// Mark the user as checked in to an ongoing event
    pub async fn mark_attendance(&self, event_id: i64, user_id: i64) -> AdmissionResult<AttendanceRecord> {
        let result = async {
            let event = self.load_event(event_id).await?;
            self.mutate(event_id, &event, |book, now| attendance::mark_attendance(book, &event, user_id, now))
                .await
        }
        .await;

        match &result {
            Ok(record) => log_admission_decision(event_id, user_id, "mark_attendance", record.status.as_str()),
            Err(_) => self.report(event_id, Some(user_id), "mark_attendance", &result),
        }
        result
    }

    /// Mark a checked-in user as having left
    pub async fn check_out(&self, event_id: i64, user_id: i64) -> AdmissionResult<AttendanceRecord> {
        let result = async {
            let event = self.load_event(event_id).await?;
            self.mutate(event_id, &event, |book, now| attendance::check_out(book, &event, user_id, now))
                .await
        }
        .await;

        match &result {
            Ok(record) => log_admission_decision(event_id, user_id, "check_out", record.status.as_str()),
            Err(_) => self.report(event_id, Some(user_id), "check_out", &result),
        }
        result
    }

    /// Issue a new check-in token, revoking the previous one
    ///
    /// `expiry_hours` defaults to the configured lifetime and is clamped into
    /// the configured range (1..=168 by default).
    pub async fn issue_checkin_token(&self, event_id: i64, expiry_hours: Option<u32>) -> AdmissionResult<CheckinPass> {
        let hours = self.config.clamp_expiry_hours(expiry_hours);
        let result = async {
            let event = self.load_event(event_id).await?;
            let candidate = generate_token();
            self.mutate(event_id, &event, |book, now| token::issue(book, &event, candidate, hours, now))
                .await
        }
        .await;

        let issued = match result {
            Ok(issued) => issued,
            Err(err) => {
                log_admission_rejection(event_id, None, "issue_token", &err);
                return Err(err);
            }
        };
        log_token_action(
            event_id,
            "issue",
            Some(&format!(
                "token {} valid until {}",
                redact_token(&issued.id),
                format_timestamp(issued.expires_at)
            )),
        );

        let deep_link = checkin_deep_link(&self.checkin_base_url, event_id, &issued.id).to_string();

        // Rendering is external I/O and runs after the event lock is released
        let image = match &self.renderer {
            Some(renderer) => match renderer.render(&deep_link).await {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!(event_id = event_id, error = %e, "Failed to render check-in image");
                    None
                }
            },
            None => None,
        };

        Ok(CheckinPass {
            event_id,
            token: issued.id,
            expires_at: issued.expires_at,
            qr_payload: deep_link.clone(),
            deep_link,
            image,
        })
    }

    /// Metadata of the currently usable token, if any
    pub async fn get_checkin_token_status(&self, event_id: i64) -> AdmissionResult<Option<TokenStatus>> {
        self.load_event(event_id).await?;
        self.observe(event_id, |book, now| Ok(token::status(book, now))).await
    }

    /// Revoke the currently usable token; succeeds when there is none
    pub async fn revoke_checkin_token(&self, event_id: i64) -> AdmissionResult<()> {
        let result = async {
            let event = self.load_event(event_id).await?;
            self.mutate(event_id, &event, |book, now| Ok(token::revoke(book, now))).await
        }
        .await;

        match &result {
            Ok(Some(revoked)) => log_token_action(event_id, "revoke", Some(&redact_token(&revoked.id))),
            Ok(None) => debug!(event_id = event_id, "No usable check-in token to revoke"),
            Err(_) => self.report(event_id, None, "revoke_token", &result),
        }
        result.map(|_| ())
    }

    /// Validate a scanned token without side effects
    pub async fn validate_checkin_token(&self, event_id: i64, scanned: &str) -> AdmissionResult<EventSnapshot> {
        let result = async {
            let event = self.load_event(event_id).await?;
            self.observe(event_id, |book, now| token::validate(book, &event, scanned, now)).await
        }
        .await;

        self.report(event_id, None, "validate_token", &result);
        result
    }

    /// Check a user in with a scanned token
    ///
    /// The token is validated again inside the critical section, so a token
    /// revoked or expired after the first check cannot admit anyone. Token
    /// validity does not bypass any attendance rule.
    pub async fn checkin_with_token(&self, event_id: i64, scanned: &str, user_id: i64) -> AdmissionResult<AttendanceRecord> {
        let result = async {
            let event = self.load_event(event_id).await?;
            // Cheap early rejection under the shared lock
            self.observe(event_id, |book, now| token::validate(book, &event, scanned, now)).await?;
            self.mutate(event_id, &event, |book, now| {
                token::validate(book, &event, scanned, now)?;
                attendance::mark_attendance(book, &event, user_id, now)
            })
            .await
        }
        .await;

        match &result {
            Ok(record) => {
                info!(event_id = event_id, user_id = user_id, token = %redact_token(scanned), "Checked in with token");
                log_admission_decision(event_id, user_id, "checkin_with_token", record.status.as_str());
            }
            Err(_) => self.report(event_id, Some(user_id), "checkin_with_token", &result),
        }
        result
    }

    pub async fn get_registration(&self, event_id: i64, user_id: i64) -> AdmissionResult<Option<Registration>> {
        self.load_event(event_id).await?;
        self.observe(event_id, |book, _| Ok(book.active_registration(user_id).cloned()))
            .await
    }

    /// Attendance record with the no-show classification applied
    pub async fn get_attendance(&self, event_id: i64, user_id: i64) -> AdmissionResult<Option<AttendanceRecord>> {
        let event = self.load_event(event_id).await?;
        self.observe(event_id, |book, now| {
            Ok(book.attendance(user_id).map(|record| record.classified(&event, now)))
        })
        .await
    }

    pub async fn list_attendance(&self, event_id: i64) -> AdmissionResult<Vec<AttendanceRecord>> {
        let event = self.load_event(event_id).await?;
        self.observe(event_id, |book, now| {
            let mut records: Vec<AttendanceRecord> = book
                .attendance_records()
                .map(|record| record.classified(&event, now))
                .collect();
            records.sort_by_key(|record| (record.check_in_at.is_none(), record.check_in_at, record.user_id));
            Ok(records)
        })
        .await
    }

    pub async fn current_attendees(&self, event_id: i64) -> AdmissionResult<u32> {
        self.load_event(event_id).await?;
        self.observe(event_id, |book, _| Ok(book.current_attendees())).await
    }

    /// Reload the event's admission state from the store on next use
    pub async fn reload_event(&self, event_id: i64) -> AdmissionResult<()> {
        self.ledger.invalidate(event_id).await
    }

    pub async fn event_status(&self, event_id: i64) -> AdmissionResult<EventStatus> {
        let event = self.load_event(event_id).await?;
        Ok(event.status(self.clock.now()))
    }

    /// `Ok(())` iff [`register`](Self::register) would currently succeed
    pub async fn can_register(&self, event_id: i64, user_id: i64) -> AdmissionResult<()> {
        let event = self.load_event(event_id).await?;
        self.observe(event_id, |book, now| registration::check_can_register(book, &event, user_id, now))
            .await
    }

    /// `Ok(())` iff [`cancel_registration`](Self::cancel_registration) would currently succeed
    pub async fn can_cancel(&self, event_id: i64, user_id: i64) -> AdmissionResult<()> {
        let event = self.load_event(event_id).await?;
        self.observe(event_id, |book, now| registration::check_can_cancel(book, &event, user_id, now))
            .await
    }

    /// `Ok(())` iff [`mark_attendance`](Self::mark_attendance) would currently succeed
    pub async fn can_mark_attendance(&self, event_id: i64, user_id: i64) -> AdmissionResult<()> {
        let event = self.load_event(event_id).await?;
        self.observe(event_id, |book, now| attendance::check_can_mark_attendance(book, &event, user_id, now))
            .await
    }
}
