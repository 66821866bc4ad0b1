//! Persistence and event-catalog contracts
//!
//! The engine owns registrations, attendance records and check-in tokens and
//! writes them through [`AdmissionStore`]. Events come from the external
//! authoring side through [`EventCatalog`] and are never written here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{AttendanceRecord, CheckinToken, Event, Registration};
use crate::utils::errors::{AdmissionResult, TransientFailure};

/// Everything the engine has persisted for one event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredEventState {
    pub registrations: Vec<Registration>,
    pub attendance: Vec<AttendanceRecord>,
    pub tokens: Vec<CheckinToken>,
}

/// A single row write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    /// Insert or update by id
    Registration(Registration),
    /// Insert or update by id
    Attendance(AttendanceRecord),
    RemoveAttendance(Uuid),
    /// Insert or update by id
    Token(CheckinToken),
}

/// Writes produced by one operation, committed all-or-nothing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    pub writes: Vec<Write>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, write: Write) {
        self.writes.push(write);
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }
}

#[async_trait]
pub trait AdmissionStore: Send + Sync {
    async fn load(&self, event_id: i64) -> AdmissionResult<StoredEventState>;

    /// Persist every write of `changeset` atomically
    async fn commit(&self, event_id: i64, changeset: &Changeset) -> AdmissionResult<()>;
}

#[async_trait]
pub trait EventCatalog: Send + Sync {
    async fn find_event(&self, event_id: i64) -> AdmissionResult<Option<Event>>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    events: Mutex<HashMap<i64, StoredEventState>>,
    fail_commits: AtomicBool,
    loads: AtomicUsize,
    commits: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent commits fail with a transient error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.fail_commits.store(unavailable, Ordering::SeqCst);
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Copy of what has been persisted for an event
    pub fn snapshot(&self, event_id: i64) -> StoredEventState {
        self.lock().get(&event_id).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<i64, StoredEventState>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn upsert_by<T, F>(rows: &mut Vec<T>, row: &T, same: F)
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    match rows.iter_mut().find(|existing| same(existing, row)) {
        Some(existing) => *existing = row.clone(),
        None => rows.push(row.clone()),
    }
}

#[async_trait]
impl AdmissionStore for InMemoryStore {
    async fn load(&self, event_id: i64) -> AdmissionResult<StoredEventState> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot(event_id))
    }

    async fn commit(&self, event_id: i64, changeset: &Changeset) -> AdmissionResult<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(TransientFailure::StoreUnavailable("in-memory store marked unavailable".to_string()).into());
        }

        let mut events = self.lock();
        let state = events.entry(event_id).or_default();
        for write in &changeset.writes {
            match write {
                Write::Registration(registration) => {
                    upsert_by(&mut state.registrations, registration, |a, b| a.id == b.id)
                }
                Write::Attendance(record) => upsert_by(&mut state.attendance, record, |a, b| a.id == b.id),
                Write::RemoveAttendance(id) => state.attendance.retain(|record| record.id != *id),
                Write::Token(token) => upsert_by(&mut state.tokens, token, |a, b| a.id == b.id),
            }
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Process-local event catalog
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    events: RwLock<HashMap<i64, Event>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an event, as the authoring side would
    pub fn put(&self, event: Event) {
        self.events
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(event.id, event);
    }
}

#[async_trait]
impl EventCatalog for InMemoryCatalog {
    async fn find_event(&self, event_id: i64) -> AdmissionResult<Option<Event>> {
        Ok(self
            .events
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&event_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use crate::models::RegistrationStatus;
    use crate::utils::errors::AdmissionError;

    #[tokio::test]
    async fn test_commit_upserts_and_removes() {
        let store = InMemoryStore::new();
        let registration = Registration::pending(5, 8, Utc::now());
        let record = AttendanceRecord::registered(5, 8, Some(registration.id));

        let mut changeset = Changeset::new();
        changeset.push(Write::Registration(registration.clone()));
        changeset.push(Write::Attendance(record.clone()));
        store.commit(5, &changeset).await.unwrap();

        let confirmed = registration.transitioned(RegistrationStatus::Confirmed).unwrap();
        let mut changeset = Changeset::new();
        changeset.push(Write::Registration(confirmed.clone()));
        changeset.push(Write::RemoveAttendance(record.id));
        store.commit(5, &changeset).await.unwrap();

        let state = store.load(5).await.unwrap();
        assert_eq!(state.registrations, vec![confirmed]);
        assert!(state.attendance.is_empty());
        assert_eq!(store.commit_count(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_store_rejects_commit_without_writing() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);

        let mut changeset = Changeset::new();
        changeset.push(Write::Registration(Registration::pending(5, 8, Utc::now())));
        let result = store.commit(5, &changeset).await;

        assert_matches!(result, Err(AdmissionError::Transient(TransientFailure::StoreUnavailable(_))));
        assert!(store.snapshot(5).registrations.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_returns_latest_version() {
        let catalog = InMemoryCatalog::new();
        assert!(catalog.find_event(1).await.unwrap().is_none());

        let now = Utc::now();
        let mut event = Event {
            id: 1,
            title: "Shag workshop".to_string(),
            location: None,
            start_at: now,
            end_at: now,
            max_attendees: Some(10),
            registration_required: false,
            registration_deadline: None,
            is_active: true,
        };
        catalog.put(event.clone());
        event.max_attendees = Some(12);
        catalog.put(event.clone());

        assert_eq!(catalog.find_event(1).await.unwrap(), Some(event));
    }
}
