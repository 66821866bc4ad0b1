//! Capacity ledger
//!
//! [`CapacityCounter`] is the compare-and-increment counter for one event.
//! [`CapacityLedger`] owns one lock per event; holding the write half of that
//! lock is the event's critical section, so every read-check-write sequence on
//! the counter is serialized per event while different events never contend.
//!
//! The ledger assumes it is the only writer of its store. Books are cached
//! after the first load; if another process writes the same events, call
//! [`CapacityLedger::invalidate`] so the next entry reloads from the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

use crate::utils::errors::{AdmissionResult, TransientFailure};
use super::book::EventBook;
use super::store::AdmissionStore;

/// Outcome of asking the ledger for one more counted slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    Granted,
    Denied,
}

/// Confirmed-attendee counter for a single event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapacityCounter {
    max_attendees: Option<u32>,
    current_attendees: u32,
}

impl CapacityCounter {
    pub fn new(max_attendees: Option<u32>, current_attendees: u32) -> Self {
        Self { max_attendees, current_attendees }
    }

    pub fn max_attendees(&self) -> Option<u32> {
        self.max_attendees
    }

    pub fn current_attendees(&self) -> u32 {
        self.current_attendees
    }

    /// Apply a new limit from the event record; existing admissions stand
    pub fn set_limit(&mut self, max_attendees: Option<u32>) {
        self.max_attendees = max_attendees;
    }

    pub fn has_room(&self) -> bool {
        match self.max_attendees {
            None => true,
            Some(max) => self.current_attendees < max,
        }
    }

    /// Grant and count a slot if there is room
    pub fn try_admit(&mut self) -> Admission {
        if !self.has_room() {
            return Admission::Denied;
        }
        self.current_attendees += 1;
        Admission::Granted
    }

    pub fn release(&mut self) {
        self.current_attendees = self.current_attendees.saturating_sub(1);
    }
}

/// Per-event lock registry guarding each event's [`EventBook`]
#[derive(Debug)]
pub struct CapacityLedger {
    slots: Mutex<HashMap<i64, Arc<RwLock<EventBook>>>>,
    lock_timeout: Duration,
}

impl CapacityLedger {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            lock_timeout,
        }
    }

    fn slot(&self, event_id: i64) -> Arc<RwLock<EventBook>> {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots
            .entry(event_id)
            .or_insert_with(|| Arc::new(RwLock::new(EventBook::new(event_id))))
            .clone()
    }

    fn timed_out(&self, event_id: i64) -> TransientFailure {
        TransientFailure::LockTimeout {
            event_id,
            waited_ms: u64::try_from(self.lock_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Enter the event's critical section, loading its book on first use
    ///
    /// Times out before anything is read, never midway.
    pub async fn enter(
        &self,
        event_id: i64,
        store: &dyn AdmissionStore,
    ) -> AdmissionResult<OwnedRwLockWriteGuard<EventBook>> {
        let slot = self.slot(event_id);
        let mut book = tokio::time::timeout(self.lock_timeout, slot.write_owned())
            .await
            .map_err(|_| self.timed_out(event_id))?;

        if !book.is_loaded() {
            debug!(event_id = event_id, "Loading event book from store");
            let state = store.load(event_id).await?;
            book.hydrate(state);
        }

        Ok(book)
    }

    /// Shared read access for side-effect-free queries
    pub async fn observe(
        &self,
        event_id: i64,
        store: &dyn AdmissionStore,
    ) -> AdmissionResult<OwnedRwLockReadGuard<EventBook>> {
        let slot = self.slot(event_id);
        let book = tokio::time::timeout(self.lock_timeout, slot.read_owned())
            .await
            .map_err(|_| self.timed_out(event_id))?;

        if book.is_loaded() {
            return Ok(book);
        }
        drop(book);

        let book = self.enter(event_id, store).await?;
        Ok(book.downgrade())
    }

    /// Drop the cached book so the next entry reloads it from the store
    pub async fn invalidate(&self, event_id: i64) -> AdmissionResult<()> {
        let slot = self.slot(event_id);
        let mut book = tokio::time::timeout(self.lock_timeout, slot.write_owned())
            .await
            .map_err(|_| self.timed_out(event_id))?;
        book.unload();
        debug!(event_id = event_id, "Invalidated cached event book");
        Ok(())
    }

    pub fn tracked_events(&self) -> usize {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::store::InMemoryStore;
    use assert_matches::assert_matches;
    use crate::utils::errors::AdmissionError;
    use proptest::prelude::*;

    #[test]
    fn test_unlimited_counter_always_grants() {
        let mut counter = CapacityCounter::new(None, 0);
        for _ in 0..1000 {
            assert_eq!(counter.try_admit(), Admission::Granted);
        }
        assert_eq!(counter.current_attendees(), 1000);
    }

    #[test]
    fn test_counter_denies_at_limit_and_frees_on_release() {
        let mut counter = CapacityCounter::new(Some(2), 0);
        assert_eq!(counter.try_admit(), Admission::Granted);
        assert_eq!(counter.try_admit(), Admission::Granted);
        assert_eq!(counter.try_admit(), Admission::Denied);
        assert_eq!(counter.current_attendees(), 2);

        counter.release();
        assert_eq!(counter.try_admit(), Admission::Granted);
    }

    #[test]
    fn test_lowered_limit_keeps_existing_admissions() {
        let mut counter = CapacityCounter::new(Some(5), 4);
        counter.set_limit(Some(2));
        assert_eq!(counter.current_attendees(), 4);
        assert_eq!(counter.try_admit(), Admission::Denied);
    }

    #[test]
    fn test_release_never_underflows() {
        let mut counter = CapacityCounter::new(Some(1), 0);
        counter.release();
        assert_eq!(counter.current_attendees(), 0);
    }

    proptest! {
        #[test]
        fn prop_counter_never_exceeds_limit(max in 0u32..10, ops in proptest::collection::vec(any::<bool>(), 0..200)) {
            let mut counter = CapacityCounter::new(Some(max), 0);
            for admit in ops {
                if admit {
                    counter.try_admit();
                } else {
                    counter.release();
                }
                prop_assert!(counter.current_attendees() <= max);
            }
        }
    }

    #[tokio::test]
    async fn test_enter_times_out_while_event_is_held() {
        let ledger = CapacityLedger::new(Duration::from_millis(20));
        let store = InMemoryStore::new();

        let held = ledger.enter(1, &store).await.unwrap();
        let blocked = ledger.enter(1, &store).await;
        assert_matches!(
            blocked,
            Err(AdmissionError::Transient(TransientFailure::LockTimeout { event_id: 1, .. }))
        );

        // Other events are unaffected
        assert!(ledger.enter(2, &store).await.is_ok());
        drop(held);
        assert!(ledger.enter(1, &store).await.is_ok());
        assert_eq!(ledger.tracked_events(), 2);
    }

    #[tokio::test]
    async fn test_observe_loads_book_once() {
        let ledger = CapacityLedger::new(Duration::from_millis(100));
        let store = InMemoryStore::new();

        let first = ledger.observe(9, &store).await.unwrap();
        assert!(first.is_loaded());
        let second = ledger.observe(9, &store).await.unwrap();
        assert!(second.is_loaded());
        assert_eq!(store.load_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_reloads_external_writes() {
        use crate::admission::store::{Changeset, Write};
        use crate::models::Registration;

        let ledger = CapacityLedger::new(Duration::from_millis(100));
        let store = InMemoryStore::new();
        assert!(ledger.observe(3, &store).await.unwrap().registrations().is_empty());

        let mut changeset = Changeset::new();
        changeset.push(Write::Registration(Registration::pending(3, 1, chrono::Utc::now())));
        store.commit(3, &changeset).await.unwrap();
        assert!(ledger.observe(3, &store).await.unwrap().registrations().is_empty());

        ledger.invalidate(3).await.unwrap();
        assert_eq!(ledger.observe(3, &store).await.unwrap().registrations().len(), 1);
        assert_eq!(store.load_count(), 2);
    }
}
