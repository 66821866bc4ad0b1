//! Test context for unified test setup

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use event_admission::admission::{AdmissionCoordinator, InMemoryCatalog, InMemoryStore, ManualClock};
use event_admission::config::AdmissionConfig;
use event_admission::models::Event;

use super::test_data::event_start;

/// Coordinator wired to in-memory collaborators
pub struct TestContext {
    pub clock: Arc<ManualClock>,
    pub store: Arc<InMemoryStore>,
    pub catalog: Arc<InMemoryCatalog>,
    pub coordinator: Arc<AdmissionCoordinator>,
}

impl TestContext {
    /// Context whose clock starts one hour before [`event_start`]
    pub fn new() -> Self {
        Self::new_with_config(AdmissionConfig::default())
    }

    pub fn new_with_config(config: AdmissionConfig) -> Self {
        // Initialize logging once
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let clock = Arc::new(ManualClock::new(event_start() - Duration::hours(1)));
        let store = Arc::new(InMemoryStore::new());
        let catalog = Arc::new(InMemoryCatalog::new());
        let coordinator = AdmissionCoordinator::new(catalog.clone(), store.clone(), clock.clone(), config)
            .expect("test configuration should be valid");

        Self {
            clock,
            store,
            catalog,
            coordinator: Arc::new(coordinator),
        }
    }

    /// Publish or update an event in the catalog
    pub fn with_event(self, event: Event) -> Self {
        self.catalog.put(event);
        self
    }

    pub fn update_event(&self, event: Event) {
        self.catalog.put(event);
    }

    pub fn set_time(&self, time: DateTime<Utc>) {
        self.clock.set(time);
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
