//! Admission engine
//!
//! Registration, waitlist, attendance and check-in token rules for events,
//! with a per-event critical section around every state change.

pub mod attendance;
pub mod book;
pub mod capacity;
pub mod clock;
pub mod coordinator;
pub mod registration;
pub mod store;
pub mod token;

pub use book::{EventBook, Transition};
pub use capacity::{Admission, CapacityCounter, CapacityLedger};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::AdmissionCoordinator;
pub use registration::Cancellation;
pub use store::{
    AdmissionStore, Changeset, EventCatalog, InMemoryCatalog, InMemoryStore, StoredEventState, Write,
};
pub use token::ImageRenderer;
