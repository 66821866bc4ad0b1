//! Event admission engine
//!
//! Decides who may register for, attend and check in to time-bounded events
//! with optional capacity limits. Registration and waitlist handling, the
//! attendance state machine and short-lived check-in tokens are serialized
//! per event so that capacity is never oversold.

pub mod admission;
pub mod config;
pub mod database;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{AdmissionError, AdmissionResult, EngineError, Result, TransientFailure};

// Re-export main components for easy access
pub use admission::{AdmissionCoordinator, Clock, SystemClock};
pub use database::DatabaseService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
