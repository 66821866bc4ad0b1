//! Database module
//!
//! This module handles database connections and operations

pub mod connection;
pub mod repositories;
pub mod service;

// Re-export commonly used database components
pub use connection::{DatabasePool, create_pool, run_migrations, health_check};
pub use repositories::{AttendanceRepository, CheckinTokenRepository, EventRepository, RegistrationRepository};
pub use service::DatabaseService;
