//! Data models module
//!
//! This module contains all data structures used throughout the engine

pub mod event;
pub mod registration;
pub mod attendance;
pub mod token;

// Re-export commonly used models
pub use event::{Event, EventSnapshot, EventStatus};
pub use registration::{Registration, RegistrationStatus};
pub use attendance::{AttendanceRecord, AttendanceStatus};
pub use token::{CheckinPass, CheckinToken, TokenStatus};
