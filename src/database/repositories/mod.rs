//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod attendance;
pub mod checkin_token;
pub mod event;
pub mod registration;

// Re-export repositories
pub use attendance::AttendanceRepository;
pub use checkin_token::CheckinTokenRepository;
pub use event::EventRepository;
pub use registration::RegistrationRepository;
