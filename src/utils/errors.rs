//! Error handling for the admission engine
//!
//! This module defines the main error types used throughout the crate.
//! Domain rejections live in [`AdmissionError`]; infrastructure problems are
//! kept apart in [`TransientFailure`] so callers can tell "retry later" from
//! "this will never succeed with the same input".

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Admission error: {0}")]
    Admission(#[from] AdmissionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Errors returned by admission, attendance and check-in token operations
#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Event is not active")]
    EventInactive,

    #[error("Event is not currently ongoing")]
    EventNotOngoing,

    #[error("Event has already ended")]
    EventEnded,

    #[error("Registration is not required for this event")]
    RegistrationNotRequired,

    #[error("Registration is closed")]
    RegistrationClosed,

    #[error("User is already registered for this event")]
    AlreadyRegistered,

    #[error("No active registration to cancel")]
    NoActiveRegistration,

    #[error("Registrations can only be cancelled before the event starts")]
    CancellationWindowClosed,

    #[error("User is not registered for this event")]
    NotRegistered,

    #[error("Attendance has already been marked")]
    AlreadyAttended,

    #[error("User has not checked in")]
    NotCheckedIn,

    #[error("Event is at full capacity")]
    CapacityExceeded,

    #[error("Check-in token not found")]
    TokenNotFound,

    #[error("Check-in token has been revoked")]
    TokenRevoked,

    #[error("Check-in token has expired")]
    TokenExpired,

    #[error("Transient failure: {0}")]
    Transient(#[from] TransientFailure),
}

/// Infrastructure failures that are safe to retry with backoff
#[derive(Error, Debug)]
pub enum TransientFailure {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Timed out after {waited_ms}ms waiting for event {event_id}")]
    LockTimeout { event_id: i64, waited_ms: u64 },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Result type alias for application operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Result type alias for admission operations
pub type AdmissionResult<T> = std::result::Result<T, AdmissionError>;

impl From<sqlx::Error> for AdmissionError {
    fn from(err: sqlx::Error) -> Self {
        AdmissionError::Transient(TransientFailure::Database(err))
    }
}

impl AdmissionError {
    /// Whether the same call may succeed later without changed input
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdmissionError::Transient(_))
    }

    /// Stable machine-readable code used for client messaging
    pub fn code(&self) -> &'static str {
        match self {
            AdmissionError::EventNotFound { .. } => "event_not_found",
            AdmissionError::EventInactive => "event_inactive",
            AdmissionError::EventNotOngoing => "event_not_ongoing",
            AdmissionError::EventEnded => "event_ended",
            AdmissionError::RegistrationNotRequired => "registration_not_required",
            AdmissionError::RegistrationClosed => "registration_closed",
            AdmissionError::AlreadyRegistered => "already_registered",
            AdmissionError::NoActiveRegistration => "no_active_registration",
            AdmissionError::CancellationWindowClosed => "cancellation_window_closed",
            AdmissionError::NotRegistered => "not_registered",
            AdmissionError::AlreadyAttended => "already_attended",
            AdmissionError::NotCheckedIn => "not_checked_in",
            AdmissionError::CapacityExceeded => "capacity_exceeded",
            AdmissionError::TokenNotFound => "token_not_found",
            AdmissionError::TokenRevoked => "token_revoked",
            AdmissionError::TokenExpired => "token_expired",
            AdmissionError::Transient(_) => "transient_failure",
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AdmissionError::Transient(TransientFailure::LockTimeout { .. }) => ErrorSeverity::Warning,
            AdmissionError::Transient(_) => ErrorSeverity::Critical,
            AdmissionError::EventNotFound { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Info,
        }
    }
}

impl EngineError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            EngineError::Database(_) => true,
            EngineError::Migration(_) => false,
            EngineError::Config(_) => false,
            EngineError::Admission(err) => err.is_retryable(),
            EngineError::Io(_) => true,
            EngineError::UrlParse(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EngineError::Database(_) => ErrorSeverity::Critical,
            EngineError::Migration(_) => ErrorSeverity::Critical,
            EngineError::Config(_) => ErrorSeverity::Critical,
            EngineError::Admission(err) => err.severity(),
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(!AdmissionError::CapacityExceeded.is_retryable());
        assert!(!AdmissionError::TokenExpired.is_retryable());
        let timeout = AdmissionError::from(TransientFailure::LockTimeout { event_id: 1, waited_ms: 50 });
        assert!(timeout.is_retryable());
        assert_eq!(timeout.code(), "transient_failure");
    }

    #[test]
    fn test_token_errors_have_distinct_codes() {
        let codes = [
            AdmissionError::TokenNotFound.code(),
            AdmissionError::TokenRevoked.code(),
            AdmissionError::TokenExpired.code(),
        ];
        assert_eq!(codes, ["token_not_found", "token_revoked", "token_expired"]);
    }

    #[test]
    fn test_engine_error_wraps_admission_error() {
        let err = EngineError::from(AdmissionError::AlreadyAttended);
        assert!(!err.is_recoverable());
        assert_eq!(err.severity(), ErrorSeverity::Info);
        assert_eq!(err.to_string(), "Admission error: Attendance has already been marked");
    }
}
