//! Core error types for sleepbuddy-core.
//!
//! This module defines the error hierarchy using thiserror. None of these
//! are fatal to the tracker: callers either propagate them to the CLI or log
//! and swallow them when the failing side effect is optional.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for sleepbuddy-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Timer service errors
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Notification sink errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// The connection mutex was poisoned by a panicking holder
    #[error("Database connection poisoned")]
    Poisoned,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Home/config directory could not be prepared
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    /// Sleep duration must be strictly positive
    #[error("Sleep duration must be greater than zero hours (got {0})")]
    NonPositiveDuration(f32),

    /// Target streak must be at least one day
    #[error("Target streak must be at least one day")]
    ZeroTargetStreak,

    /// Unparsable time of day
    #[error("Invalid time of day '{0}': expected HH:MM")]
    InvalidTimeOfDay(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors reported by a [`crate::scheduler::TimerService`].
#[derive(Error, Debug, PartialEq)]
pub enum TimerError {
    /// The platform refused exact-time scheduling
    #[error("Exact-time scheduling denied for trigger {0}")]
    Denied(String),

    /// No runtime is available to host the timer
    #[error("Timer service unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by a [`crate::notify::NotificationSink`].
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Notifications are disabled or permission was refused
    #[error("Notification permission denied")]
    PermissionDenied,

    /// The external notifier failed
    #[error("Notifier failed: {0}")]
    Failed(String),

    /// Spawning the notifier command failed
    #[error("Notifier IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(DatabaseError::from(err))
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::InvalidValue {
            key: "<file>".into(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_sqlite_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            None,
        );
        assert!(matches!(DatabaseError::from(err), DatabaseError::Locked));
    }

    #[test]
    fn validation_error_messages() {
        assert_eq!(
            ValidationError::NonPositiveDuration(0.0).to_string(),
            "Sleep duration must be greater than zero hours (got 0)"
        );
        let core: CoreError = ValidationError::ZeroTargetStreak.into();
        assert!(core.to_string().contains("at least one day"));
    }
}
