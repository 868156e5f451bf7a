//! Core error types for lockdown-core.
//!
//! This module defines the error hierarchy using thiserror. Only the
//! bridge, configuration and storage layers surface these to callers; the
//! enforcement loop logs and swallows them so a single bad tick never
//! stops enforcement.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for lockdown-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// State store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Device effect errors (system lock, overlay, relaunch)
    #[error("Effect error: {0}")]
    Effect(#[from] EffectError),

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

/// Durable state store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Another process holds the database lock
    #[error("Store is locked")]
    Locked,

    /// An in-process handle panicked while holding the store
    #[error("Store handle poisoned")]
    Poisoned,

    /// A stored value could not be decoded for its key
    #[error("Corrupt value for '{key}': {value}")]
    CorruptValue { key: String, value: String },
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
}

/// Validation errors for user-supplied input.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// PIN does not satisfy the format rules
    #[error("Invalid PIN: {0}")]
    InvalidPin(String),

    /// Supplied PIN did not match
    #[error("Incorrect PIN")]
    IncorrectPin,
}

/// Errors from best-effort device effects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EffectError {
    /// Missing admin or overlay grant
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
