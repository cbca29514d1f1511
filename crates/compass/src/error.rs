//! Error types for compass.
//!
//! This module defines all error types used throughout the compass crate,
//! providing detailed context for debugging and user-facing messages that
//! the forms display verbatim.

use std::path::PathBuf;
use thiserror::Error;

use crate::auth::AuthError;

/// The main error type for compass operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A point lookup returned no row.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Table or entity name.
        entity: &'static str,
        /// The key that was looked up.
        id: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Identity Errors ===
    /// The identity service rejected the request.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Sign-up succeeded without returning a user.
    #[error("Failed to create user")]
    SignUpNoUser,

    /// Session state was requested without a running session provider.
    #[error("useUser must be used within a UserProvider")]
    OutsideProvider,

    /// No signed-in user is available for an operation that needs one.
    #[error("not signed in")]
    NotSignedIn,

    // === Domain Errors ===
    /// The acting user may not perform the operation.
    #[error("access denied: {action}")]
    AccessDenied {
        /// The operation that was refused.
        action: String,
    },

    /// A value failed validation.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for compass operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an access denied error for the named action.
    #[must_use]
    pub fn access_denied(action: impl Into<String>) -> Self {
        Self::AccessDenied {
            action: action.into(),
        }
    }

    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Check if this error is a missing row.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is an access refusal.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }
}
