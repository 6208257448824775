//! Error type shared by every layer of mecal.

use thiserror::Error;

/// Errors produced by mecal.
#[derive(Debug, Error)]
pub enum MecalError {
    /// Local configuration problem (bad file, missing directory, bad flag).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend credentials are not configured.
    #[error("Server misconfiguration: {0}")]
    Misconfigured(String),

    /// Local `SQLite` failure.
    #[error("Database error: {0}")]
    Database(String),

    /// A request was rejected before reaching the backend.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The operation needs an authenticated user.
    #[error("Authorization required: {0}")]
    Unauthorized(String),

    /// Requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend answered with a non-success status.
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// The backend could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// Another sync run holds the lock.
    #[error("A sync is already in progress")]
    AlreadySyncing,

    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MecalError {
    /// HTTP-style status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::AlreadySyncing => 409,
            Self::Backend { status, .. } => *status,
            Self::Network(_) => 503,
            Self::Config(_)
            | Self::Misconfigured(_)
            | Self::Database(_)
            | Self::Parse(_)
            | Self::Io(_) => 500,
        }
    }

    /// Shorthand for a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<rusqlite::Error> for MecalError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(MecalError::validation("x").status_code(), 400);
        assert_eq!(MecalError::Unauthorized("x".into()).status_code(), 401);
        assert_eq!(MecalError::AlreadySyncing.status_code(), 409);
        assert_eq!(
            MecalError::Backend {
                status: 422,
                message: "bad".into()
            }
            .status_code(),
            422
        );
        assert_eq!(MecalError::Database("x".into()).status_code(), 500);
    }

    #[test]
    fn test_display() {
        let err = MecalError::Backend {
            status: 409,
            message: "duplicate key".to_string(),
        };
        assert_eq!(err.to_string(), "Backend error (409): duplicate key");
    }
}
