//! Unified error types for the point-tracking core.
//!
//! Every operation in [`crate::core`] returns `Result<T>` with one of these
//! variants; nothing propagates as a panic to the presentation layer. The
//! business-rule variants carry enough context for a caller to render a
//! meaningful message without re-querying.

use sea_orm::DbErr;
use thiserror::Error;

/// All failures the core operations can surface.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or out-of-range input (weak password, bad role, zero amount).
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// A uniqueness rule was violated (email, username, class, coupon code,
    /// join request pair).
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// The acting principal lacks the role or ownership the operation needs.
    #[error("Not authorized: {message}")]
    Authorization { message: String },

    /// Account balance too low for a purchase.
    #[error("Insufficient balance: have {current}, need {required}")]
    InsufficientBalance { current: i64, required: i64 },

    /// Weekly award cap would be exceeded.
    #[error("Weekly quota exceeded: {remaining} points remaining, {requested} requested")]
    QuotaExceeded { remaining: i64, requested: i64 },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The target is already in a terminal state (coupon redeemed, request
    /// resolved).
    #[error("Already processed: {message}")]
    AlreadyProcessed { message: String },

    /// Bad or missing configuration (unseeded role, invalid catalog).
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Argon2 hashing or hash parsing failed.
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Filesystem failure while reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Returns true when a `DbErr` stems from a unique-constraint violation.
///
/// The store-level unique indexes are the backstop for the generate-and-check
/// patterns (usernames, coupon codes, class names); when two requests race
/// past the pre-check, the loser surfaces here and is mapped to
/// [`Error::Conflict`].
pub fn is_unique_violation(err: &DbErr) -> bool {
    // SQLite reports "UNIQUE constraint failed: table.column"; other backends
    // include "unique" in their constraint error text as well.
    err.to_string().to_lowercase().contains("unique")
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_detection() {
        let err = DbErr::Custom("UNIQUE constraint failed: users.email".to_string());
        assert!(is_unique_violation(&err));

        let err = DbErr::Custom("no such table: users".to_string());
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn test_error_display_includes_context() {
        let err = Error::InsufficientBalance {
            current: 20,
            required: 30,
        };
        assert_eq!(err.to_string(), "Insufficient balance: have 20, need 30");

        let err = Error::QuotaExceeded {
            remaining: 10,
            requested: 50,
        };
        assert!(err.to_string().contains("10 points remaining"));
    }
}
