//! Store error taxonomy.

use diesel::result::{ConnectionError, DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::crypto::PasswordError;

/// Errors that can occur during catalog store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A lookup that must find a row found none.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The supplied password does not match the stored digest.
    #[error("Invalid credentials for {0}")]
    InvalidCredentials(String),

    /// The store rejected a write (uniqueness, foreign key, not-null or check).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The connection target could not be opened.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Any other failure reported by SQLite.
    #[error("Query error: {0}")]
    Query(#[source] DieselError),

    /// The password hasher failed to produce a digest.
    #[error("Password error: {0}")]
    Password(#[from] PasswordError),
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(
                kind @ (DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::NotNullViolation
                | DatabaseErrorKind::CheckViolation),
                info,
            ) => StoreError::ConstraintViolation(format!("{:?}: {}", kind, info.message())),
            other => StoreError::Query(other),
        }
    }
}
