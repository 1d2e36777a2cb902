//! User model.

use chrono::NaiveDateTime;
use serde::Serialize;

/// Server-generated user identifier.
pub type UserId = i32;

/// A registered user (domain model).
///
/// The password digest never leaves the store, so it has no field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}
