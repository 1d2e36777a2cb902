//! Cryptographic utilities.

pub mod password;

pub use password::{Argon2Hasher, PasswordError, PasswordHasher};
