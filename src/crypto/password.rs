//! Password hashing using Argon2.
//!
//! The store only ever sees passwords through the [`PasswordHasher`] capability, so the
//! digest format stays opaque to it. [`Argon2Hasher`] is the default implementation and
//! produces PHC-formatted Argon2id digests.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use thiserror::Error;

/// Errors that can occur during password operations.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),
}

/// Hashes plaintext passwords and checks plaintext against stored digests.
pub trait PasswordHasher {
    /// Produce a salted, irreversible digest of `plaintext`.
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;

    /// Check `plaintext` against a digest previously produced by [`PasswordHasher::hash`].
    ///
    /// A digest that cannot be parsed never matches.
    fn verify(&self, digest: &str, plaintext: &str) -> bool;
}

/// Argon2id password hasher.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Create a hasher with the recommended default cost parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an Argon2id hasher with explicit cost parameters.
    ///
    /// Digests carry their own parameters, so a store can verify passwords hashed with
    /// different settings than the ones it hashes with.
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl PasswordHasher for Argon2Hasher {
    /// Hash a password using Argon2id.
    ///
    /// # Example
    ///
    /// ```
    /// use apollo::crypto::{Argon2Hasher, PasswordHasher};
    ///
    /// let hash = Argon2Hasher::new().hash("my_secure_password").unwrap();
    /// assert!(hash.starts_with("$argon2id$"));
    /// ```
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashError(e.to_string()))
    }

    /// Verify a password against a stored hash.
    ///
    /// # Example
    ///
    /// ```
    /// use apollo::crypto::{Argon2Hasher, PasswordHasher};
    ///
    /// let hasher = Argon2Hasher::new();
    /// let hash = hasher.hash("my_password").unwrap();
    /// assert!(hasher.verify(&hash, "my_password"));
    /// assert!(!hasher.verify(&hash, "wrong_password"));
    /// ```
    fn verify(&self, digest: &str, plaintext: &str) -> bool {
        let parsed_hash = match PasswordHash::new(digest) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!("Stored password digest is malformed: {}", e);
                return false;
            }
        };

        match self.argon2.verify_password(plaintext.as_bytes(), &parsed_hash) {
            Ok(()) => true,
            Err(password_hash::Error::Password) => false,
            Err(e) => {
                tracing::warn!("Failed to verify password: {}", e);
                false
            }
        }
    }
}
