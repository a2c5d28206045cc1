//! Shared user concerns: the role tag and password hashing.
//!
//! There is no user base type. Students and instructors are plain structs
//! that compose the shared fields (name, email, password hash) directly and
//! carry a [`UserRole`] tag where the wire format needs one.

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, StoreError};
use crate::types::RawPassword;

/// Distinguishes the two user populations sharing the users namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// A learner who enrolls into courses.
    Student,
    /// A teacher assigned to courses.
    Instructor,
}

impl UserRole {
    /// Canonical lowercase name, as stored and serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bcrypt password hash. The raw password is consumed at registration and
/// never stored; the hash is never serialized back out.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes a raw password with bcrypt at the default cost.
    pub fn hash(raw: &RawPassword) -> Result<Self, DomainError> {
        bcrypt::hash(raw.as_ref(), bcrypt::DEFAULT_COST)
            .map(Self)
            .map_err(|err| {
                StoreError::Internal(format!("password hashing failed: {err}")).into()
            })
    }

    /// Wraps a hash loaded from the store.
    pub fn from_stored(hash: String) -> Self {
        Self(hash)
    }

    /// Verifies a candidate password against the hash. Returns false for a
    /// mismatch or a malformed stored hash.
    pub fn verify(&self, candidate: &str) -> bool {
        bcrypt::verify(candidate, &self.0).unwrap_or(false)
    }

    /// The stored hash string, for persistence only.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let raw = RawPassword::try_new("hunter2hunter2".to_string()).unwrap();
        let hash = PasswordHash::hash(&raw).unwrap();
        assert!(hash.verify("hunter2hunter2"));
        assert!(!hash.verify("wrong password"));
    }

    #[test]
    fn verify_tolerates_malformed_stored_hash() {
        let hash = PasswordHash::from_stored("not-a-bcrypt-hash".into());
        assert!(!hash.verify("anything"));
    }

    #[test]
    fn debug_never_prints_the_hash() {
        let hash = PasswordHash::from_stored("$2b$12$abcdefghijk".into());
        assert_eq!(format!("{hash:?}"), "PasswordHash(***)");
    }

    #[test]
    fn role_names() {
        assert_eq!(UserRole::Student.as_str(), "student");
        assert_eq!(UserRole::Instructor.to_string(), "instructor");
    }
}
