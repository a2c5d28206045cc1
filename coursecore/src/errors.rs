//! Error types for the enrollment domain.
//!
//! The taxonomy distinguishes four terminal error kinds, so that the
//! delivery layer can map each to a different response without the core ever
//! knowing about wire status codes:
//!
//! - [`DomainError::NotFound`] — a referenced entity does not exist
//! - [`DomainError::Validation`] — field-level input errors, keyed by field
//! - [`DomainError::Business`] — a domain rule was violated
//! - [`DomainError::Infrastructure`] — the store failed; the only category a
//!   caller could reasonably retry, and only at the transport/store layer
//!
//! Workflows never swallow errors: every failure is returned as one of these
//! kinds, and store-level conflicts are re-mapped to the business or
//! validation error they stand for.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::types::{CourseId, StudentId};

/// Result alias used by all workflow operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result alias used by all store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Accumulated field-level validation errors: field name to messages.
///
/// Backed by a `BTreeMap` so serialization and iteration order are
/// deterministic, which the tests and the wire envelope rely on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Creates an empty error collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection holding a single error.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Records a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// True when no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Messages recorded against a field, empty when the field is clean.
    pub fn messages(&self, field: &str) -> &[String] {
        self.errors.get(field).map_or(&[], Vec::as_slice)
    }

    /// Iterates fields and their messages in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// `Ok(())` when empty, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// The kind of entity a lookup failed to find. Used to render the
/// `"<Resource> with ID <n> not found"` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A course row.
    Course,
    /// A student row.
    Student,
    /// An instructor row.
    Instructor,
    /// An enrollment row.
    Enrollment,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Course => "Course",
            Self::Student => "Student",
            Self::Instructor => "Instructor",
            Self::Enrollment => "Enrollment",
        })
    }
}

/// Errors surfaced by store implementations.
///
/// The conflict variants exist because the storage layer is the arbiter of
/// the race-sensitive invariants (capacity, one active enrollment per pair,
/// unique email): the losing writer of a concurrent pair gets a conflict,
/// which the workflow maps back to the corresponding domain error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// An active enrollment for this (student, course) pair already exists.
    #[error("student {student_id} already has an active enrollment in course {course_id}")]
    DuplicateActiveEnrollment {
        /// Student holding the conflicting enrollment.
        student_id: StudentId,
        /// Course the conflicting enrollment belongs to.
        course_id: CourseId,
    },

    /// The course has no remaining capacity for active enrollments.
    #[error("course {course_id} has no remaining capacity")]
    CourseFull {
        /// The course that is at capacity.
        course_id: CourseId,
    },

    /// The email is already registered to another user.
    #[error("email '{email}' is already registered")]
    DuplicateEmail {
        /// The conflicting email address.
        email: String,
    },

    /// The store could not be reached or the operation did not complete.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// An unexpected store-side failure (corrupt row, violated assumption).
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// Errors returned by the domain workflows.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// A referenced student, course, instructor or enrollment does not exist.
    #[error("{resource} with ID {id} not found")]
    NotFound {
        /// The kind of entity that was looked up.
        resource: ResourceKind,
        /// The identifier that failed to resolve.
        id: i64,
    },

    /// Field-level input validation failed.
    #[error("Validation failed")]
    Validation(ValidationErrors),

    /// A domain rule was violated (unpublished course, full course,
    /// duplicate active enrollment, illegal status transition, ...).
    #[error("{0}")]
    Business(String),

    /// The persistence layer failed; distinct from the rule violations above
    /// so callers can map it to a different response class.
    #[error(transparent)]
    Infrastructure(#[from] StoreError),
}

impl DomainError {
    /// A not-found error for the given resource kind and raw id.
    pub fn not_found(resource: ResourceKind, id: impl Into<i64>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// A business-rule violation carrying a human-readable message.
    pub fn business(message: impl Into<String>) -> Self {
        Self::Business(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_accumulate_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "Title is required");
        errors.add("title", "Title must be at least 3 characters");
        errors.add("max_students", "Max students must be greater than 0");

        assert!(!errors.is_empty());
        assert_eq!(errors.messages("title").len(), 2);
        assert_eq!(
            errors.messages("max_students"),
            ["Max students must be greater than 0"]
        );
        assert!(errors.messages("status").is_empty());
    }

    #[test]
    fn validation_errors_serialize_as_field_map() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "Email is required");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "email": ["Email is required"] })
        );
    }

    #[test]
    fn not_found_message_matches_wire_contract() {
        let err = DomainError::not_found(ResourceKind::Course, 42_i64);
        assert_eq!(err.to_string(), "Course with ID 42 not found");
    }

    #[test]
    fn store_conflicts_convert_to_infrastructure_by_default() {
        let err: DomainError = StoreError::Unavailable("connection refused".into()).into();
        assert!(matches!(err, DomainError::Infrastructure(_)));
    }
}
