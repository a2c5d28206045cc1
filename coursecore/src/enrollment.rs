//! The enrollment entity and its status state machine.
//!
//! An enrollment starts `active` — no other initial state exists — and may
//! move to `completed` or `cancelled` exactly once. Both are terminal. The
//! entity methods perform the state change; rejecting an illegal transition
//! is the workflow's responsibility, which checks the current status first
//! and reports a business error instead of calling the mutator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationErrors;
use crate::types::{CourseId, EnrollmentId, Grade, StudentId};

/// Lifecycle state of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    /// Currently enrolled; counts against course capacity.
    Active,
    /// Finished the course. Terminal.
    Completed,
    /// Withdrew from the course. Terminal; frees a capacity slot.
    Cancelled,
}

impl EnrollmentStatus {
    /// Canonical lowercase name, as stored and serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses the canonical lowercase name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted enrollment linking a student to a course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enrollment {
    /// Store-assigned identifier.
    pub id: EnrollmentId,
    /// The enrolled student.
    pub student_id: StudentId,
    /// The course enrolled into.
    pub course_id: CourseId,
    /// Lifecycle state.
    pub status: EnrollmentStatus,
    /// When the enrollment was made.
    pub enrolled_at: DateTime<Utc>,
    /// When the enrollment was completed, if it was.
    pub completed_at: Option<DateTime<Utc>>,
    /// Final grade, when recorded at completion.
    pub grade: Option<Grade>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    /// True iff the enrollment is in its initial, non-terminal state.
    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Active
    }

    /// Marks the enrollment completed, recording the completion time and an
    /// optional grade. The caller must have verified the enrollment is
    /// active.
    pub fn complete(&mut self, grade: Option<Grade>) {
        self.status = EnrollmentStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.grade = grade;
        self.updated_at = Utc::now();
    }

    /// Marks the enrollment cancelled. The caller must have verified the
    /// enrollment is active.
    pub fn cancel(&mut self) {
        self.status = EnrollmentStatus::Cancelled;
        self.updated_at = Utc::now();
    }

    /// Checks the entity invariants: positive references and a completion
    /// timestamp consistent with the status.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_references(self.student_id, self.course_id, &mut errors);
        if self.status == EnrollmentStatus::Completed && self.completed_at.is_none() {
            errors.add("completed_at", "Completed enrollments must record a completion time");
        }
        errors.into_result()
    }
}

/// A validated enrollment that has not been persisted yet. Only the enroll
/// workflow constructs these, always in the `active` state.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEnrollment {
    /// The enrolling student.
    pub student_id: StudentId,
    /// The course enrolled into.
    pub course_id: CourseId,
    /// Always [`EnrollmentStatus::Active`] at creation.
    pub status: EnrollmentStatus,
    /// When the enrollment was made.
    pub enrolled_at: DateTime<Utc>,
}

impl NewEnrollment {
    /// Builds an active enrollment stamped with the current time.
    pub fn new(student_id: StudentId, course_id: CourseId) -> Self {
        Self {
            student_id,
            course_id,
            status: EnrollmentStatus::Active,
            enrolled_at: Utc::now(),
        }
    }

    /// Checks the creation invariants: positive references and the active
    /// initial state.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_references(self.student_id, self.course_id, &mut errors);
        if self.status != EnrollmentStatus::Active {
            errors.add("status", "New enrollments must start as active");
        }
        errors.into_result()
    }
}

fn validate_references(student_id: StudentId, course_id: CourseId, errors: &mut ValidationErrors) {
    if student_id.into_inner() <= 0 {
        errors.add("student_id", "Valid student ID is required");
    }
    if course_id.into_inner() <= 0 {
        errors.add("course_id", "Valid course ID is required");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enrollment(status: EnrollmentStatus) -> Enrollment {
        Enrollment {
            id: EnrollmentId::new(10),
            student_id: StudentId::new(1),
            course_id: CourseId::new(2),
            status,
            enrolled_at: Utc::now(),
            completed_at: None,
            grade: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn new_enrollments_start_active() {
        let new = NewEnrollment::new(StudentId::new(1), CourseId::new(2));
        assert_eq!(new.status, EnrollmentStatus::Active);
        assert!(new.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_positive_references() {
        let new = NewEnrollment::new(StudentId::new(0), CourseId::new(-3));
        let errors = new.validate().unwrap_err();
        assert_eq!(errors.messages("student_id"), ["Valid student ID is required"]);
        assert_eq!(errors.messages("course_id"), ["Valid course ID is required"]);
    }

    #[test]
    fn complete_records_time_and_grade() {
        let mut e = enrollment(EnrollmentStatus::Active);
        e.complete(Some(Grade::try_new(91.0).unwrap()));
        assert_eq!(e.status, EnrollmentStatus::Completed);
        assert!(e.completed_at.is_some());
        assert_eq!(e.grade.unwrap().into_inner(), 91.0);
        assert!(e.validate().is_ok());
    }

    #[test]
    fn cancel_leaves_completion_fields_empty() {
        let mut e = enrollment(EnrollmentStatus::Active);
        e.cancel();
        assert_eq!(e.status, EnrollmentStatus::Cancelled);
        assert!(e.completed_at.is_none());
        assert!(e.grade.is_none());
    }

    #[test]
    fn validate_flags_completed_without_timestamp() {
        let e = enrollment(EnrollmentStatus::Completed);
        let errors = e.validate().unwrap_err();
        assert_eq!(
            errors.messages("completed_at"),
            ["Completed enrollments must record a completion time"]
        );
    }

    #[test]
    fn status_parse_round_trip() {
        for status in [
            EnrollmentStatus::Active,
            EnrollmentStatus::Completed,
            EnrollmentStatus::Cancelled,
        ] {
            assert_eq!(EnrollmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EnrollmentStatus::parse("paused"), None);
    }
}
