//! The enrollment workflow: enroll, complete, cancel, query.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::enrollment::{Enrollment, NewEnrollment};
use crate::errors::{DomainError, DomainResult, ResourceKind, StoreError};
use crate::store::{CourseStore, EnrollmentStore, StudentStore};
use crate::types::{CourseId, EnrollmentId, Grade, StudentId};

/// Orchestrates the enrollment lifecycle against the three stores it
/// depends on. All business invariants live here; the entities only carry
/// state and local invariant checks.
#[derive(Clone)]
pub struct EnrollmentService {
    enrollments: Arc<dyn EnrollmentStore>,
    courses: Arc<dyn CourseStore>,
    students: Arc<dyn StudentStore>,
}

impl EnrollmentService {
    /// Creates the workflow with explicit store handles.
    pub fn new(
        enrollments: Arc<dyn EnrollmentStore>,
        courses: Arc<dyn CourseStore>,
        students: Arc<dyn StudentStore>,
    ) -> Self {
        Self {
            enrollments,
            courses,
            students,
        }
    }

    /// Enrolls a student into a course.
    ///
    /// Checks run in a fixed order so the first violated rule wins:
    /// existence (student, then course), publication, capacity, duplicate
    /// active enrollment, then field validation. A concurrent writer losing
    /// the race at the store is mapped back to the same business errors.
    #[instrument(skip(self))]
    pub async fn enroll(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> DomainResult<Enrollment> {
        self.students
            .find_by_id(student_id)
            .await?
            .ok_or_else(|| DomainError::not_found(ResourceKind::Student, student_id))?;

        let course = self
            .courses
            .find_by_id(course_id)
            .await?
            .ok_or_else(|| DomainError::not_found(ResourceKind::Course, course_id))?;

        if !course.is_published() {
            return Err(DomainError::business("Course is not published"));
        }

        let current_enrolled = self.courses.count_active_enrollments(course_id).await?;
        if !course.can_enroll(current_enrolled) {
            return Err(DomainError::business("Course is full"));
        }

        if self
            .students
            .has_active_enrollment(student_id, course_id)
            .await?
        {
            return Err(DomainError::business(
                "Student is already enrolled in this course",
            ));
        }

        let new_enrollment = NewEnrollment::new(student_id, course_id);
        new_enrollment.validate().map_err(DomainError::Validation)?;

        let enrollment = match self.enrollments.insert_active(new_enrollment).await {
            Ok(enrollment) => enrollment,
            Err(StoreError::CourseFull { .. }) => {
                return Err(DomainError::business("Course is full"));
            }
            Err(StoreError::DuplicateActiveEnrollment { .. }) => {
                return Err(DomainError::business(
                    "Student is already enrolled in this course",
                ));
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            enrollment_id = %enrollment.id,
            %student_id,
            %course_id,
            "student enrolled"
        );
        Ok(enrollment)
    }

    /// Completes an active enrollment, recording an optional grade.
    #[instrument(skip(self))]
    pub async fn complete(
        &self,
        id: EnrollmentId,
        grade: Option<Grade>,
    ) -> DomainResult<Enrollment> {
        let mut enrollment = self.load(id).await?;
        if !enrollment.is_active() {
            return Err(DomainError::business(
                "Only active enrollments can be completed",
            ));
        }
        enrollment.complete(grade);
        self.enrollments.update(&enrollment).await?;
        info!(enrollment_id = %enrollment.id, "enrollment completed");
        Ok(enrollment)
    }

    /// Cancels an active enrollment, freeing its capacity slot.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: EnrollmentId) -> DomainResult<Enrollment> {
        let mut enrollment = self.load(id).await?;
        if !enrollment.is_active() {
            return Err(DomainError::business(
                "Only active enrollments can be cancelled",
            ));
        }
        enrollment.cancel();
        self.enrollments.update(&enrollment).await?;
        info!(enrollment_id = %enrollment.id, "enrollment cancelled");
        Ok(enrollment)
    }

    /// All enrollments of a student, most recent first. An existing student
    /// with no enrollments yields an empty list, not an error.
    #[instrument(skip(self))]
    pub async fn student_enrollments(
        &self,
        student_id: StudentId,
    ) -> DomainResult<Vec<Enrollment>> {
        self.students
            .find_by_id(student_id)
            .await?
            .ok_or_else(|| DomainError::not_found(ResourceKind::Student, student_id))?;
        Ok(self.enrollments.find_by_student(student_id).await?)
    }

    /// Looks up a single enrollment.
    pub async fn get(&self, id: EnrollmentId) -> DomainResult<Enrollment> {
        self.load(id).await
    }

    /// Administrative deletion of an enrollment record.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: EnrollmentId) -> DomainResult<()> {
        if self.enrollments.delete(id).await? {
            info!(enrollment_id = %id, "enrollment deleted");
            Ok(())
        } else {
            Err(DomainError::not_found(ResourceKind::Enrollment, id))
        }
    }

    async fn load(&self, id: EnrollmentId) -> DomainResult<Enrollment> {
        self.enrollments
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(ResourceKind::Enrollment, id))
    }
}
