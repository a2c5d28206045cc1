//! Store contracts consumed by the workflows.
//!
//! Entities are plain data; every persistence concern goes through these
//! traits, so workflows stay testable against an in-memory backend and the
//! production backend can enforce the race-sensitive invariants (capacity,
//! one active enrollment per pair, unique email) at the storage layer.

use async_trait::async_trait;

use crate::course::{Course, CourseStatus, NewCourse};
use crate::enrollment::{Enrollment, NewEnrollment};
use crate::errors::StoreResult;
use crate::instructor::{Instructor, NewInstructor};
use crate::student::{NewStudent, Student};
use crate::types::{CourseId, EmailAddress, EnrollmentId, InstructorId, StudentId};

/// Optional filters for course listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseFilter {
    /// Restrict to courses in this status.
    pub status: Option<CourseStatus>,
    /// Restrict to courses taught by this instructor.
    pub instructor_id: Option<InstructorId>,
}

/// Optional filters for student listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentFilter {
    /// Substring match on the student number.
    pub student_number: Option<String>,
}

/// Persistence operations for courses.
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Looks up a course by id.
    async fn find_by_id(&self, id: CourseId) -> StoreResult<Option<Course>>;

    /// Lists courses matching the filter, most recently created first.
    async fn list(&self, filter: &CourseFilter) -> StoreResult<Vec<Course>>;

    /// Persists a new course, assigning its id and timestamps.
    async fn insert(&self, course: NewCourse) -> StoreResult<Course>;

    /// Writes back a modified course.
    async fn update(&self, course: &Course) -> StoreResult<()>;

    /// Deletes a course. Returns false when no row existed.
    async fn delete(&self, id: CourseId) -> StoreResult<bool>;

    /// Number of active enrollments currently held against the course.
    async fn count_active_enrollments(&self, course_id: CourseId) -> StoreResult<u32>;
}

/// Persistence operations for students.
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// Looks up a student by id.
    async fn find_by_id(&self, id: StudentId) -> StoreResult<Option<Student>>;

    /// Lists students matching the filter, most recently created first.
    async fn list(&self, filter: &StudentFilter) -> StoreResult<Vec<Student>>;

    /// Persists a new student, assigning its id and timestamps. Fails with
    /// [`crate::errors::StoreError::DuplicateEmail`] when the email is
    /// already registered to any user.
    async fn insert(&self, student: NewStudent) -> StoreResult<Student>;

    /// Writes back a modified student. Subject to the same email
    /// uniqueness guarantee as `insert`.
    async fn update(&self, student: &Student) -> StoreResult<()>;

    /// Deletes a student (and, per schema, their enrollments). Returns
    /// false when no row existed.
    async fn delete(&self, id: StudentId) -> StoreResult<bool>;

    /// Whether the student currently holds an active enrollment in the
    /// course.
    async fn has_active_enrollment(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> StoreResult<bool>;

    /// Whether the email is registered to any user other than `exclude`.
    async fn email_in_use(
        &self,
        email: &EmailAddress,
        exclude: Option<StudentId>,
    ) -> StoreResult<bool>;
}

/// Persistence operations for instructors.
#[async_trait]
pub trait InstructorStore: Send + Sync {
    /// Looks up an instructor by id.
    async fn find_by_id(&self, id: InstructorId) -> StoreResult<Option<Instructor>>;

    /// Lists instructors, most recently created first.
    async fn list(&self) -> StoreResult<Vec<Instructor>>;

    /// Persists a new instructor, assigning its id and timestamps. Fails
    /// with [`crate::errors::StoreError::DuplicateEmail`] when the email is
    /// already registered to any user.
    async fn insert(&self, instructor: NewInstructor) -> StoreResult<Instructor>;

    /// Whether the email is registered to any user other than `exclude`.
    async fn email_in_use(
        &self,
        email: &EmailAddress,
        exclude: Option<InstructorId>,
    ) -> StoreResult<bool>;
}

/// Persistence operations for enrollments.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Looks up an enrollment by id.
    async fn find_by_id(&self, id: EnrollmentId) -> StoreResult<Option<Enrollment>>;

    /// All enrollments of a student, most recent `enrolled_at` first. The
    /// ordering is an observable contract consumed by clients.
    async fn find_by_student(&self, student_id: StudentId) -> StoreResult<Vec<Enrollment>>;

    /// Persists a new active enrollment, assigning its id and timestamps.
    ///
    /// This is the constraint-enforcing write: implementations must reject
    /// a second active enrollment for the same (student, course) pair with
    /// [`crate::errors::StoreError::DuplicateActiveEnrollment`], and an
    /// insert that would exceed the course capacity with
    /// [`crate::errors::StoreError::CourseFull`], atomically with respect
    /// to concurrent inserts.
    async fn insert_active(&self, enrollment: NewEnrollment) -> StoreResult<Enrollment>;

    /// Writes back a modified enrollment (status transitions).
    async fn update(&self, enrollment: &Enrollment) -> StoreResult<()>;

    /// Administrative deletion. Returns false when no row existed.
    async fn delete(&self, id: EnrollmentId) -> StoreResult<bool>;
}
