//! Domain workflows orchestrating entities and stores.
//!
//! Services borrow entities from the stores for the duration of one
//! operation, validate and mutate them, and hand them back for persistence.
//! They are constructed with explicit store handles — there is no global
//! connection state — and every error is reported through
//! [`crate::errors::DomainError`].

mod course;
mod enrollment;
mod instructor;
mod student;

pub use course::CourseService;
pub use enrollment::EnrollmentService;
pub use instructor::InstructorService;
pub use student::StudentService;
