//! `CourseCore` - course enrollment domain for a small e-learning REST API.
//!
//! This crate holds the domain core: validated types, the course, student,
//! instructor and enrollment entities, the store contracts they are
//! persisted through, and the workflows that enforce the business rules
//! (publication, capacity, one active enrollment per student and course,
//! legal status transitions).
//!
//! Persistence backends live in sibling crates: `coursecore-memory` for
//! tests and development, `coursecore-postgres` for production. The HTTP
//! delivery layer lives in `coursecore-api`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod course;
pub mod enrollment;
pub mod errors;
pub mod instructor;
pub mod service;
pub mod store;
pub mod student;
pub mod types;
pub mod user;

pub use course::{Course, CourseInput, CoursePreset, CourseStatus, NewCourse};
pub use enrollment::{Enrollment, EnrollmentStatus, NewEnrollment};
pub use errors::{
    DomainError, DomainResult, ResourceKind, StoreError, StoreResult, ValidationErrors,
};
pub use instructor::{Instructor, InstructorInput, NewInstructor};
pub use service::{CourseService, EnrollmentService, InstructorService, StudentService};
pub use store::{
    CourseFilter, CourseStore, EnrollmentStore, InstructorStore, StudentFilter, StudentStore,
};
pub use student::{NewStudent, Student, StudentInput, StudentUpdate};
pub use types::{
    CourseId, CourseTitle, EmailAddress, EnrollmentId, Grade, InstructorId, MaxStudents,
    PersonName, RawPassword, StudentId, StudentNumber,
};
pub use user::{PasswordHash, UserRole};
