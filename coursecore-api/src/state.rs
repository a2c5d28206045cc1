//! Shared application state: the four domain services over injected stores.

use std::sync::Arc;

use coursecore::service::{CourseService, EnrollmentService, InstructorService, StudentService};
use coursecore::store::{CourseStore, EnrollmentStore, InstructorStore, StudentStore};

/// The services handed to every handler. Cloning is cheap; the services
/// share their store handles internally.
#[derive(Clone)]
pub struct AppState {
    /// Course catalog workflow.
    pub courses: CourseService,
    /// Student registry workflow.
    pub students: StudentService,
    /// Instructor registry workflow.
    pub instructors: InstructorService,
    /// Enrollment workflow.
    pub enrollments: EnrollmentService,
}

impl AppState {
    /// Wires the services from individual store handles.
    pub fn new(
        course_store: Arc<dyn CourseStore>,
        student_store: Arc<dyn StudentStore>,
        instructor_store: Arc<dyn InstructorStore>,
        enrollment_store: Arc<dyn EnrollmentStore>,
    ) -> Self {
        Self {
            courses: CourseService::new(course_store.clone()),
            students: StudentService::new(student_store.clone()),
            instructors: InstructorService::new(instructor_store),
            enrollments: EnrollmentService::new(enrollment_store, course_store, student_store),
        }
    }

    /// Wires the services from one backend implementing every store
    /// contract (the usual case for both PostgreSQL and the in-memory
    /// backend).
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: CourseStore + StudentStore + InstructorStore + EnrollmentStore + 'static,
    {
        Self::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            backend,
        )
    }
}
