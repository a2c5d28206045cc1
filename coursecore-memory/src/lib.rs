//! In-memory store backend for `CourseCore`.
//!
//! This crate provides a single [`MemoryStore`] implementing all of the
//! store contracts from the `coursecore` crate, useful for testing and
//! development scenarios where persistence is not required. It enforces the
//! same constraints as the production backend — unique email across users,
//! at most one active enrollment per (student, course) pair, and the course
//! capacity cap — atomically under one write lock, so concurrent enrollment
//! races resolve the same way they do against PostgreSQL.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use coursecore::course::{Course, NewCourse};
use coursecore::enrollment::{Enrollment, EnrollmentStatus, NewEnrollment};
use coursecore::errors::{StoreError, StoreResult};
use coursecore::instructor::{Instructor, NewInstructor};
use coursecore::store::{
    CourseFilter, CourseStore, EnrollmentStore, InstructorStore, StudentFilter, StudentStore,
};
use coursecore::student::{NewStudent, Student};
use coursecore::types::{CourseId, EmailAddress, EnrollmentId, InstructorId, StudentId};

#[derive(Debug, Default)]
struct MemoryState {
    courses: HashMap<i64, Course>,
    students: HashMap<i64, Student>,
    instructors: HashMap<i64, Instructor>,
    enrollments: HashMap<i64, Enrollment>,
    // students and instructors share one id sequence (the users namespace)
    next_user_id: i64,
    next_course_id: i64,
    next_enrollment_id: i64,
}

impl MemoryState {
    fn count_active(&self, course_id: i64) -> u32 {
        u32::try_from(
            self.enrollments
                .values()
                .filter(|e| {
                    e.course_id.into_inner() == course_id
                        && e.status == EnrollmentStatus::Active
                })
                .count(),
        )
        .unwrap_or(u32::MAX)
    }

    fn has_active(&self, student_id: i64, course_id: i64) -> bool {
        self.enrollments.values().any(|e| {
            e.student_id.into_inner() == student_id
                && e.course_id.into_inner() == course_id
                && e.status == EnrollmentStatus::Active
        })
    }

    fn email_in_use(&self, email: &EmailAddress, exclude_user: Option<i64>) -> bool {
        let taken_by_student = self.students.values().any(|s| {
            s.email == *email && Some(s.id.into_inner()) != exclude_user
        });
        let taken_by_instructor = self.instructors.values().any(|i| {
            i.email == *email && Some(i.id.into_inner()) != exclude_user
        });
        taken_by_student || taken_by_instructor
    }
}

/// Thread-safe in-memory backend implementing every store contract.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn find_by_id(&self, id: CourseId) -> StoreResult<Option<Course>> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.courses.get(&id.into_inner()).cloned())
    }

    async fn list(&self, filter: &CourseFilter) -> StoreResult<Vec<Course>> {
        let state = self.state.read().expect("RwLock poisoned");
        let mut courses: Vec<Course> = state
            .courses
            .values()
            .filter(|c| filter.status.is_none_or(|status| c.status == status))
            .filter(|c| {
                filter
                    .instructor_id
                    .is_none_or(|instructor| c.instructor_id == instructor)
            })
            .cloned()
            .collect();
        courses.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.into_inner().cmp(&a.id.into_inner()))
        });
        Ok(courses)
    }

    async fn insert(&self, course: NewCourse) -> StoreResult<Course> {
        let mut state = self.state.write().expect("RwLock poisoned");
        state.next_course_id += 1;
        let now = Utc::now();
        let course = Course {
            id: CourseId::new(state.next_course_id),
            title: course.title,
            description: course.description,
            max_students: course.max_students,
            status: course.status,
            instructor_id: course.instructor_id,
            created_at: now,
            updated_at: now,
        };
        state.courses.insert(course.id.into_inner(), course.clone());
        Ok(course)
    }

    async fn update(&self, course: &Course) -> StoreResult<()> {
        let mut state = self.state.write().expect("RwLock poisoned");
        match state.courses.get_mut(&course.id.into_inner()) {
            Some(existing) => {
                *existing = course.clone();
                Ok(())
            }
            None => Err(StoreError::Internal(format!(
                "course {} does not exist",
                course.id
            ))),
        }
    }

    async fn delete(&self, id: CourseId) -> StoreResult<bool> {
        let mut state = self.state.write().expect("RwLock poisoned");
        let removed = state.courses.remove(&id.into_inner()).is_some();
        if removed {
            // mirrors the ON DELETE CASCADE of the relational schema
            state
                .enrollments
                .retain(|_, e| e.course_id != id);
        }
        Ok(removed)
    }

    async fn count_active_enrollments(&self, course_id: CourseId) -> StoreResult<u32> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.count_active(course_id.into_inner()))
    }
}

#[async_trait]
impl StudentStore for MemoryStore {
    async fn find_by_id(&self, id: StudentId) -> StoreResult<Option<Student>> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.students.get(&id.into_inner()).cloned())
    }

    async fn list(&self, filter: &StudentFilter) -> StoreResult<Vec<Student>> {
        let state = self.state.read().expect("RwLock poisoned");
        let mut students: Vec<Student> = state
            .students
            .values()
            .filter(|s| {
                filter
                    .student_number
                    .as_deref()
                    .is_none_or(|needle| s.student_number.contains(needle))
            })
            .cloned()
            .collect();
        students.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.into_inner().cmp(&a.id.into_inner()))
        });
        Ok(students)
    }

    async fn insert(&self, student: NewStudent) -> StoreResult<Student> {
        let mut state = self.state.write().expect("RwLock poisoned");
        if state.email_in_use(&student.email, None) {
            return Err(StoreError::DuplicateEmail {
                email: student.email.to_string(),
            });
        }
        state.next_user_id += 1;
        let now = Utc::now();
        let student = Student {
            id: StudentId::new(state.next_user_id),
            student_number: student.student_number,
            name: student.name,
            email: student.email,
            password_hash: student.password_hash,
            created_at: now,
            updated_at: now,
        };
        state
            .students
            .insert(student.id.into_inner(), student.clone());
        Ok(student)
    }

    async fn update(&self, student: &Student) -> StoreResult<()> {
        let mut state = self.state.write().expect("RwLock poisoned");
        if state.email_in_use(&student.email, Some(student.id.into_inner())) {
            return Err(StoreError::DuplicateEmail {
                email: student.email.to_string(),
            });
        }
        match state.students.get_mut(&student.id.into_inner()) {
            Some(existing) => {
                *existing = student.clone();
                Ok(())
            }
            None => Err(StoreError::Internal(format!(
                "student {} does not exist",
                student.id
            ))),
        }
    }

    async fn delete(&self, id: StudentId) -> StoreResult<bool> {
        let mut state = self.state.write().expect("RwLock poisoned");
        let removed = state.students.remove(&id.into_inner()).is_some();
        if removed {
            state.enrollments.retain(|_, e| e.student_id != id);
        }
        Ok(removed)
    }

    async fn has_active_enrollment(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> StoreResult<bool> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.has_active(student_id.into_inner(), course_id.into_inner()))
    }

    async fn email_in_use(
        &self,
        email: &EmailAddress,
        exclude: Option<StudentId>,
    ) -> StoreResult<bool> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.email_in_use(email, exclude.map(StudentId::into_inner)))
    }
}

#[async_trait]
impl InstructorStore for MemoryStore {
    async fn find_by_id(&self, id: InstructorId) -> StoreResult<Option<Instructor>> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.instructors.get(&id.into_inner()).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<Instructor>> {
        let state = self.state.read().expect("RwLock poisoned");
        let mut instructors: Vec<Instructor> = state.instructors.values().cloned().collect();
        instructors.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.into_inner().cmp(&a.id.into_inner()))
        });
        Ok(instructors)
    }

    async fn insert(&self, instructor: NewInstructor) -> StoreResult<Instructor> {
        let mut state = self.state.write().expect("RwLock poisoned");
        if state.email_in_use(&instructor.email, None) {
            return Err(StoreError::DuplicateEmail {
                email: instructor.email.to_string(),
            });
        }
        state.next_user_id += 1;
        let now = Utc::now();
        let instructor = Instructor {
            id: InstructorId::new(state.next_user_id),
            name: instructor.name,
            email: instructor.email,
            bio: instructor.bio,
            password_hash: instructor.password_hash,
            created_at: now,
            updated_at: now,
        };
        state
            .instructors
            .insert(instructor.id.into_inner(), instructor.clone());
        Ok(instructor)
    }

    async fn email_in_use(
        &self,
        email: &EmailAddress,
        exclude: Option<InstructorId>,
    ) -> StoreResult<bool> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.email_in_use(email, exclude.map(InstructorId::into_inner)))
    }
}

#[async_trait]
impl EnrollmentStore for MemoryStore {
    async fn find_by_id(&self, id: EnrollmentId) -> StoreResult<Option<Enrollment>> {
        let state = self.state.read().expect("RwLock poisoned");
        Ok(state.enrollments.get(&id.into_inner()).cloned())
    }

    async fn find_by_student(&self, student_id: StudentId) -> StoreResult<Vec<Enrollment>> {
        let state = self.state.read().expect("RwLock poisoned");
        let mut enrollments: Vec<Enrollment> = state
            .enrollments
            .values()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect();
        enrollments.sort_by(|a, b| {
            b.enrolled_at
                .cmp(&a.enrolled_at)
                .then(b.id.into_inner().cmp(&a.id.into_inner()))
        });
        Ok(enrollments)
    }

    async fn insert_active(&self, enrollment: NewEnrollment) -> StoreResult<Enrollment> {
        let mut state = self.state.write().expect("RwLock poisoned");
        let course_id = enrollment.course_id.into_inner();
        let student_id = enrollment.student_id.into_inner();

        // The whole check-then-insert runs under the write lock, which is
        // what makes concurrent enrollments race-safe here.
        let Some(max_students) = state
            .courses
            .get(&course_id)
            .map(|c| c.max_students.into_inner())
        else {
            return Err(StoreError::Internal(format!(
                "course {course_id} does not exist"
            )));
        };
        if state.count_active(course_id) >= max_students {
            return Err(StoreError::CourseFull {
                course_id: enrollment.course_id,
            });
        }
        if state.has_active(student_id, course_id) {
            return Err(StoreError::DuplicateActiveEnrollment {
                student_id: enrollment.student_id,
                course_id: enrollment.course_id,
            });
        }

        state.next_enrollment_id += 1;
        let now = Utc::now();
        let enrollment = Enrollment {
            id: EnrollmentId::new(state.next_enrollment_id),
            student_id: enrollment.student_id,
            course_id: enrollment.course_id,
            status: enrollment.status,
            enrolled_at: enrollment.enrolled_at,
            completed_at: None,
            grade: None,
            created_at: now,
            updated_at: now,
        };
        state
            .enrollments
            .insert(enrollment.id.into_inner(), enrollment.clone());
        Ok(enrollment)
    }

    async fn update(&self, enrollment: &Enrollment) -> StoreResult<()> {
        let mut state = self.state.write().expect("RwLock poisoned");
        match state.enrollments.get_mut(&enrollment.id.into_inner()) {
            Some(existing) => {
                *existing = enrollment.clone();
                Ok(())
            }
            None => Err(StoreError::Internal(format!(
                "enrollment {} does not exist",
                enrollment.id
            ))),
        }
    }

    async fn delete(&self, id: EnrollmentId) -> StoreResult<bool> {
        let mut state = self.state.write().expect("RwLock poisoned");
        Ok(state.enrollments.remove(&id.into_inner()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursecore::course::{CourseInput, CourseStatus};
    use coursecore::types::{PersonName, StudentNumber};
    use coursecore::user::PasswordHash;

    fn new_course(title: &str, max_students: i64, status: &str) -> NewCourse {
        CourseInput {
            title: Some(title.into()),
            description: Some("test".into()),
            max_students: Some(max_students),
            status: Some(status.into()),
            instructor_id: Some(1),
        }
        .parse()
        .unwrap()
    }

    fn new_student(name: &str, email: &str, number: &str) -> NewStudent {
        NewStudent {
            student_number: StudentNumber::try_new(number).unwrap(),
            name: PersonName::try_new(name).unwrap(),
            email: EmailAddress::try_new(email).unwrap(),
            password_hash: PasswordHash::from_stored("$2b$12$stub".into()),
        }
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = CourseStore::insert(&store, new_course("Course A", 10, "draft"))
            .await
            .unwrap();
        let b = CourseStore::insert(&store, new_course("Course B", 10, "draft"))
            .await
            .unwrap();
        assert_eq!(a.id.into_inner(), 1);
        assert_eq!(b.id.into_inner(), 2);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_across_user_kinds() {
        let store = MemoryStore::new();
        StudentStore::insert(&store, new_student("Ada Lovelace", "ada@example.com", "STD1"))
            .await
            .unwrap();

        let err = StudentStore::insert(
            &store,
            new_student("Ada Again", "ada@example.com", "STD2"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail { .. }));

        let err = InstructorStore::insert(
            &store,
            NewInstructor {
                name: PersonName::try_new("Ada Teaching").unwrap(),
                email: EmailAddress::try_new("ada@example.com").unwrap(),
                bio: String::new(),
                password_hash: PasswordHash::from_stored("$2b$12$stub".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail { .. }));
    }

    #[tokio::test]
    async fn insert_active_enforces_capacity_and_uniqueness() {
        let store = MemoryStore::new();
        let course = CourseStore::insert(&store, new_course("Tiny Course", 1, "published"))
            .await
            .unwrap();
        let first = StudentStore::insert(&store, new_student("Student One", "one@example.com", "S1"))
            .await
            .unwrap();
        let second =
            StudentStore::insert(&store, new_student("Student Two", "two@example.com", "S2"))
                .await
                .unwrap();

        store
            .insert_active(NewEnrollment::new(first.id, course.id))
            .await
            .unwrap();

        let err = store
            .insert_active(NewEnrollment::new(first.id, course.id))
            .await
            .unwrap_err();
        // the same student hits the capacity check first with a 1-seat course
        assert!(matches!(err, StoreError::CourseFull { .. }));

        let err = store
            .insert_active(NewEnrollment::new(second.id, course.id))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CourseFull { .. }));
    }

    #[tokio::test]
    async fn insert_active_rejects_duplicate_before_capacity_allows() {
        let store = MemoryStore::new();
        let course = CourseStore::insert(&store, new_course("Roomy Course", 10, "published"))
            .await
            .unwrap();
        let student = StudentStore::insert(
            &store,
            new_student("Student One", "one@example.com", "S1"),
        )
        .await
        .unwrap();

        store
            .insert_active(NewEnrollment::new(student.id, course.id))
            .await
            .unwrap();
        let err = store
            .insert_active(NewEnrollment::new(student.id, course.id))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateActiveEnrollment { .. }));
    }

    #[tokio::test]
    async fn find_by_student_orders_most_recent_first() {
        let store = MemoryStore::new();
        let course_a = CourseStore::insert(&store, new_course("Course A", 10, "published"))
            .await
            .unwrap();
        let course_b = CourseStore::insert(&store, new_course("Course B", 10, "published"))
            .await
            .unwrap();
        let student = StudentStore::insert(
            &store,
            new_student("Student One", "one@example.com", "S1"),
        )
        .await
        .unwrap();

        let first = store
            .insert_active(NewEnrollment::new(student.id, course_a.id))
            .await
            .unwrap();
        let second = store
            .insert_active(NewEnrollment::new(student.id, course_b.id))
            .await
            .unwrap();

        let listed = store.find_by_student(student.id).await.unwrap();
        assert_eq!(
            listed.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
    }

    #[tokio::test]
    async fn deleting_a_course_cascades_to_enrollments() {
        let store = MemoryStore::new();
        let course = CourseStore::insert(&store, new_course("Course A", 10, "published"))
            .await
            .unwrap();
        let student = StudentStore::insert(
            &store,
            new_student("Student One", "one@example.com", "S1"),
        )
        .await
        .unwrap();
        let enrollment = store
            .insert_active(NewEnrollment::new(student.id, course.id))
            .await
            .unwrap();

        assert!(CourseStore::delete(&store, course.id).await.unwrap());
        assert!(EnrollmentStore::find_by_id(&store, enrollment.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn course_list_honors_filters() {
        let store = MemoryStore::new();
        CourseStore::insert(&store, new_course("Draft Course", 10, "draft"))
            .await
            .unwrap();
        CourseStore::insert(&store, new_course("Published Course", 10, "published"))
            .await
            .unwrap();

        let published = CourseStore::list(
            &store,
            &CourseFilter {
                status: Some(CourseStatus::Published),
                instructor_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].title.as_ref(), "Published Course");
    }
}
