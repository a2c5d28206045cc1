//! End-to-end tests of the enrollment workflow against the in-memory
//! backend: rule ordering, the status state machine, and the observable
//! ordering of enrollment listings.

use std::sync::Arc;

use coursecore::course::CourseInput;
use coursecore::errors::DomainError;
use coursecore::service::{CourseService, EnrollmentService, StudentService};
use coursecore::student::StudentInput;
use coursecore::types::{CourseId, EnrollmentId, Grade, StudentId};
use coursecore::{Course, Student};
use coursecore_memory::MemoryStore;

struct Fixture {
    enrollments: EnrollmentService,
    courses: CourseService,
    students: StudentService,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    Fixture {
        enrollments: EnrollmentService::new(store.clone(), store.clone(), store.clone()),
        courses: CourseService::new(store.clone()),
        students: StudentService::new(store),
    }
}

async fn published_course(fixture: &Fixture, title: &str, max_students: i64) -> Course {
    let course = fixture
        .courses
        .create(CourseInput {
            title: Some(title.into()),
            description: Some("course under test".into()),
            max_students: Some(max_students),
            status: None,
            instructor_id: Some(1),
        })
        .await
        .unwrap();
    fixture.courses.publish(course.id).await.unwrap()
}

async fn student(fixture: &Fixture, name: &str, email: &str) -> Student {
    fixture
        .students
        .register(StudentInput {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some("a strong password".into()),
            student_number: None,
        })
        .await
        .unwrap()
}

fn business_message(err: &DomainError) -> &str {
    match err {
        DomainError::Business(message) => message,
        other => panic!("expected a business error, got {other:?}"),
    }
}

#[tokio::test]
async fn enroll_creates_an_active_enrollment() {
    let f = fixture();
    let course = published_course(&f, "Operating Systems", 20).await;
    let ada = student(&f, "Ada Lovelace", "ada@example.com").await;

    let enrollment = f.enrollments.enroll(ada.id, course.id).await.unwrap();
    assert!(enrollment.is_active());
    assert_eq!(enrollment.student_id, ada.id);
    assert_eq!(enrollment.course_id, course.id);
    assert!(enrollment.completed_at.is_none());
    assert!(enrollment.grade.is_none());
}

#[tokio::test]
async fn enroll_reports_missing_student_before_missing_course() {
    let f = fixture();
    let err = f
        .enrollments
        .enroll(StudentId::new(41), CourseId::new(999))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Student with ID 41 not found");
}

#[tokio::test]
async fn enroll_into_missing_course_writes_nothing() {
    let f = fixture();
    let ada = student(&f, "Ada Lovelace", "ada@example.com").await;

    let err = f
        .enrollments
        .enroll(ada.id, CourseId::new(999))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Course with ID 999 not found");

    let listed = f.enrollments.student_enrollments(ada.id).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn enroll_requires_a_published_course() {
    let f = fixture();
    let ada = student(&f, "Ada Lovelace", "ada@example.com").await;
    // plenty of capacity, but still a draft
    let draft = f
        .courses
        .create(CourseInput {
            title: Some("Draft Course".into()),
            description: Some("not yet published".into()),
            max_students: Some(100),
            status: None,
            instructor_id: Some(1),
        })
        .await
        .unwrap();

    let err = f.enrollments.enroll(ada.id, draft.id).await.unwrap_err();
    assert_eq!(business_message(&err), "Course is not published");

    let archived = published_course(&f, "Archived Course", 100).await;
    f.courses.archive(archived.id).await.unwrap();
    let err = f.enrollments.enroll(ada.id, archived.id).await.unwrap_err();
    assert_eq!(business_message(&err), "Course is not published");
}

#[tokio::test]
async fn enroll_rejects_a_full_course() {
    let f = fixture();
    let course = published_course(&f, "Tiny Seminar", 1).await;
    let ada = student(&f, "Ada Lovelace", "ada@example.com").await;
    let grace = student(&f, "Grace Hopper", "grace@example.com").await;

    f.enrollments.enroll(ada.id, course.id).await.unwrap();
    let err = f.enrollments.enroll(grace.id, course.id).await.unwrap_err();
    assert_eq!(business_message(&err), "Course is full");
}

#[tokio::test]
async fn enroll_rejects_a_duplicate_active_enrollment() {
    let f = fixture();
    let course = published_course(&f, "Compilers", 30).await;
    let ada = student(&f, "Ada Lovelace", "ada@example.com").await;

    f.enrollments.enroll(ada.id, course.id).await.unwrap();
    let err = f.enrollments.enroll(ada.id, course.id).await.unwrap_err();
    assert_eq!(
        business_message(&err),
        "Student is already enrolled in this course"
    );
}

#[tokio::test]
async fn cancelling_frees_a_capacity_slot() {
    let f = fixture();
    let course = published_course(&f, "Tiny Seminar", 1).await;
    let ada = student(&f, "Ada Lovelace", "ada@example.com").await;
    let grace = student(&f, "Grace Hopper", "grace@example.com").await;

    let first = f.enrollments.enroll(ada.id, course.id).await.unwrap();
    let err = f.enrollments.enroll(grace.id, course.id).await.unwrap_err();
    assert_eq!(business_message(&err), "Course is full");

    let cancelled = f.enrollments.cancel(first.id).await.unwrap();
    assert!(!cancelled.is_active());

    // the freed slot is immediately available again
    let second = f.enrollments.enroll(grace.id, course.id).await.unwrap();
    assert!(second.is_active());
}

#[tokio::test]
async fn completed_enrollments_do_not_block_re_enrollment() {
    let f = fixture();
    let course = published_course(&f, "Networks", 10).await;
    let ada = student(&f, "Ada Lovelace", "ada@example.com").await;

    let first = f.enrollments.enroll(ada.id, course.id).await.unwrap();
    f.enrollments
        .complete(first.id, Some(Grade::try_new(88.0).unwrap()))
        .await
        .unwrap();

    let second = f.enrollments.enroll(ada.id, course.id).await.unwrap();
    assert!(second.is_active());
}

#[tokio::test]
async fn complete_records_grade_and_timestamp() {
    let f = fixture();
    let course = published_course(&f, "Databases", 10).await;
    let ada = student(&f, "Ada Lovelace", "ada@example.com").await;
    let enrollment = f.enrollments.enroll(ada.id, course.id).await.unwrap();

    let completed = f
        .enrollments
        .complete(enrollment.id, Some(Grade::try_new(92.5).unwrap()))
        .await
        .unwrap();
    assert!(!completed.is_active());
    assert!(completed.completed_at.is_some());
    assert_eq!(completed.grade.unwrap().into_inner(), 92.5);

    // the transition persisted, not just the returned copy
    let reloaded = f.enrollments.get(enrollment.id).await.unwrap();
    assert_eq!(reloaded.status, completed.status);
}

#[tokio::test]
async fn terminal_states_reject_every_further_transition() {
    let f = fixture();
    let course = published_course(&f, "Graphics", 10).await;
    let ada = student(&f, "Ada Lovelace", "ada@example.com").await;
    let grace = student(&f, "Grace Hopper", "grace@example.com").await;

    let completed = f.enrollments.enroll(ada.id, course.id).await.unwrap();
    f.enrollments.complete(completed.id, None).await.unwrap();

    let err = f.enrollments.complete(completed.id, None).await.unwrap_err();
    assert_eq!(
        business_message(&err),
        "Only active enrollments can be completed"
    );
    let err = f.enrollments.cancel(completed.id).await.unwrap_err();
    assert_eq!(
        business_message(&err),
        "Only active enrollments can be cancelled"
    );

    let cancelled = f.enrollments.enroll(grace.id, course.id).await.unwrap();
    f.enrollments.cancel(cancelled.id).await.unwrap();

    let err = f.enrollments.cancel(cancelled.id).await.unwrap_err();
    assert_eq!(
        business_message(&err),
        "Only active enrollments can be cancelled"
    );
    let err = f.enrollments.complete(cancelled.id, None).await.unwrap_err();
    assert_eq!(
        business_message(&err),
        "Only active enrollments can be completed"
    );
}

#[tokio::test]
async fn transitions_on_missing_enrollments_are_not_found() {
    let f = fixture();
    let err = f
        .enrollments
        .complete(EnrollmentId::new(77), None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Enrollment with ID 77 not found");

    let err = f.enrollments.cancel(EnrollmentId::new(77)).await.unwrap_err();
    assert_eq!(err.to_string(), "Enrollment with ID 77 not found");
}

#[tokio::test]
async fn student_enrollments_lists_most_recent_first() {
    let f = fixture();
    let ada = student(&f, "Ada Lovelace", "ada@example.com").await;
    let first_course = published_course(&f, "Course One", 10).await;
    let second_course = published_course(&f, "Course Two", 10).await;

    let first = f.enrollments.enroll(ada.id, first_course.id).await.unwrap();
    let second = f
        .enrollments
        .enroll(ada.id, second_course.id)
        .await
        .unwrap();

    let listed = f.enrollments.student_enrollments(ada.id).await.unwrap();
    assert_eq!(
        listed.iter().map(|e| e.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );
}

#[tokio::test]
async fn student_enrollments_is_empty_for_an_enrollment_less_student() {
    let f = fixture();
    let ada = student(&f, "Ada Lovelace", "ada@example.com").await;
    let listed = f.enrollments.student_enrollments(ada.id).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn student_enrollments_requires_an_existing_student() {
    let f = fixture();
    let err = f
        .enrollments
        .student_enrollments(StudentId::new(5))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Student with ID 5 not found");
}

#[tokio::test]
async fn administrative_deletion_removes_the_record() {
    let f = fixture();
    let course = published_course(&f, "Algorithms", 10).await;
    let ada = student(&f, "Ada Lovelace", "ada@example.com").await;
    let enrollment = f.enrollments.enroll(ada.id, course.id).await.unwrap();

    f.enrollments.delete(enrollment.id).await.unwrap();
    let err = f.enrollments.get(enrollment.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));

    let err = f.enrollments.delete(enrollment.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}
