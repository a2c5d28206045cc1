//! Tests of the course, student and instructor registries against the
//! in-memory backend: validation surfacing, email uniqueness and the
//! publication lifecycle.

use std::sync::Arc;

use coursecore::course::{CourseInput, CourseStatus};
use coursecore::errors::DomainError;
use coursecore::instructor::InstructorInput;
use coursecore::service::{CourseService, InstructorService, StudentService};
use coursecore::store::{CourseFilter, StudentFilter};
use coursecore::student::{StudentInput, StudentUpdate};
use coursecore::types::{CourseId, InstructorId, StudentId};
use coursecore_memory::MemoryStore;

fn services() -> (CourseService, StudentService, InstructorService) {
    let store = Arc::new(MemoryStore::new());
    (
        CourseService::new(store.clone()),
        StudentService::new(store.clone()),
        InstructorService::new(store),
    )
}

fn course_input(title: &str, instructor_id: i64) -> CourseInput {
    CourseInput {
        title: Some(title.into()),
        description: Some("about the course".into()),
        max_students: Some(25),
        status: None,
        instructor_id: Some(instructor_id),
    }
}

fn student_input(name: &str, email: &str) -> StudentInput {
    StudentInput {
        name: Some(name.into()),
        email: Some(email.into()),
        password: Some("a strong password".into()),
        student_number: None,
    }
}

fn validation_messages<'e>(err: &'e DomainError, field: &str) -> &'e [String] {
    match err {
        DomainError::Validation(errors) => errors.messages(field),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn course_crud_round_trip() {
    let (courses, _, _) = services();
    let created = courses.create(course_input("Rust in Anger", 1)).await.unwrap();
    assert_eq!(created.status, CourseStatus::Draft);
    assert_eq!(created.max_students.into_inner(), 25);

    let fetched = courses.get(created.id).await.unwrap();
    assert_eq!(fetched.title.as_ref(), "Rust in Anger");

    let updated = courses
        .update(
            created.id,
            CourseInput {
                max_students: Some(40),
                ..CourseInput::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.max_students.into_inner(), 40);
    assert_eq!(updated.title.as_ref(), "Rust in Anger");

    courses.delete(created.id).await.unwrap();
    let err = courses.get(created.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn course_creation_surfaces_field_errors() {
    let (courses, _, _) = services();
    let err = courses
        .create(CourseInput {
            title: Some("ab".into()),
            max_students: Some(0),
            ..CourseInput::default()
        })
        .await
        .unwrap_err();
    assert_eq!(
        validation_messages(&err, "title"),
        ["Title must be at least 3 characters"]
    );
    assert_eq!(
        validation_messages(&err, "max_students"),
        ["Max students must be greater than 0"]
    );
    assert_eq!(
        validation_messages(&err, "instructor_id"),
        ["Instructor is required"]
    );
}

#[tokio::test]
async fn publication_lifecycle_round_trip() {
    let (courses, _, _) = services();
    let course = courses.create(course_input("Lifecycle", 1)).await.unwrap();

    let published = courses.publish(course.id).await.unwrap();
    assert!(published.is_published());

    let drafted = courses.unpublish(course.id).await.unwrap();
    assert_eq!(drafted.status, CourseStatus::Draft);

    let archived = courses.archive(course.id).await.unwrap();
    assert_eq!(archived.status, CourseStatus::Archived);

    let err = courses.publish(CourseId::new(404)).await.unwrap_err();
    assert_eq!(err.to_string(), "Course with ID 404 not found");
}

#[tokio::test]
async fn course_listing_filters_by_status_and_instructor() {
    let (courses, _, _) = services();
    let teaching = courses.create(course_input("By One", 1)).await.unwrap();
    courses.publish(teaching.id).await.unwrap();
    courses.create(course_input("By Two", 2)).await.unwrap();

    let published = courses
        .list(&CourseFilter {
            status: Some(CourseStatus::Published),
            instructor_id: None,
        })
        .await
        .unwrap();
    assert_eq!(published.len(), 1);

    let by_two = courses
        .list(&CourseFilter {
            status: None,
            instructor_id: Some(InstructorId::new(2)),
        })
        .await
        .unwrap();
    assert_eq!(by_two.len(), 1);
    assert_eq!(by_two[0].title.as_ref(), "By Two");
}

#[tokio::test]
async fn registration_generates_a_student_number() {
    let (_, students, _) = services();
    let ada = students
        .register(student_input("Ada Lovelace", "ada@example.com"))
        .await
        .unwrap();
    assert!(ada.student_number.starts_with("STD"));
}

#[tokio::test]
async fn registration_rejects_a_taken_email_across_roles() {
    let (_, students, instructors) = services();
    instructors
        .register(InstructorInput {
            name: Some("Grace Hopper".into()),
            email: Some("grace@example.com".into()),
            password: Some("a strong password".into()),
            bio: None,
        })
        .await
        .unwrap();

    let err = students
        .register(student_input("Grace Imposter", "grace@example.com"))
        .await
        .unwrap_err();
    assert_eq!(
        validation_messages(&err, "email"),
        ["Email is already in use"]
    );
}

#[tokio::test]
async fn profile_update_rechecks_email_uniqueness() {
    let (_, students, _) = services();
    students
        .register(student_input("Ada Lovelace", "ada@example.com"))
        .await
        .unwrap();
    let grace = students
        .register(student_input("Grace Hopper", "grace@example.com"))
        .await
        .unwrap();

    let err = students
        .update(
            grace.id,
            StudentUpdate {
                name: None,
                email: Some("ada@example.com".into()),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        validation_messages(&err, "email"),
        ["Email is already in use"]
    );

    // keeping your own email is not a conflict
    let unchanged = students
        .update(
            grace.id,
            StudentUpdate {
                name: Some("Rear Admiral Hopper".into()),
                email: Some("grace@example.com".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(unchanged.name.as_ref(), "Rear Admiral Hopper");
}

#[tokio::test]
async fn student_listing_filters_by_number_substring() {
    let (_, students, _) = services();
    students
        .register(StudentInput {
            student_number: Some("STD20260001".into()),
            ..student_input("Ada Lovelace", "ada@example.com")
        })
        .await
        .unwrap();
    students
        .register(StudentInput {
            student_number: Some("XYZ999".into()),
            ..student_input("Grace Hopper", "grace@example.com")
        })
        .await
        .unwrap();

    let matched = students
        .list(&StudentFilter {
            student_number: Some("STD2026".into()),
        })
        .await
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name.as_ref(), "Ada Lovelace");
}

#[tokio::test]
async fn deleting_an_unknown_student_is_not_found() {
    let (_, students, _) = services();
    let err = students.delete(StudentId::new(12)).await.unwrap_err();
    assert_eq!(err.to_string(), "Student with ID 12 not found");
}

#[tokio::test]
async fn instructor_registration_and_lookup() {
    let (_, _, instructors) = services();
    let grace = instructors
        .register(InstructorInput {
            name: Some("Grace Hopper".into()),
            email: Some("grace@example.com".into()),
            password: Some("a strong password".into()),
            bio: Some("Compiler pioneer".into()),
        })
        .await
        .unwrap();

    let fetched = instructors.get(grace.id).await.unwrap();
    assert_eq!(fetched.bio, "Compiler pioneer");
    assert_eq!(instructors.list().await.unwrap().len(), 1);

    let err = instructors.get(InstructorId::new(99)).await.unwrap_err();
    assert_eq!(err.to_string(), "Instructor with ID 99 not found");
}
