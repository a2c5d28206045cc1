//! Route table and handlers. Handlers translate between the wire and the
//! domain services; every outcome is rendered through [`ApiResponse`].

use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use coursecore::course::{CourseInput, CourseStatus};
use coursecore::errors::ValidationErrors;
use coursecore::instructor::InstructorInput;
use coursecore::store::{CourseFilter, StudentFilter};
use coursecore::student::{StudentInput, StudentUpdate};
use coursecore::types::{CourseId, EnrollmentId, Grade, InstructorId, StudentId};
use serde::Deserialize;
use serde_json::json;

use crate::envelope::ApiResponse;
use crate::state::AppState;

/// Builds the full route table over the given application state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{id}",
            get(show_course).put(update_course).delete(delete_course),
        )
        .route("/courses/{id}/publish", put(publish_course))
        .route("/courses/{id}/unpublish", put(unpublish_course))
        .route("/courses/{id}/archive", put(archive_course))
        .route("/students", get(list_students).post(create_student))
        .route(
            "/students/{id}",
            get(show_student).put(update_student).delete(delete_student),
        )
        .route("/students/{id}/enrollments", get(student_enrollments))
        .route("/instructors", get(list_instructors).post(create_instructor))
        .route("/instructors/{id}", get(show_instructor))
        .route("/enrollments", post(create_enrollment))
        .route(
            "/enrollments/{id}",
            get(show_enrollment).delete(delete_enrollment),
        )
        .route("/enrollments/{id}/complete", put(complete_enrollment))
        .route("/enrollments/{id}/cancel", put(cancel_enrollment))
        .with_state(state)
}

async fn service_info() -> ApiResponse {
    ApiResponse::success(
        json!({
            "endpoints": {
                "GET /courses": "Get all courses",
                "GET /courses/{id}": "Get course by ID",
                "POST /courses": "Create new course",
                "PUT /courses/{id}": "Update course",
                "DELETE /courses/{id}": "Delete course",
                "PUT /courses/{id}/publish": "Publish course",
                "PUT /courses/{id}/unpublish": "Unpublish course",
                "PUT /courses/{id}/archive": "Archive course",
                "GET /students": "Get all students",
                "GET /students/{id}": "Get student by ID",
                "POST /students": "Create new student",
                "PUT /students/{id}": "Update student",
                "DELETE /students/{id}": "Delete student",
                "GET /students/{id}/enrollments": "Get student enrollments",
                "GET /instructors": "Get all instructors",
                "GET /instructors/{id}": "Get instructor by ID",
                "POST /instructors": "Create new instructor",
                "POST /enrollments": "Enroll student in course",
                "GET /enrollments/{id}": "Get enrollment by ID",
                "DELETE /enrollments/{id}": "Delete enrollment",
                "PUT /enrollments/{id}/complete": "Complete enrollment",
                "PUT /enrollments/{id}/cancel": "Cancel enrollment",
            }
        }),
        "E-Learning API is running!",
    )
}

#[derive(Debug, Deserialize)]
struct CourseListQuery {
    status: Option<String>,
    instructor_id: Option<i64>,
}

async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CourseListQuery>,
) -> ApiResponse {
    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => match CourseStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                return ApiResponse::validation_error(ValidationErrors::single(
                    "status",
                    "Status must be draft, published, or archived",
                ));
            }
        },
    };
    let filter = CourseFilter {
        status,
        instructor_id: query.instructor_id.map(InstructorId::new),
    };
    match state.courses.list(&filter).await {
        Ok(courses) => {
            let total = courses.len();
            ApiResponse::success(courses, "Courses retrieved successfully")
                .with_meta("total", total)
        }
        Err(err) => err.into(),
    }
}

async fn show_course(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResponse {
    match state.courses.get(CourseId::new(id)).await {
        Ok(course) => ApiResponse::success(course, "Course retrieved successfully"),
        Err(err) => err.into(),
    }
}

async fn create_course(
    State(state): State<AppState>,
    body: Option<Json<CourseInput>>,
) -> ApiResponse {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    match state.courses.create(input).await {
        Ok(course) => ApiResponse::created(course, "Course created successfully"),
        Err(err) => err.into(),
    }
}

async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Option<Json<CourseInput>>,
) -> ApiResponse {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    match state.courses.update(CourseId::new(id), input).await {
        Ok(course) => ApiResponse::success(course, "Course updated successfully"),
        Err(err) => err.into(),
    }
}

async fn delete_course(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResponse {
    match state.courses.delete(CourseId::new(id)).await {
        Ok(()) => ApiResponse::success_empty("Course deleted successfully"),
        Err(err) => err.into(),
    }
}

async fn publish_course(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResponse {
    match state.courses.publish(CourseId::new(id)).await {
        Ok(course) => ApiResponse::success(course, "Course published successfully"),
        Err(err) => err.into(),
    }
}

async fn unpublish_course(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResponse {
    match state.courses.unpublish(CourseId::new(id)).await {
        Ok(course) => ApiResponse::success(course, "Course unpublished successfully"),
        Err(err) => err.into(),
    }
}

async fn archive_course(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResponse {
    match state.courses.archive(CourseId::new(id)).await {
        Ok(course) => ApiResponse::success(course, "Course archived successfully"),
        Err(err) => err.into(),
    }
}

#[derive(Debug, Deserialize)]
struct StudentListQuery {
    student_number: Option<String>,
}

async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<StudentListQuery>,
) -> ApiResponse {
    let filter = StudentFilter {
        student_number: query.student_number,
    };
    match state.students.list(&filter).await {
        Ok(students) => {
            let total = students.len();
            ApiResponse::success(students, "Students retrieved successfully")
                .with_meta("total", total)
        }
        Err(err) => err.into(),
    }
}

async fn show_student(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResponse {
    match state.students.get(StudentId::new(id)).await {
        Ok(student) => ApiResponse::success(student, "Student retrieved successfully"),
        Err(err) => err.into(),
    }
}

async fn create_student(
    State(state): State<AppState>,
    body: Option<Json<StudentInput>>,
) -> ApiResponse {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    match state.students.register(input).await {
        Ok(student) => ApiResponse::created(student, "Student created successfully"),
        Err(err) => err.into(),
    }
}

async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Option<Json<StudentUpdate>>,
) -> ApiResponse {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    match state.students.update(StudentId::new(id), input).await {
        Ok(student) => ApiResponse::success(student, "Student updated successfully"),
        Err(err) => err.into(),
    }
}

async fn delete_student(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResponse {
    match state.students.delete(StudentId::new(id)).await {
        Ok(()) => ApiResponse::success_empty("Student deleted successfully"),
        Err(err) => err.into(),
    }
}

async fn student_enrollments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResponse {
    match state.enrollments.student_enrollments(StudentId::new(id)).await {
        Ok(enrollments) => {
            let total = enrollments.len();
            ApiResponse::success(enrollments, "Student enrollments retrieved successfully")
                .with_meta("total", total)
        }
        Err(err) => err.into(),
    }
}

async fn list_instructors(State(state): State<AppState>) -> ApiResponse {
    match state.instructors.list().await {
        Ok(instructors) => {
            let total = instructors.len();
            ApiResponse::success(instructors, "Instructors retrieved successfully")
                .with_meta("total", total)
        }
        Err(err) => err.into(),
    }
}

async fn show_instructor(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResponse {
    match state.instructors.get(InstructorId::new(id)).await {
        Ok(instructor) => ApiResponse::success(instructor, "Instructor retrieved successfully"),
        Err(err) => err.into(),
    }
}

async fn create_instructor(
    State(state): State<AppState>,
    body: Option<Json<InstructorInput>>,
) -> ApiResponse {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    match state.instructors.register(input).await {
        Ok(instructor) => ApiResponse::created(instructor, "Instructor created successfully"),
        Err(err) => err.into(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct EnrollRequest {
    student_id: Option<i64>,
    course_id: Option<i64>,
}

async fn create_enrollment(
    State(state): State<AppState>,
    body: Option<Json<EnrollRequest>>,
) -> ApiResponse {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let (Some(student_id), Some(course_id)) = (request.student_id, request.course_id) else {
        return ApiResponse::error("student_id and course_id are required", 400);
    };
    match state
        .enrollments
        .enroll(StudentId::new(student_id), CourseId::new(course_id))
        .await
    {
        Ok(enrollment) => ApiResponse::created(enrollment, "Enrollment created successfully"),
        Err(err) => err.into(),
    }
}

async fn show_enrollment(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResponse {
    match state.enrollments.get(EnrollmentId::new(id)).await {
        Ok(enrollment) => ApiResponse::success(enrollment, "Enrollment retrieved successfully"),
        Err(err) => err.into(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct CompleteRequest {
    grade: Option<f64>,
}

async fn complete_enrollment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Option<Json<CompleteRequest>>,
) -> ApiResponse {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let grade = match request.grade {
        None => None,
        Some(raw) => match Grade::try_new(raw) {
            Ok(grade) => Some(grade),
            Err(_) => {
                return ApiResponse::validation_error(ValidationErrors::single(
                    "grade",
                    "Grade must be between 0 and 100",
                ));
            }
        },
    };
    match state.enrollments.complete(EnrollmentId::new(id), grade).await {
        Ok(enrollment) => ApiResponse::success(enrollment, "Enrollment completed successfully"),
        Err(err) => err.into(),
    }
}

async fn cancel_enrollment(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResponse {
    match state.enrollments.cancel(EnrollmentId::new(id)).await {
        Ok(enrollment) => ApiResponse::success(enrollment, "Enrollment cancelled successfully"),
        Err(err) => err.into(),
    }
}

async fn delete_enrollment(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResponse {
    match state.enrollments.delete(EnrollmentId::new(id)).await {
        Ok(()) => ApiResponse::success_empty("Enrollment deleted successfully"),
        Err(err) => err.into(),
    }
}
