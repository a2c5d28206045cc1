//! Store trait implementations over the PostgreSQL pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coursecore::course::{Course, CourseStatus, NewCourse};
use coursecore::enrollment::{Enrollment, EnrollmentStatus, NewEnrollment};
use coursecore::errors::{StoreError, StoreResult};
use coursecore::instructor::{Instructor, NewInstructor};
use coursecore::store::{
    CourseFilter, CourseStore, EnrollmentStore, InstructorStore, StudentFilter, StudentStore,
};
use coursecore::student::{NewStudent, Student};
use coursecore::types::{
    CourseId, CourseTitle, EmailAddress, EnrollmentId, Grade, InstructorId, MaxStudents,
    PersonName, StudentId, StudentNumber,
};
use coursecore::user::PasswordHash;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::{info, instrument};

use crate::{map_sqlx_error, PostgresStore};

/// Name of the unique constraint guarding email uniqueness across users.
const EMAIL_CONSTRAINT: &str = "users_email_key";
/// Name of the partial unique index guarding one active enrollment per pair.
const ACTIVE_PAIR_CONSTRAINT: &str = "enrollments_one_active_per_pair";

fn violated_unique_constraint(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            db.constraint().map(ToOwned::to_owned)
        }
        _ => None,
    }
}

fn corrupt(detail: impl std::fmt::Display) -> StoreError {
    StoreError::Internal(format!("corrupt row: {detail}"))
}

fn course_from_row(row: &PgRow) -> StoreResult<Course> {
    let status_raw: String = row.try_get("status").map_err(map_sqlx_error)?;
    let status = CourseStatus::parse(&status_raw)
        .ok_or_else(|| corrupt(format!("unknown course status '{status_raw}'")))?;
    let title_raw: String = row.try_get("title").map_err(map_sqlx_error)?;
    let title = CourseTitle::try_new(title_raw).map_err(corrupt)?;
    let max_raw: i32 = row.try_get("max_students").map_err(map_sqlx_error)?;
    let max_students = u32::try_from(max_raw)
        .ok()
        .and_then(|value| MaxStudents::try_new(value).ok())
        .ok_or_else(|| corrupt(format!("non-positive max_students {max_raw}")))?;

    Ok(Course {
        id: CourseId::new(row.try_get("id").map_err(map_sqlx_error)?),
        title,
        description: row.try_get("description").map_err(map_sqlx_error)?,
        max_students,
        status,
        instructor_id: InstructorId::new(row.try_get("instructor_id").map_err(map_sqlx_error)?),
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
        updated_at: row.try_get("updated_at").map_err(map_sqlx_error)?,
    })
}

fn student_from_row(row: &PgRow) -> StoreResult<Student> {
    let email_raw: String = row.try_get("email").map_err(map_sqlx_error)?;
    let name_raw: String = row.try_get("name").map_err(map_sqlx_error)?;
    let number_raw: String = row.try_get("student_number").map_err(map_sqlx_error)?;
    Ok(Student {
        id: StudentId::new(row.try_get("id").map_err(map_sqlx_error)?),
        student_number: StudentNumber::try_new(number_raw).map_err(corrupt)?,
        name: PersonName::try_new(name_raw).map_err(corrupt)?,
        email: EmailAddress::try_new(email_raw).map_err(corrupt)?,
        password_hash: PasswordHash::from_stored(
            row.try_get("password_hash").map_err(map_sqlx_error)?,
        ),
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
        updated_at: row.try_get("updated_at").map_err(map_sqlx_error)?,
    })
}

fn instructor_from_row(row: &PgRow) -> StoreResult<Instructor> {
    let email_raw: String = row.try_get("email").map_err(map_sqlx_error)?;
    let name_raw: String = row.try_get("name").map_err(map_sqlx_error)?;
    Ok(Instructor {
        id: InstructorId::new(row.try_get("id").map_err(map_sqlx_error)?),
        name: PersonName::try_new(name_raw).map_err(corrupt)?,
        email: EmailAddress::try_new(email_raw).map_err(corrupt)?,
        bio: row.try_get("bio").map_err(map_sqlx_error)?,
        password_hash: PasswordHash::from_stored(
            row.try_get("password_hash").map_err(map_sqlx_error)?,
        ),
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
        updated_at: row.try_get("updated_at").map_err(map_sqlx_error)?,
    })
}

fn enrollment_from_row(row: &PgRow) -> StoreResult<Enrollment> {
    let status_raw: String = row.try_get("status").map_err(map_sqlx_error)?;
    let status = EnrollmentStatus::parse(&status_raw)
        .ok_or_else(|| corrupt(format!("unknown enrollment status '{status_raw}'")))?;
    let grade = row
        .try_get::<Option<f64>, _>("grade")
        .map_err(map_sqlx_error)?
        .map(Grade::try_new)
        .transpose()
        .map_err(corrupt)?;

    Ok(Enrollment {
        id: EnrollmentId::new(row.try_get("id").map_err(map_sqlx_error)?),
        student_id: StudentId::new(row.try_get("student_id").map_err(map_sqlx_error)?),
        course_id: CourseId::new(row.try_get("course_id").map_err(map_sqlx_error)?),
        status,
        enrolled_at: row.try_get("enrolled_at").map_err(map_sqlx_error)?,
        completed_at: row.try_get("completed_at").map_err(map_sqlx_error)?,
        grade,
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
        updated_at: row.try_get("updated_at").map_err(map_sqlx_error)?,
    })
}

const COURSE_COLUMNS: &str =
    "id, title, description, max_students, status, instructor_id, created_at, updated_at";

const STUDENT_COLUMNS: &str = "u.id, u.email, u.password_hash, u.name, \
     u.created_at, u.updated_at, s.student_number";

const INSTRUCTOR_COLUMNS: &str =
    "u.id, u.email, u.password_hash, u.name, u.created_at, u.updated_at, i.bio";

const ENROLLMENT_COLUMNS: &str = "id, student_id, course_id, status, enrolled_at, \
     completed_at, grade, created_at, updated_at";

#[async_trait]
impl CourseStore for PostgresStore {
    #[instrument(name = "postgres.course_find", skip(self))]
    async fn find_by_id(&self, id: CourseId) -> StoreResult<Option<Course>> {
        let row = sqlx::query(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        row.as_ref().map(course_from_row).transpose()
    }

    #[instrument(name = "postgres.course_list", skip(self))]
    async fn list(&self, filter: &CourseFilter) -> StoreResult<Vec<Course>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE 1 = 1"
        ));
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(instructor_id) = filter.instructor_id {
            query
                .push(" AND instructor_id = ")
                .push_bind(instructor_id.into_inner());
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        let rows = query
            .build()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(course_from_row).collect()
    }

    #[instrument(name = "postgres.course_insert", skip(self, course))]
    async fn insert(&self, course: NewCourse) -> StoreResult<Course> {
        let row = sqlx::query(
            "INSERT INTO courses (title, description, max_students, status, instructor_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, created_at, updated_at",
        )
        .bind(course.title.as_ref())
        .bind(&course.description)
        .bind(i32::try_from(course.max_students.into_inner()).unwrap_or(i32::MAX))
        .bind(course.status.as_str())
        .bind(course.instructor_id.into_inner())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
        info!(course_id = id, "[postgres.course_insert] course row created");
        Ok(Course {
            id: CourseId::new(id),
            title: course.title,
            description: course.description,
            max_students: course.max_students,
            status: course.status,
            instructor_id: course.instructor_id,
            created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
            updated_at: row.try_get("updated_at").map_err(map_sqlx_error)?,
        })
    }

    #[instrument(name = "postgres.course_update", skip(self, course))]
    async fn update(&self, course: &Course) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE courses \
             SET title = $1, description = $2, max_students = $3, status = $4, \
                 instructor_id = $5, updated_at = $6 \
             WHERE id = $7",
        )
        .bind(course.title.as_ref())
        .bind(&course.description)
        .bind(i32::try_from(course.max_students.into_inner()).unwrap_or(i32::MAX))
        .bind(course.status.as_str())
        .bind(course.instructor_id.into_inner())
        .bind(course.updated_at)
        .bind(course.id.into_inner())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Internal(format!(
                "course {} does not exist",
                course.id
            )));
        }
        Ok(())
    }

    #[instrument(name = "postgres.course_delete", skip(self))]
    async fn delete(&self, id: CourseId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(name = "postgres.course_count_active", skip(self))]
    async fn count_active_enrollments(&self, course_id: CourseId) -> StoreResult<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) FROM enrollments WHERE course_id = $1 AND status = 'active'",
        )
        .bind(course_id.into_inner())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        let count: i64 = row.try_get(0).map_err(map_sqlx_error)?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

#[async_trait]
impl StudentStore for PostgresStore {
    #[instrument(name = "postgres.student_find", skip(self))]
    async fn find_by_id(&self, id: StudentId) -> StoreResult<Option<Student>> {
        let row = sqlx::query(&format!(
            "SELECT {STUDENT_COLUMNS} FROM users u \
             JOIN students s ON s.id = u.id WHERE u.id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        row.as_ref().map(student_from_row).transpose()
    }

    #[instrument(name = "postgres.student_list", skip(self))]
    async fn list(&self, filter: &StudentFilter) -> StoreResult<Vec<Student>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {STUDENT_COLUMNS} FROM users u \
             JOIN students s ON s.id = u.id WHERE 1 = 1"
        ));
        if let Some(needle) = &filter.student_number {
            query
                .push(" AND s.student_number LIKE ")
                .push_bind(format!("%{needle}%"));
        }
        query.push(" ORDER BY u.created_at DESC, u.id DESC");

        let rows = query
            .build()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(student_from_row).collect()
    }

    #[instrument(name = "postgres.student_insert", skip(self, student))]
    async fn insert(&self, student: NewStudent) -> StoreResult<Student> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query(
            "INSERT INTO users (email, password_hash, name, role) \
             VALUES ($1, $2, $3, 'student') \
             RETURNING id, created_at, updated_at",
        )
        .bind(student.email.as_ref())
        .bind(student.password_hash.as_str())
        .bind(student.name.as_ref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|error| {
            if violated_unique_constraint(&error).as_deref() == Some(EMAIL_CONSTRAINT) {
                StoreError::DuplicateEmail {
                    email: student.email.to_string(),
                }
            } else {
                map_sqlx_error(error)
            }
        })?;
        let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;

        sqlx::query("INSERT INTO students (id, student_number) VALUES ($1, $2)")
            .bind(id)
            .bind(student.student_number.as_ref())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        info!(student_id = id, "[postgres.student_insert] student row created");

        Ok(Student {
            id: StudentId::new(id),
            student_number: student.student_number,
            name: student.name,
            email: student.email,
            password_hash: student.password_hash,
            created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
            updated_at: row.try_get("updated_at").map_err(map_sqlx_error)?,
        })
    }

    #[instrument(name = "postgres.student_update", skip(self, student))]
    async fn update(&self, student: &Student) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET email = $1, name = $2, updated_at = $3 \
             WHERE id = $4 AND role = 'student'",
        )
        .bind(student.email.as_ref())
        .bind(student.name.as_ref())
        .bind(student.updated_at)
        .bind(student.id.into_inner())
        .execute(self.pool())
        .await
        .map_err(|error| {
            if violated_unique_constraint(&error).as_deref() == Some(EMAIL_CONSTRAINT) {
                StoreError::DuplicateEmail {
                    email: student.email.to_string(),
                }
            } else {
                map_sqlx_error(error)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Internal(format!(
                "student {} does not exist",
                student.id
            )));
        }
        Ok(())
    }

    #[instrument(name = "postgres.student_delete", skip(self))]
    async fn delete(&self, id: StudentId) -> StoreResult<bool> {
        // deleting the users row cascades to students and enrollments
        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND role = 'student'")
            .bind(id.into_inner())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(name = "postgres.student_has_active", skip(self))]
    async fn has_active_enrollment(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS ( \
                 SELECT 1 FROM enrollments \
                 WHERE student_id = $1 AND course_id = $2 AND status = 'active' \
             )",
        )
        .bind(student_id.into_inner())
        .bind(course_id.into_inner())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        row.try_get(0).map_err(map_sqlx_error)
    }

    async fn email_in_use(
        &self,
        email: &EmailAddress,
        exclude: Option<StudentId>,
    ) -> StoreResult<bool> {
        email_in_use(self, email, exclude.map(StudentId::into_inner)).await
    }
}

#[async_trait]
impl InstructorStore for PostgresStore {
    #[instrument(name = "postgres.instructor_find", skip(self))]
    async fn find_by_id(&self, id: InstructorId) -> StoreResult<Option<Instructor>> {
        let row = sqlx::query(&format!(
            "SELECT {INSTRUCTOR_COLUMNS} FROM users u \
             JOIN instructors i ON i.id = u.id WHERE u.id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        row.as_ref().map(instructor_from_row).transpose()
    }

    #[instrument(name = "postgres.instructor_list", skip(self))]
    async fn list(&self) -> StoreResult<Vec<Instructor>> {
        let rows = sqlx::query(&format!(
            "SELECT {INSTRUCTOR_COLUMNS} FROM users u \
             JOIN instructors i ON i.id = u.id \
             ORDER BY u.created_at DESC, u.id DESC"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(instructor_from_row).collect()
    }

    #[instrument(name = "postgres.instructor_insert", skip(self, instructor))]
    async fn insert(&self, instructor: NewInstructor) -> StoreResult<Instructor> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query(
            "INSERT INTO users (email, password_hash, name, role) \
             VALUES ($1, $2, $3, 'instructor') \
             RETURNING id, created_at, updated_at",
        )
        .bind(instructor.email.as_ref())
        .bind(instructor.password_hash.as_str())
        .bind(instructor.name.as_ref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|error| {
            if violated_unique_constraint(&error).as_deref() == Some(EMAIL_CONSTRAINT) {
                StoreError::DuplicateEmail {
                    email: instructor.email.to_string(),
                }
            } else {
                map_sqlx_error(error)
            }
        })?;
        let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;

        sqlx::query("INSERT INTO instructors (id, bio) VALUES ($1, $2)")
            .bind(id)
            .bind(&instructor.bio)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        info!(
            instructor_id = id,
            "[postgres.instructor_insert] instructor row created"
        );

        Ok(Instructor {
            id: InstructorId::new(id),
            name: instructor.name,
            email: instructor.email,
            bio: instructor.bio,
            password_hash: instructor.password_hash,
            created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
            updated_at: row.try_get("updated_at").map_err(map_sqlx_error)?,
        })
    }

    async fn email_in_use(
        &self,
        email: &EmailAddress,
        exclude: Option<InstructorId>,
    ) -> StoreResult<bool> {
        email_in_use(self, email, exclude.map(InstructorId::into_inner)).await
    }
}

#[async_trait]
impl EnrollmentStore for PostgresStore {
    #[instrument(name = "postgres.enrollment_find", skip(self))]
    async fn find_by_id(&self, id: EnrollmentId) -> StoreResult<Option<Enrollment>> {
        let row = sqlx::query(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        row.as_ref().map(enrollment_from_row).transpose()
    }

    #[instrument(name = "postgres.enrollment_find_by_student", skip(self))]
    async fn find_by_student(&self, student_id: StudentId) -> StoreResult<Vec<Enrollment>> {
        let rows = sqlx::query(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments \
             WHERE student_id = $1 ORDER BY enrolled_at DESC, id DESC"
        ))
        .bind(student_id.into_inner())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(enrollment_from_row).collect()
    }

    /// Runs the constraint-arbitrated write: the course row is locked for
    /// the duration of the transaction, so concurrent inserts against the
    /// same course serialize on the capacity recount, and the partial
    /// unique index catches a concurrent duplicate for the same student.
    #[instrument(name = "postgres.enrollment_insert", skip(self, enrollment))]
    async fn insert_active(&self, enrollment: NewEnrollment) -> StoreResult<Enrollment> {
        let student_id = enrollment.student_id;
        let course_id = enrollment.course_id;
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let course_row = sqlx::query("SELECT max_students FROM courses WHERE id = $1 FOR UPDATE")
            .bind(course_id.into_inner())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        let Some(course_row) = course_row else {
            return Err(StoreError::Internal(format!(
                "course {course_id} does not exist"
            )));
        };
        let max_students: i32 = course_row.try_get("max_students").map_err(map_sqlx_error)?;

        let count_row = sqlx::query(
            "SELECT COUNT(*) FROM enrollments WHERE course_id = $1 AND status = 'active'",
        )
        .bind(course_id.into_inner())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        let current: i64 = count_row.try_get(0).map_err(map_sqlx_error)?;
        if current >= i64::from(max_students) {
            return Err(StoreError::CourseFull { course_id });
        }

        let row = sqlx::query(
            "INSERT INTO enrollments (student_id, course_id, status, enrolled_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, created_at, updated_at",
        )
        .bind(student_id.into_inner())
        .bind(course_id.into_inner())
        .bind(enrollment.status.as_str())
        .bind(enrollment.enrolled_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|error| {
            if violated_unique_constraint(&error).as_deref() == Some(ACTIVE_PAIR_CONSTRAINT) {
                StoreError::DuplicateActiveEnrollment {
                    student_id,
                    course_id,
                }
            } else {
                map_sqlx_error(error)
            }
        })?;

        tx.commit().await.map_err(map_sqlx_error)?;

        let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
        info!(
            enrollment_id = id,
            student_id = student_id.into_inner(),
            course_id = course_id.into_inner(),
            "[postgres.enrollment_insert] enrollment row created"
        );
        Ok(Enrollment {
            id: EnrollmentId::new(id),
            student_id,
            course_id,
            status: enrollment.status,
            enrolled_at: enrollment.enrolled_at,
            completed_at: None,
            grade: None,
            created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
            updated_at: row.try_get("updated_at").map_err(map_sqlx_error)?,
        })
    }

    #[instrument(name = "postgres.enrollment_update", skip(self, enrollment))]
    async fn update(&self, enrollment: &Enrollment) -> StoreResult<()> {
        let completed_at: Option<DateTime<Utc>> = enrollment.completed_at;
        let result = sqlx::query(
            "UPDATE enrollments \
             SET status = $1, completed_at = $2, grade = $3, updated_at = $4 \
             WHERE id = $5",
        )
        .bind(enrollment.status.as_str())
        .bind(completed_at)
        .bind(enrollment.grade.map(Grade::into_inner))
        .bind(enrollment.updated_at)
        .bind(enrollment.id.into_inner())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Internal(format!(
                "enrollment {} does not exist",
                enrollment.id
            )));
        }
        Ok(())
    }

    #[instrument(name = "postgres.enrollment_delete", skip(self))]
    async fn delete(&self, id: EnrollmentId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}

async fn email_in_use(
    store: &PostgresStore,
    email: &EmailAddress,
    exclude: Option<i64>,
) -> StoreResult<bool> {
    let row = sqlx::query(
        "SELECT EXISTS ( \
             SELECT 1 FROM users WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2) \
         )",
    )
    .bind(email.as_ref())
    .bind(exclude)
    .fetch_one(store.pool())
    .await
    .map_err(map_sqlx_error)?;
    row.try_get(0).map_err(map_sqlx_error)
}
