//! Student registry workflow: registration, profile edits, queries.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::errors::{DomainError, DomainResult, ResourceKind, StoreError, ValidationErrors};
use crate::store::{StudentFilter, StudentStore};
use crate::student::{NewStudent, Student, StudentInput, StudentUpdate};
use crate::types::{StudentId, StudentNumber};
use crate::user::PasswordHash;

/// Message used for both the pre-check and a losing concurrent insert.
const EMAIL_TAKEN: &str = "Email is already in use";

/// Orchestrates student management against the student store.
#[derive(Clone)]
pub struct StudentService {
    students: Arc<dyn StudentStore>,
}

impl StudentService {
    /// Creates the workflow with an explicit store handle.
    pub fn new(students: Arc<dyn StudentStore>) -> Self {
        Self { students }
    }

    /// Registers a student: validates the input, checks email uniqueness
    /// across all users, hashes the password and generates a student number
    /// when none was supplied.
    #[instrument(skip(self, input))]
    pub async fn register(&self, input: StudentInput) -> DomainResult<Student> {
        let valid = input.parse().map_err(DomainError::Validation)?;

        if self.students.email_in_use(&valid.email, None).await? {
            return Err(email_taken());
        }

        let password_hash = PasswordHash::hash(&valid.password)?;
        let student_number = valid
            .student_number
            .unwrap_or_else(StudentNumber::generate);

        let new_student = NewStudent {
            student_number,
            name: valid.name,
            email: valid.email,
            password_hash,
        };

        let student = match self.students.insert(new_student).await {
            Ok(student) => student,
            Err(StoreError::DuplicateEmail { .. }) => return Err(email_taken()),
            Err(err) => return Err(err.into()),
        };
        info!(student_id = %student.id, "student registered");
        Ok(student)
    }

    /// Applies a profile update. Email uniqueness is re-checked when the
    /// email changes; the password is not editable through this path.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: StudentId, input: StudentUpdate) -> DomainResult<Student> {
        let mut student = self.load(id).await?;
        let previous_email = student.email.clone();
        student.apply_update(input).map_err(DomainError::Validation)?;

        if student.email != previous_email
            && self
                .students
                .email_in_use(&student.email, Some(id))
                .await?
        {
            return Err(email_taken());
        }

        match self.students.update(&student).await {
            Ok(()) => Ok(student),
            Err(StoreError::DuplicateEmail { .. }) => Err(email_taken()),
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes a student.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: StudentId) -> DomainResult<()> {
        if self.students.delete(id).await? {
            info!(student_id = %id, "student deleted");
            Ok(())
        } else {
            Err(DomainError::not_found(ResourceKind::Student, id))
        }
    }

    /// Looks up a single student.
    pub async fn get(&self, id: StudentId) -> DomainResult<Student> {
        self.load(id).await
    }

    /// Lists students matching the filter, most recently created first.
    pub async fn list(&self, filter: &StudentFilter) -> DomainResult<Vec<Student>> {
        Ok(self.students.list(filter).await?)
    }

    async fn load(&self, id: StudentId) -> DomainResult<Student> {
        self.students
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(ResourceKind::Student, id))
    }
}

fn email_taken() -> DomainError {
    DomainError::Validation(ValidationErrors::single("email", EMAIL_TAKEN))
}
