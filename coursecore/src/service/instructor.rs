//! Instructor registry workflow.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::errors::{DomainError, DomainResult, ResourceKind, StoreError, ValidationErrors};
use crate::instructor::{Instructor, InstructorInput, NewInstructor};
use crate::store::InstructorStore;
use crate::types::InstructorId;
use crate::user::PasswordHash;

/// Orchestrates instructor management against the instructor store.
#[derive(Clone)]
pub struct InstructorService {
    instructors: Arc<dyn InstructorStore>,
}

impl InstructorService {
    /// Creates the workflow with an explicit store handle.
    pub fn new(instructors: Arc<dyn InstructorStore>) -> Self {
        Self { instructors }
    }

    /// Registers an instructor: validates the input, checks email
    /// uniqueness across all users and hashes the password.
    #[instrument(skip(self, input))]
    pub async fn register(&self, input: InstructorInput) -> DomainResult<Instructor> {
        let valid = input.parse().map_err(DomainError::Validation)?;

        if self.instructors.email_in_use(&valid.email, None).await? {
            return Err(email_taken());
        }

        let password_hash = PasswordHash::hash(&valid.password)?;
        let new_instructor = NewInstructor {
            name: valid.name,
            email: valid.email,
            bio: valid.bio,
            password_hash,
        };

        let instructor = match self.instructors.insert(new_instructor).await {
            Ok(instructor) => instructor,
            Err(StoreError::DuplicateEmail { .. }) => return Err(email_taken()),
            Err(err) => return Err(err.into()),
        };
        info!(instructor_id = %instructor.id, "instructor registered");
        Ok(instructor)
    }

    /// Looks up a single instructor.
    pub async fn get(&self, id: InstructorId) -> DomainResult<Instructor> {
        self.instructors
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(ResourceKind::Instructor, id))
    }

    /// Lists instructors, most recently created first.
    pub async fn list(&self) -> DomainResult<Vec<Instructor>> {
        Ok(self.instructors.list().await?)
    }
}

fn email_taken() -> DomainError {
    DomainError::Validation(ValidationErrors::single("email", "Email is already in use"))
}
