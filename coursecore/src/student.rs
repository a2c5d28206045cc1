//! The student entity and its registration/profile-update inputs.

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::ValidationErrors;
use crate::types::{
    EmailAddress, EmailAddressError, PersonName, PersonNameError, RawPassword, RawPasswordError,
    StudentId, StudentNumber, StudentNumberError,
};
use crate::user::{PasswordHash, UserRole};

/// A registered student.
#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    /// Store-assigned identifier (shared with the users namespace).
    pub id: StudentId,
    /// System-wide student number.
    pub student_number: StudentNumber,
    /// Display name.
    pub name: PersonName,
    /// Email, unique across all users.
    pub email: EmailAddress,
    /// Bcrypt hash of the registration password.
    pub password_hash: PasswordHash,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

impl Student {
    /// Applies a profile update (name and/or email), re-validating supplied
    /// fields. The password hash is never touched by profile edits.
    pub fn apply_update(&mut self, input: StudentUpdate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let mut name = None;
        if let Some(raw) = input.name {
            match parse_name(&raw) {
                Ok(value) => name = Some(value),
                Err((field, message)) => errors.add(field, message),
            }
        }
        let mut email = None;
        if let Some(raw) = input.email {
            match parse_email(&raw) {
                Ok(value) => email = Some(value),
                Err((field, message)) => errors.add(field, message),
            }
        }

        errors.into_result()?;

        if let Some(value) = name {
            self.name = value;
        }
        if let Some(value) = email {
            self.email = value;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

// Hand-written so the password hash is structurally impossible to leak onto
// the wire; the role tag is part of the serialized shape.
impl Serialize for Student {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Student", 7)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("student_number", &self.student_number)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("email", &self.email)?;
        state.serialize_field("role", UserRole::Student.as_str())?;
        state.serialize_field("created_at", &self.created_at)?;
        state.serialize_field("updated_at", &self.updated_at)?;
        state.end()
    }
}

/// A validated registration that has not been persisted yet. The store
/// assigns the identifier and timestamps on insert.
#[derive(Debug, Clone)]
pub struct NewStudent {
    /// System-wide student number (generated when not supplied).
    pub student_number: StudentNumber,
    /// Display name.
    pub name: PersonName,
    /// Email, unique across all users.
    pub email: EmailAddress,
    /// Bcrypt hash of the registration password.
    pub password_hash: PasswordHash,
}

/// Raw registration fields as they arrive from the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentInput {
    /// Display name.
    pub name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Plain-text password; hashed before it is ever stored.
    pub password: Option<String>,
    /// Student number; generated when absent.
    pub student_number: Option<String>,
}

/// The validated registration fields, before hashing and number generation.
#[derive(Debug, Clone)]
pub struct ValidStudentInput {
    /// Display name.
    pub name: PersonName,
    /// Email address.
    pub email: EmailAddress,
    /// The raw password, to be hashed by the registration workflow.
    pub password: RawPassword,
    /// Student number when explicitly supplied.
    pub student_number: Option<StudentNumber>,
}

impl StudentInput {
    /// Validates the registration input, accumulating all field errors.
    pub fn parse(self) -> Result<ValidStudentInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = match self.name.as_deref() {
            None => {
                errors.add("name", "Name is required");
                None
            }
            Some(raw) => match parse_name(raw) {
                Ok(value) => Some(value),
                Err((field, message)) => {
                    errors.add(field, message);
                    None
                }
            },
        };

        let email = match self.email.as_deref() {
            None => {
                errors.add("email", "Email is required");
                None
            }
            Some(raw) => match parse_email(raw) {
                Ok(value) => Some(value),
                Err((field, message)) => {
                    errors.add(field, message);
                    None
                }
            },
        };

        let password = match self.password {
            None => {
                errors.add("password", "Password is required");
                None
            }
            Some(raw) => match RawPassword::try_new(raw) {
                Ok(value) => Some(value),
                Err(RawPasswordError::LenCharMinViolated) => {
                    errors.add("password", "Password must be at least 8 characters");
                    None
                }
                Err(RawPasswordError::LenCharMaxViolated) => {
                    errors.add("password", "Password must be at most 128 characters");
                    None
                }
            },
        };

        let student_number = match self.student_number {
            None => None,
            Some(raw) => match StudentNumber::try_new(raw) {
                Ok(value) => Some(value),
                Err(StudentNumberError::NotEmptyViolated) => {
                    errors.add("student_number", "Student number must not be empty");
                    None
                }
                Err(StudentNumberError::LenCharMaxViolated) => {
                    errors.add("student_number", "Student number must be at most 20 characters");
                    None
                }
            },
        };

        errors.into_result()?;

        Ok(ValidStudentInput {
            name: name.expect("validated"),
            email: email.expect("validated"),
            password: password.expect("validated"),
            student_number,
        })
    }
}

/// Raw profile-update fields. Only name and email are editable; absent
/// fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New email address (uniqueness is re-checked by the workflow).
    pub email: Option<String>,
}

pub(crate) fn parse_name(raw: &str) -> Result<PersonName, (&'static str, &'static str)> {
    PersonName::try_new(raw).map_err(|err| match err {
        PersonNameError::NotEmptyViolated => ("name", "Name is required"),
        PersonNameError::LenCharMinViolated => ("name", "Name must be at least 2 characters"),
        PersonNameError::LenCharMaxViolated => ("name", "Name must be at most 100 characters"),
    })
}

pub(crate) fn parse_email(raw: &str) -> Result<EmailAddress, (&'static str, &'static str)> {
    EmailAddress::try_new(raw).map_err(|err| match err {
        EmailAddressError::NotEmptyViolated => ("email", "Email is required"),
        EmailAddressError::RegexViolated => ("email", "Invalid email format"),
        EmailAddressError::LenCharMaxViolated => {
            ("email", "Email must be at most 255 characters")
        }
    })
}
