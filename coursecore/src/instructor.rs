//! The instructor entity and its registration input.

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::ValidationErrors;
use crate::student::{parse_email, parse_name};
use crate::types::{EmailAddress, InstructorId, PersonName, RawPassword, RawPasswordError};
use crate::user::{PasswordHash, UserRole};

/// A registered instructor.
#[derive(Debug, Clone, PartialEq)]
pub struct Instructor {
    /// Store-assigned identifier (shared with the users namespace).
    pub id: InstructorId,
    /// Display name.
    pub name: PersonName,
    /// Email, unique across all users.
    pub email: EmailAddress,
    /// Free-text biography.
    pub bio: String,
    /// Bcrypt hash of the registration password.
    pub password_hash: PasswordHash,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

impl Serialize for Instructor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Instructor", 7)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("email", &self.email)?;
        state.serialize_field("bio", &self.bio)?;
        state.serialize_field("role", UserRole::Instructor.as_str())?;
        state.serialize_field("created_at", &self.created_at)?;
        state.serialize_field("updated_at", &self.updated_at)?;
        state.end()
    }
}

/// A validated instructor registration that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewInstructor {
    /// Display name.
    pub name: PersonName,
    /// Email, unique across all users.
    pub email: EmailAddress,
    /// Free-text biography.
    pub bio: String,
    /// Bcrypt hash of the registration password.
    pub password_hash: PasswordHash,
}

/// Raw instructor registration fields as they arrive from the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstructorInput {
    /// Display name.
    pub name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Plain-text password; hashed before it is ever stored.
    pub password: Option<String>,
    /// Free-text biography; defaults to empty.
    pub bio: Option<String>,
}

/// The validated registration fields, before password hashing.
#[derive(Debug, Clone)]
pub struct ValidInstructorInput {
    /// Display name.
    pub name: PersonName,
    /// Email address.
    pub email: EmailAddress,
    /// The raw password, to be hashed by the registration workflow.
    pub password: RawPassword,
    /// Free-text biography.
    pub bio: String,
}

impl InstructorInput {
    /// Validates the registration input, accumulating all field errors.
    pub fn parse(self) -> Result<ValidInstructorInput, ValidationErrors> {
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

        errors.into_result()?;

        Ok(ValidInstructorInput {
            name: name.expect("validated"),
            email: email.expect("validated"),
            password: password.expect("validated"),
            bio: self.bio.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_collects_field_errors() {
        let errors = InstructorInput {
            name: None,
            email: Some("broken".into()),
            password: Some("pw".into()),
            bio: None,
        }
        .parse()
        .unwrap_err();

        assert_eq!(errors.messages("name"), ["Name is required"]);
        assert_eq!(errors.messages("email"), ["Invalid email format"]);
        assert_eq!(
            errors.messages("password"),
            ["Password must be at least 8 characters"]
        );
    }

    #[test]
    fn serialization_exposes_role_but_never_the_hash() {
        let instructor = Instructor {
            id: InstructorId::new(3),
            name: PersonName::try_new("Grace Hopper").unwrap(),
            email: EmailAddress::try_new("grace@example.com").unwrap(),
            bio: "Compiler pioneer".into(),
            password_hash: PasswordHash::from_stored("$2b$12$stub".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(instructor).unwrap();
        assert_eq!(json["role"], "instructor");
        assert_eq!(json["bio"], "Compiler pioneer");
        assert!(json.get("password_hash").is_none());
    }
}
