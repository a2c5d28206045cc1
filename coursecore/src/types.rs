//! Core identifier and field types for the enrollment domain.
//!
//! All validated types use smart constructors so that invalid values cannot
//! be represented once constructed, following the "parse, don't validate"
//! principle. Identifiers are plain `i64` newtypes; they are assigned by the
//! store and carry no validation of their own (positivity is an entity
//! invariant checked by [`crate::enrollment::NewEnrollment::validate`]).

use chrono::{Datelike, Utc};
use nutype::nutype;
use rand::Rng;

/// Identifier of a course row.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    From,
    Into,
    Serialize,
    Deserialize
))]
pub struct CourseId(i64);

/// Identifier of a student row (shared with the users namespace).
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    From,
    Into,
    Serialize,
    Deserialize
))]
pub struct StudentId(i64);

/// Identifier of an instructor row (shared with the users namespace).
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    From,
    Into,
    Serialize,
    Deserialize
))]
pub struct InstructorId(i64);

/// Identifier of an enrollment row.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    From,
    Into,
    Serialize,
    Deserialize
))]
pub struct EnrollmentId(i64);

/// Course title: trimmed, at least 3 and at most 200 characters.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_min = 3, len_char_max = 200),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct CourseTitle(String);

/// Email address, unique across all users of the system.
///
/// Sanitized to lowercase so uniqueness checks are case-insensitive.
#[nutype(
    sanitize(trim, lowercase),
    validate(
        not_empty,
        len_char_max = 255,
        regex = r"^[^@\s]+@[^@\s]+\.[^@\s]+$"
    ),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct EmailAddress(String);

/// Display name of a student or instructor.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_min = 2, len_char_max = 100),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct PersonName(String);

/// Enrollment capacity of a course. Always greater than zero.
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct MaxStudents(u32);

/// Final grade of a completed enrollment, within `[0.0, 100.0]`.
#[nutype(
    validate(finite, greater_or_equal = 0.0, less_or_equal = 100.0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        PartialOrd,
        Display,
        Into,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct Grade(f64);

/// System-wide student number, e.g. `STD20260042`.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 20),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct StudentNumber(String);

impl StudentNumber {
    /// Generates a fresh student number: `STD` + current year + four random
    /// digits. Used when registration does not supply one.
    pub fn generate() -> Self {
        let year = Utc::now().year();
        let serial: u16 = rand::rng().random_range(1..=9999);
        Self::try_new(format!("STD{year}{serial:04}"))
            .expect("generated student number is always valid")
    }
}

/// Plain-text password as received at registration. At least 8 characters.
///
/// Intentionally derives neither `Debug`, `Display` nor `Serialize`; the raw
/// value only ever flows into [`crate::user::PasswordHash::hash`].
#[nutype(
    validate(len_char_min = 8, len_char_max = 128),
    derive(Clone, AsRef, Deref)
)]
pub struct RawPassword(String);

impl std::fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RawPassword(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_title_is_trimmed() {
        let title = CourseTitle::try_new("  Rust for Beginners  ").unwrap();
        assert_eq!(title.as_ref(), "Rust for Beginners");
    }

    #[test]
    fn course_title_rejects_short_values() {
        assert!(CourseTitle::try_new("ab").is_err());
        assert!(CourseTitle::try_new("   ").is_err());
    }

    #[test]
    fn email_is_lowercased() {
        let email = EmailAddress::try_new(" Jane.Doe@Example.COM ").unwrap();
        assert_eq!(email.as_ref(), "jane.doe@example.com");
    }

    #[test]
    fn email_rejects_malformed_values() {
        for bad in ["", "plainaddress", "no@tld", "two@@example.com", "a b@example.com"] {
            assert!(EmailAddress::try_new(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn max_students_must_be_positive() {
        assert!(MaxStudents::try_new(0).is_err());
        assert_eq!(MaxStudents::try_new(30).unwrap().into_inner(), 30);
    }

    #[test]
    fn grade_bounds() {
        assert!(Grade::try_new(-0.5).is_err());
        assert!(Grade::try_new(100.1).is_err());
        assert!(Grade::try_new(f64::NAN).is_err());
        assert_eq!(Grade::try_new(87.5).unwrap().into_inner(), 87.5);
    }

    #[test]
    fn generated_student_number_shape() {
        let number = StudentNumber::generate();
        assert!(number.starts_with("STD"));
        // STD + 4-digit year + 4-digit serial
        assert_eq!(number.len(), 11);
    }

    #[test]
    fn raw_password_minimum_length() {
        assert!(RawPassword::try_new("short".to_string()).is_err());
        assert!(RawPassword::try_new("long enough".to_string()).is_ok());
    }

    #[test]
    fn raw_password_debug_is_redacted() {
        let password = RawPassword::try_new("correct horse battery".to_string()).unwrap();
        assert_eq!(format!("{password:?}"), "RawPassword(***)");
    }
}
