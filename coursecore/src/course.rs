//! The course entity: capacity, publication state, validated construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationErrors;
use crate::types::{CourseId, CourseTitle, CourseTitleError, InstructorId, MaxStudents};

/// Publication state of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    /// Not yet visible for enrollment.
    Draft,
    /// Open for enrollment (subject to capacity).
    Published,
    /// Retired; never enrollable again.
    Archived,
}

impl CourseStatus {
    /// Canonical lowercase name, as stored and as accepted on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    /// Parses the canonical lowercase name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Course {
    /// Store-assigned identifier.
    pub id: CourseId,
    /// Course title.
    pub title: CourseTitle,
    /// Free-text description.
    pub description: String,
    /// Maximum number of active enrollments.
    pub max_students: MaxStudents,
    /// Publication state.
    pub status: CourseStatus,
    /// The instructor teaching the course.
    pub instructor_id: InstructorId,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// True iff the course is currently published.
    pub fn is_published(&self) -> bool {
        self.status == CourseStatus::Published
    }

    /// Whether one more student may enroll, given the current number of
    /// active enrollments. Pure: published and below capacity.
    pub fn can_enroll(&self, current_enrolled: u32) -> bool {
        self.is_published() && current_enrolled < self.max_students.into_inner()
    }

    /// Marks the course published. In-memory only; persisting the change is
    /// a separate, explicit store call.
    pub fn publish(&mut self) {
        self.status = CourseStatus::Published;
        self.touch();
    }

    /// Returns the course to draft.
    pub fn unpublish(&mut self) {
        self.status = CourseStatus::Draft;
        self.touch();
    }

    /// Retires the course. Archived courses are never enrollable.
    pub fn archive(&mut self) {
        self.status = CourseStatus::Archived;
        self.touch();
    }

    /// Applies a partial update, re-validating every supplied field.
    /// Fields absent from the input keep their current value.
    pub fn apply_update(&mut self, input: CourseInput) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let mut title = None;
        if let Some(raw) = input.title {
            match parse_title(&raw) {
                Ok(value) => title = Some(value),
                Err((field, message)) => errors.add(field, message),
            }
        }
        let mut description = None;
        if let Some(raw) = input.description.as_deref() {
            match parse_description(raw) {
                Ok(value) => description = Some(value),
                Err((field, message)) => errors.add(field, message),
            }
        }
        let mut max_students = None;
        if let Some(raw) = input.max_students {
            match parse_max_students(raw) {
                Ok(value) => max_students = Some(value),
                Err((field, message)) => errors.add(field, message),
            }
        }
        let mut status = None;
        if let Some(raw) = input.status {
            match parse_status(&raw) {
                Ok(value) => status = Some(value),
                Err((field, message)) => errors.add(field, message),
            }
        }
        let mut instructor_id = None;
        if let Some(raw) = input.instructor_id {
            match parse_instructor(Some(raw)) {
                Ok(value) => instructor_id = Some(value),
                Err((field, message)) => errors.add(field, message),
            }
        }

        errors.into_result()?;

        if let Some(value) = title {
            self.title = value;
        }
        if let Some(value) = description {
            self.description = value;
        }
        if let Some(value) = max_students {
            self.max_students = value;
        }
        if let Some(value) = status {
            self.status = value;
        }
        if let Some(value) = instructor_id {
            self.instructor_id = value;
        }
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A validated course that has not been persisted yet. Constructed through
/// [`CourseInput::parse`] or [`NewCourse::with_preset`]; the store assigns
/// the identifier and timestamps on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    /// Course title.
    pub title: CourseTitle,
    /// Free-text description.
    pub description: String,
    /// Maximum number of active enrollments.
    pub max_students: MaxStudents,
    /// Publication state; new courses normally start as draft.
    pub status: CourseStatus,
    /// The instructor teaching the course.
    pub instructor_id: InstructorId,
}

impl NewCourse {
    /// Builds a draft course from a preset's default capacity.
    pub fn with_preset(
        preset: CoursePreset,
        title: CourseTitle,
        description: String,
        instructor_id: InstructorId,
    ) -> Self {
        Self {
            title,
            description,
            max_students: preset.max_students(),
            status: CourseStatus::Draft,
            instructor_id,
        }
    }
}

/// Default capacity presets for common course shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoursePreset {
    /// Standard lecture course, 30 seats.
    Basic,
    /// Small-group premium course, 10 seats.
    Premium,
    /// Hands-on workshop, 20 seats.
    Workshop,
}

impl CoursePreset {
    /// The preset's default capacity.
    pub fn max_students(self) -> MaxStudents {
        let seats = match self {
            Self::Basic => 30,
            Self::Premium => 10,
            Self::Workshop => 20,
        };
        MaxStudents::try_new(seats).expect("preset capacities are positive")
    }
}

/// Raw course fields as they arrive from the wire. Parsing accumulates
/// field-keyed errors instead of failing on the first problem.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseInput {
    /// Course title.
    pub title: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Capacity; defaults to 30 when absent at creation.
    pub max_students: Option<i64>,
    /// Status name; defaults to `draft` when absent at creation.
    pub status: Option<String>,
    /// The instructor teaching the course.
    pub instructor_id: Option<i64>,
}

/// Capacity used when a creation request does not specify one.
const DEFAULT_MAX_STUDENTS: u32 = 30;

impl CourseInput {
    /// Validates the input for course creation, accumulating all field
    /// errors. Never panics on ordinary invalid input.
    pub fn parse(self) -> Result<NewCourse, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = match self.title.as_deref() {
            None => {
                errors.add("title", "Title is required");
                None
            }
            Some(raw) => match parse_title(raw) {
                Ok(value) => Some(value),
                Err((field, message)) => {
                    errors.add(field, message);
                    None
                }
            },
        };

        let description = match self.description.as_deref() {
            None => {
                errors.add("description", "Description is required");
                None
            }
            Some(raw) => match parse_description(raw) {
                Ok(value) => Some(value),
                Err((field, message)) => {
                    errors.add(field, message);
                    None
                }
            },
        };

        let max_students = match self.max_students {
            None => MaxStudents::try_new(DEFAULT_MAX_STUDENTS).ok(),
            Some(raw) => match parse_max_students(raw) {
                Ok(value) => Some(value),
                Err((field, message)) => {
                    errors.add(field, message);
                    None
                }
            },
        };

        let status = match self.status.as_deref() {
            None => Some(CourseStatus::Draft),
            Some(raw) => match parse_status(raw) {
                Ok(value) => Some(value),
                Err((field, message)) => {
                    errors.add(field, message);
                    None
                }
            },
        };

        let instructor_id = match parse_instructor(self.instructor_id) {
            Ok(value) => Some(value),
            Err((field, message)) => {
                errors.add(field, message);
                None
            }
        };

        errors.into_result()?;

        Ok(NewCourse {
            // The unwraps cannot fail: every None pushed an error above.
            title: title.expect("validated"),
            description: description.expect("validated"),
            max_students: max_students.expect("validated"),
            status: status.expect("validated"),
            instructor_id: instructor_id.expect("validated"),
        })
    }
}

fn parse_title(raw: &str) -> Result<CourseTitle, (&'static str, &'static str)> {
    CourseTitle::try_new(raw).map_err(|err| match err {
        CourseTitleError::NotEmptyViolated => ("title", "Title is required"),
        CourseTitleError::LenCharMinViolated => {
            ("title", "Title must be at least 3 characters")
        }
        CourseTitleError::LenCharMaxViolated => {
            ("title", "Title must be at most 200 characters")
        }
    })
}

fn parse_max_students(raw: i64) -> Result<MaxStudents, (&'static str, &'static str)> {
    u32::try_from(raw)
        .ok()
        .and_then(|value| MaxStudents::try_new(value).ok())
        .ok_or(("max_students", "Max students must be greater than 0"))
}

fn parse_description(raw: &str) -> Result<String, (&'static str, &'static str)> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(("description", "Description is required"))
    } else {
        Ok(trimmed.to_string())
    }
}

fn parse_status(raw: &str) -> Result<CourseStatus, (&'static str, &'static str)> {
    CourseStatus::parse(raw)
        .ok_or(("status", "Status must be draft, published, or archived"))
}

fn parse_instructor(raw: Option<i64>) -> Result<InstructorId, (&'static str, &'static str)> {
    match raw {
        Some(id) if id > 0 => Ok(InstructorId::new(id)),
        _ => Err(("instructor_id", "Instructor is required")),
    }
}
