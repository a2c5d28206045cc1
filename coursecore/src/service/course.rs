//! Course catalog workflow: CRUD plus publication state changes.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::course::{Course, CourseInput};
use crate::errors::{DomainError, DomainResult, ResourceKind};
use crate::store::{CourseFilter, CourseStore};
use crate::types::CourseId;

/// Orchestrates course management against the course store.
#[derive(Clone)]
pub struct CourseService {
    courses: Arc<dyn CourseStore>,
}

impl CourseService {
    /// Creates the workflow with an explicit store handle.
    pub fn new(courses: Arc<dyn CourseStore>) -> Self {
        Self { courses }
    }

    /// Creates a course from validated input.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CourseInput) -> DomainResult<Course> {
        let new_course = input.parse().map_err(DomainError::Validation)?;
        let course = self.courses.insert(new_course).await?;
        info!(course_id = %course.id, "course created");
        Ok(course)
    }

    /// Applies a partial update to an existing course, re-validating every
    /// supplied field.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: CourseId, input: CourseInput) -> DomainResult<Course> {
        let mut course = self.load(id).await?;
        course.apply_update(input).map_err(DomainError::Validation)?;
        self.courses.update(&course).await?;
        Ok(course)
    }

    /// Deletes a course.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CourseId) -> DomainResult<()> {
        if self.courses.delete(id).await? {
            info!(course_id = %id, "course deleted");
            Ok(())
        } else {
            Err(DomainError::not_found(ResourceKind::Course, id))
        }
    }

    /// Looks up a single course.
    pub async fn get(&self, id: CourseId) -> DomainResult<Course> {
        self.load(id).await
    }

    /// Lists courses matching the filter, most recently created first.
    pub async fn list(&self, filter: &CourseFilter) -> DomainResult<Vec<Course>> {
        Ok(self.courses.list(filter).await?)
    }

    /// Publishes a course, opening it for enrollment.
    #[instrument(skip(self))]
    pub async fn publish(&self, id: CourseId) -> DomainResult<Course> {
        let mut course = self.load(id).await?;
        course.publish();
        self.courses.update(&course).await?;
        info!(course_id = %course.id, "course published");
        Ok(course)
    }

    /// Returns a course to draft, closing it for enrollment.
    #[instrument(skip(self))]
    pub async fn unpublish(&self, id: CourseId) -> DomainResult<Course> {
        let mut course = self.load(id).await?;
        course.unpublish();
        self.courses.update(&course).await?;
        info!(course_id = %course.id, "course unpublished");
        Ok(course)
    }

    /// Retires a course permanently.
    #[instrument(skip(self))]
    pub async fn archive(&self, id: CourseId) -> DomainResult<Course> {
        let mut course = self.load(id).await?;
        course.archive();
        self.courses.update(&course).await?;
        info!(course_id = %course.id, "course archived");
        Ok(course)
    }

    async fn load(&self, id: CourseId) -> DomainResult<Course> {
        self.courses
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(ResourceKind::Course, id))
    }
}
