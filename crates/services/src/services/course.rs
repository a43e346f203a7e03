use db::models::{
    course::{Course, CreateCourse, UpdateCourse},
    learning_path::LearningPath,
    learning_path_course::LearningPathCourse,
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{
    auth::{AccessDenied, Principal},
    pagination::{Page, PageLimits, PageRequest, PaginationError},
};

#[derive(Debug, Error)]
pub enum CourseError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
}

impl From<PaginationError> for CourseError {
    fn from(err: PaginationError) -> Self {
        CourseError::Validation(err.to_string())
    }
}

fn course_not_found(id: Uuid) -> CourseError {
    CourseError::NotFound(format!("course {id} not found"))
}

pub struct CourseService;

impl CourseService {
    pub async fn create(
        pool: &SqlitePool,
        principal: &Principal,
        instructor_id: Uuid,
        mut data: CreateCourse,
    ) -> Result<Course, CourseError> {
        principal.ensure_can_manage(instructor_id)?;
        data.title = validate_title(&data.title)?;
        validate_details(data.thumbnail.as_deref(), data.duration_minutes)?;

        let course = Course::create(pool, Uuid::new_v4(), instructor_id, &data).await?;
        info!(course_id = %course.id, instructor_id = %instructor_id, "Created course");
        Ok(course)
    }

    /// Archiving goes through here too; archived courses stay in their paths.
    pub async fn update(
        pool: &SqlitePool,
        principal: &Principal,
        instructor_id: Uuid,
        id: Uuid,
        mut data: UpdateCourse,
    ) -> Result<Course, CourseError> {
        principal.ensure_can_manage(instructor_id)?;
        if let Some(title) = data.title.as_deref() {
            data.title = Some(validate_title(title)?);
        }
        validate_details(data.thumbnail.as_deref(), data.duration_minutes)?;

        let course = Course::update(pool, id, instructor_id, &data)
            .await?
            .ok_or_else(|| course_not_found(id))?;
        info!(course_id = %id, archived = course.is_archived, "Updated course");
        Ok(course)
    }

    /// Deletes the course, drops its memberships and closes the gaps in every
    /// path that contained it, all in one transaction.
    pub async fn delete(
        pool: &SqlitePool,
        principal: &Principal,
        instructor_id: Uuid,
        id: Uuid,
    ) -> Result<(), CourseError> {
        principal.ensure_can_manage(instructor_id)?;

        let mut tx = pool.begin().await?;
        // No-op update: ownership check that also takes the write lock.
        Course::update(&mut *tx, id, instructor_id, &UpdateCourse::default())
            .await?
            .ok_or_else(|| course_not_found(id))?;

        let affected = LearningPathCourse::learning_path_ids_for_course(&mut *tx, id).await?;
        Course::delete(&mut *tx, id).await?;
        for learning_path_id in &affected {
            LearningPathCourse::renumber(&mut tx, *learning_path_id).await?;
            LearningPath::touch(&mut *tx, *learning_path_id).await?;
        }
        tx.commit().await?;

        info!(course_id = %id, learning_paths = affected.len(), "Deleted course");
        Ok(())
    }

    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Course, CourseError> {
        Course::find_by_id(pool, id)
            .await?
            .ok_or_else(|| course_not_found(id))
    }

    /// Non-archived courses, optionally narrowed to one instructor.
    pub async fn list(
        pool: &SqlitePool,
        limits: PageLimits,
        instructor_id: Option<Uuid>,
        page: &PageRequest,
    ) -> Result<Page<Course>, CourseError> {
        let cursor = page.cursor(limits)?;
        let rows =
            Course::find_page(pool, instructor_id, cursor.after_rowid, cursor.fetch_limit()).await?;
        Ok(cursor.into_page(rows.into_iter().map(|row| (row.rowid, row.course)).collect()))
    }
}

fn validate_title(title: &str) -> Result<String, CourseError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CourseError::Validation("title must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_details(thumbnail: Option<&str>, duration_minutes: Option<i64>) -> Result<(), CourseError> {
    if thumbnail.is_some_and(|t| t.trim().is_empty()) {
        return Err(CourseError::Validation("thumbnail must not be blank".to_string()));
    }
    if duration_minutes.is_some_and(|m| m < 0) {
        return Err(CourseError::Validation(
            "durationMinutes must not be negative".to_string(),
        ));
    }
    Ok(())
}
