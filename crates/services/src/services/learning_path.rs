//! Store-level operations on learning paths and their course membership.

use std::collections::HashSet;

use db::{
    is_unique_violation,
    models::{
        course::Course,
        learning_path::{
            CreateLearningPath, LearningPath, LearningPathWithCourses, UpdateLearningPath,
        },
        learning_path_course::LearningPathCourse,
    },
};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{
    auth::{AccessDenied, Principal},
    membership::{self, OrderingError},
    pagination::{Page, PageLimits, PageRequest, PaginationError},
};

#[derive(Debug, Error)]
pub enum LearningPathError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error("{0}")]
    Conflict(String),
}

impl From<OrderingError> for LearningPathError {
    fn from(err: OrderingError) -> Self {
        LearningPathError::Validation(err.to_string())
    }
}

impl From<PaginationError> for LearningPathError {
    fn from(err: PaginationError) -> Self {
        LearningPathError::Validation(err.to_string())
    }
}

impl LearningPathError {
    pub(crate) fn path_not_found(id: Uuid) -> Self {
        LearningPathError::NotFound(format!("learning path {id} not found"))
    }
}

pub struct LearningPathService;

impl LearningPathService {
    /// Creates a path whose initial membership follows `data.course_ids`.
    pub async fn create(
        pool: &SqlitePool,
        principal: &Principal,
        instructor_id: Uuid,
        mut data: CreateLearningPath,
    ) -> Result<LearningPathWithCourses, LearningPathError> {
        principal.ensure_can_manage(instructor_id)?;
        data.title = validate_title(&data.title)?;
        validate_thumbnail(data.thumbnail.as_deref())?;
        validate_completion_time(data.estimated_completion_time)?;
        membership::ensure_distinct(&data.course_ids)?;

        let id = Uuid::new_v4();
        let mut tx = pool.begin().await?;
        // Insert before the course reads to take the write lock first.
        LearningPath::create(&mut *tx, id, instructor_id, &data).await?;
        ensure_courses_usable(&mut tx, &data.course_ids, &HashSet::new()).await?;
        LearningPathCourse::sync_members(&mut tx, id, &data.course_ids).await?;
        tx.commit().await?;

        info!(
            learning_path_id = %id,
            instructor_id = %instructor_id,
            courses = data.course_ids.len(),
            "Created learning path"
        );

        Self::get(pool, id).await
    }

    /// Updates metadata; a present `course_ids` replaces the membership wholesale.
    pub async fn update(
        pool: &SqlitePool,
        principal: &Principal,
        instructor_id: Uuid,
        id: Uuid,
        mut data: UpdateLearningPath,
    ) -> Result<LearningPathWithCourses, LearningPathError> {
        principal.ensure_can_manage(instructor_id)?;
        if let Some(title) = data.title.as_deref() {
            data.title = Some(validate_title(title)?);
        }
        validate_thumbnail(data.thumbnail.as_deref())?;
        validate_completion_time(data.estimated_completion_time)?;
        if let Some(course_ids) = data.course_ids.as_deref() {
            membership::ensure_distinct(course_ids)?;
        }

        let mut tx = pool.begin().await?;
        if !LearningPath::touch_for_instructor(&mut *tx, id, instructor_id).await? {
            return Err(LearningPathError::path_not_found(id));
        }
        LearningPath::update(&mut *tx, id, &data).await?;
        if let Some(course_ids) = data.course_ids.as_deref() {
            let existing: HashSet<Uuid> = LearningPathCourse::course_ids(&mut *tx, id)
                .await?
                .into_iter()
                .collect();
            ensure_courses_usable(&mut tx, course_ids, &existing).await?;
            LearningPathCourse::sync_members(&mut tx, id, course_ids).await?;
        }
        tx.commit().await?;

        info!(
            learning_path_id = %id,
            replaced_courses = data.course_ids.is_some(),
            "Updated learning path"
        );

        Self::get(pool, id).await
    }

    /// Refuses while the path still has courses.
    pub async fn delete(
        pool: &SqlitePool,
        principal: &Principal,
        instructor_id: Uuid,
        id: Uuid,
    ) -> Result<(), LearningPathError> {
        principal.ensure_can_manage(instructor_id)?;

        let mut tx = pool.begin().await?;
        if !LearningPath::touch_for_instructor(&mut *tx, id, instructor_id).await? {
            return Err(LearningPathError::path_not_found(id));
        }
        let members = LearningPathCourse::count(&mut *tx, id).await?;
        if members > 0 {
            return Err(LearningPathError::Conflict(format!(
                "learning path {id} still contains {members} course(s); remove them before deleting"
            )));
        }
        LearningPath::delete(&mut *tx, id).await?;
        tx.commit().await?;

        info!(learning_path_id = %id, "Deleted learning path");
        Ok(())
    }

    /// Path with members ordered by position.
    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<LearningPathWithCourses, LearningPathError> {
        let learning_path = LearningPath::find_by_id(pool, id)
            .await?
            .ok_or_else(|| LearningPathError::path_not_found(id))?;
        let courses = LearningPathCourse::find_by_learning_path_id(pool, id).await?;
        Ok(LearningPathWithCourses {
            learning_path,
            courses,
        })
    }

    /// Owner view, drafts included.
    pub async fn get_for_instructor(
        pool: &SqlitePool,
        principal: &Principal,
        instructor_id: Uuid,
        id: Uuid,
    ) -> Result<LearningPathWithCourses, LearningPathError> {
        principal.ensure_can_manage(instructor_id)?;
        let learning_path = LearningPath::find_by_id_for_instructor(pool, id, instructor_id)
            .await?
            .ok_or_else(|| LearningPathError::path_not_found(id))?;
        let courses = LearningPathCourse::find_by_learning_path_id(pool, id).await?;
        Ok(LearningPathWithCourses {
            learning_path,
            courses,
        })
    }

    pub async fn list_published(
        pool: &SqlitePool,
        limits: PageLimits,
        instructor_id: Option<Uuid>,
        page: &PageRequest,
    ) -> Result<Page<LearningPath>, LearningPathError> {
        Self::list(pool, limits, instructor_id, true, page).await
    }

    pub async fn list_for_instructor(
        pool: &SqlitePool,
        principal: &Principal,
        limits: PageLimits,
        instructor_id: Uuid,
        page: &PageRequest,
    ) -> Result<Page<LearningPath>, LearningPathError> {
        principal.ensure_can_manage(instructor_id)?;
        Self::list(pool, limits, Some(instructor_id), false, page).await
    }

    async fn list(
        pool: &SqlitePool,
        limits: PageLimits,
        instructor_id: Option<Uuid>,
        published_only: bool,
        page: &PageRequest,
    ) -> Result<Page<LearningPath>, LearningPathError> {
        let cursor = page.cursor(limits)?;
        let rows = LearningPath::find_page(
            pool,
            instructor_id,
            published_only,
            cursor.after_rowid,
            cursor.fetch_limit(),
        )
        .await?;
        Ok(cursor.into_page(
            rows.into_iter()
                .map(|row| (row.rowid, row.learning_path))
                .collect(),
        ))
    }

    /// Appends a course at the end of the path.
    pub async fn add_course(
        pool: &SqlitePool,
        principal: &Principal,
        instructor_id: Uuid,
        id: Uuid,
        course_id: Uuid,
    ) -> Result<LearningPathWithCourses, LearningPathError> {
        principal.ensure_can_manage(instructor_id)?;

        let mut tx = pool.begin().await?;
        if !LearningPath::touch_for_instructor(&mut *tx, id, instructor_id).await? {
            return Err(LearningPathError::path_not_found(id));
        }
        let existing: HashSet<Uuid> = LearningPathCourse::course_ids(&mut *tx, id)
            .await?
            .into_iter()
            .collect();
        if existing.contains(&course_id) {
            return Err(already_member(course_id));
        }
        ensure_courses_usable(&mut tx, &[course_id], &existing).await?;
        LearningPathCourse::create(&mut *tx, id, course_id, existing.len() as i64)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    already_member(course_id)
                } else {
                    LearningPathError::Database(e)
                }
            })?;
        tx.commit().await?;

        info!(learning_path_id = %id, course_id = %course_id, "Added course to learning path");
        Self::get(pool, id).await
    }

    /// Removes a course and closes the gap it leaves.
    pub async fn remove_course(
        pool: &SqlitePool,
        principal: &Principal,
        instructor_id: Uuid,
        id: Uuid,
        course_id: Uuid,
    ) -> Result<LearningPathWithCourses, LearningPathError> {
        principal.ensure_can_manage(instructor_id)?;

        let mut tx = pool.begin().await?;
        if !LearningPath::touch_for_instructor(&mut *tx, id, instructor_id).await? {
            return Err(LearningPathError::path_not_found(id));
        }
        if LearningPathCourse::delete(&mut *tx, id, course_id).await? == 0 {
            return Err(LearningPathError::NotFound(format!(
                "course {course_id} is not part of learning path {id}"
            )));
        }
        LearningPathCourse::renumber(&mut tx, id).await?;
        tx.commit().await?;

        info!(learning_path_id = %id, course_id = %course_id, "Removed course from learning path");
        Self::get(pool, id).await
    }
}

fn already_member(course_id: Uuid) -> LearningPathError {
    LearningPathError::Validation(format!(
        "course {course_id} is already part of this learning path"
    ))
}

fn validate_title(title: &str) -> Result<String, LearningPathError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(LearningPathError::Validation(
            "title must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_thumbnail(thumbnail: Option<&str>) -> Result<(), LearningPathError> {
    match thumbnail {
        Some(t) if t.trim().is_empty() => Err(LearningPathError::Validation(
            "thumbnail must not be blank".to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_completion_time(hours: Option<i32>) -> Result<(), LearningPathError> {
    match hours {
        Some(h) if h < 0 => Err(LearningPathError::Validation(
            "estimatedCompletionTime must not be negative".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Every id outside `already_members` must name an existing, non-archived course.
async fn ensure_courses_usable(
    conn: &mut SqliteConnection,
    course_ids: &[Uuid],
    already_members: &HashSet<Uuid>,
) -> Result<(), LearningPathError> {
    for course_id in course_ids.iter().filter(|id| !already_members.contains(id)) {
        match Course::find_by_id(&mut *conn, *course_id).await? {
            None => {
                return Err(LearningPathError::Validation(format!(
                    "course {course_id} does not exist"
                )));
            }
            Some(course) if course.is_archived => {
                return Err(LearningPathError::Validation(format!(
                    "course {course_id} is archived"
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use db::{
        DBService,
        models::course::{Course, CreateCourse},
    };
    use uuid::Uuid;

    use crate::services::auth::{Principal, Role};

    pub async fn course(db: &DBService, instructor_id: Uuid, title: &str, minutes: i64) -> Course {
        Course::create(
            &db.pool,
            Uuid::new_v4(),
            instructor_id,
            &CreateCourse {
                title: title.to_string(),
                description: None,
                thumbnail: Some(format!("{title}.png")),
                duration_minutes: Some(minutes),
            },
        )
        .await
        .unwrap()
    }

    pub fn instructor() -> Principal {
        Principal::new(Uuid::new_v4(), Role::Instructor)
    }
}
