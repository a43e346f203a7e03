use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};
use ts_rs::TS;
use uuid::Uuid;

use super::learning_path_course::LearningPathCourse;

/// An ordered grouping of courses owned by one instructor.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub estimated_completion_time: Option<i32>, // hours
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A learning path together with its members, ordered by position.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathWithCourses {
    #[serde(flatten)]
    #[ts(flatten)]
    pub learning_path: LearningPath,
    pub courses: Vec<LearningPathCourse>,
}

impl std::ops::Deref for LearningPathWithCourses {
    type Target = LearningPath;
    fn deref(&self) -> &Self::Target {
        &self.learning_path
    }
}

impl LearningPathWithCourses {
    pub fn course_ids(&self) -> Vec<Uuid> {
        self.courses.iter().map(|member| member.course_id).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateLearningPath {
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub estimated_completion_time: Option<i32>,
    pub is_published: Option<bool>,
    /// Initial membership; the sequence defines the initial order.
    #[serde(default)]
    pub course_ids: Vec<Uuid>,
}

/// Partial update. `None` (absent or `null`) keeps the stored value, so
/// optional columns cannot be cleared once set. `course_ids`, when present,
/// replaces the whole membership.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLearningPath {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub estimated_completion_time: Option<i32>,
    pub is_published: Option<bool>,
    pub course_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, FromRow)]
pub struct LearningPathRow {
    pub rowid: i64,
    #[sqlx(flatten)]
    pub learning_path: LearningPath,
}

const LEARNING_PATH_COLUMNS: &str = "id, instructor_id, title, description, thumbnail, estimated_completion_time, is_published, created_at, updated_at";

impl LearningPath {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, LearningPath>(&format!(
            "SELECT {LEARNING_PATH_COLUMNS} FROM learning_paths WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_id_for_instructor<'e, E>(
        executor: E,
        id: Uuid,
        instructor_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, LearningPath>(&format!(
            "SELECT {LEARNING_PATH_COLUMNS} FROM learning_paths WHERE id = $1 AND instructor_id = $2"
        ))
        .bind(id)
        .bind(instructor_id)
        .fetch_optional(executor)
        .await
    }

    /// Keyset page in creation order. `instructor_id` narrows to one owner,
    /// `published_only` hides drafts.
    pub async fn find_page<'e, E>(
        executor: E,
        instructor_id: Option<Uuid>,
        published_only: bool,
        after_rowid: Option<i64>,
        limit: i64,
    ) -> Result<Vec<LearningPathRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, LearningPathRow>(&format!(
            r#"SELECT rowid, {LEARNING_PATH_COLUMNS}
               FROM learning_paths
               WHERE ($1 IS NULL OR instructor_id = $1)
                 AND ($2 = 0 OR is_published = 1)
                 AND rowid > $3
               ORDER BY rowid ASC
               LIMIT $4"#
        ))
        .bind(instructor_id)
        .bind(published_only)
        .bind(after_rowid.unwrap_or(0))
        .bind(limit)
        .fetch_all(executor)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        instructor_id: Uuid,
        data: &CreateLearningPath,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, LearningPath>(&format!(
            r#"INSERT INTO learning_paths (id, instructor_id, title, description, thumbnail, estimated_completion_time, is_published, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
               RETURNING {LEARNING_PATH_COLUMNS}"#
        ))
        .bind(id)
        .bind(instructor_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.thumbnail)
        .bind(data.estimated_completion_time)
        .bind(data.is_published.unwrap_or(false))
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: &UpdateLearningPath,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, LearningPath>(&format!(
            r#"UPDATE learning_paths
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   thumbnail = COALESCE($4, thumbnail),
                   estimated_completion_time = COALESCE($5, estimated_completion_time),
                   is_published = COALESCE($6, is_published),
                   updated_at = $7
               WHERE id = $1
               RETURNING {LEARNING_PATH_COLUMNS}"#
        ))
        .bind(id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.thumbnail)
        .bind(data.estimated_completion_time)
        .bind(data.is_published)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    /// Bumps `updated_at` for a path owned by `instructor_id`. Run as the first
    /// statement of a mutating transaction it takes SQLite's write lock, so
    /// concurrent membership changes on the same database queue up behind it.
    /// Returns false when no such path exists for that instructor.
    pub async fn touch_for_instructor<'e, E>(
        executor: E,
        id: Uuid,
        instructor_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE learning_paths SET updated_at = $3 WHERE id = $1 AND instructor_id = $2",
        )
        .bind(id)
        .bind(instructor_id)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn touch<'e, E>(executor: E, id: Uuid) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE learning_paths SET updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM learning_paths WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
