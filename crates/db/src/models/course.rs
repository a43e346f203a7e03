use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub duration_minutes: i64,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourse {
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub duration_minutes: Option<i64>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourse {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub duration_minutes: Option<i64>,
    pub is_archived: Option<bool>,
}

#[derive(Debug, FromRow)]
pub struct CourseRow {
    pub rowid: i64,
    #[sqlx(flatten)]
    pub course: Course,
}

const COURSE_COLUMNS: &str = "id, instructor_id, title, description, thumbnail, duration_minutes, is_archived, created_at, updated_at";

impl Course {
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Keyset page over non-archived courses in creation order.
    pub async fn find_page<'e, E>(
        executor: E,
        instructor_id: Option<Uuid>,
        after_rowid: Option<i64>,
        limit: i64,
    ) -> Result<Vec<CourseRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, CourseRow>(&format!(
            r#"SELECT rowid, {COURSE_COLUMNS}
               FROM courses
               WHERE is_archived = 0
                 AND ($1 IS NULL OR instructor_id = $1)
                 AND rowid > $2
               ORDER BY rowid ASC
               LIMIT $3"#
        ))
        .bind(instructor_id)
        .bind(after_rowid.unwrap_or(0))
        .bind(limit)
        .fetch_all(executor)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        id: Uuid,
        instructor_id: Uuid,
        data: &CreateCourse,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, Course>(&format!(
            r#"INSERT INTO courses (id, instructor_id, title, description, thumbnail, duration_minutes, is_archived, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $7)
               RETURNING {COURSE_COLUMNS}"#
        ))
        .bind(id)
        .bind(instructor_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.thumbnail)
        .bind(data.duration_minutes.unwrap_or(0))
        .bind(now)
        .fetch_one(executor)
        .await
    }

    /// Returns `None` when the course does not exist under `instructor_id`.
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        instructor_id: Uuid,
        data: &UpdateCourse,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Course>(&format!(
            r#"UPDATE courses
               SET title = COALESCE($3, title),
                   description = COALESCE($4, description),
                   thumbnail = COALESCE($5, thumbnail),
                   duration_minutes = COALESCE($6, duration_minutes),
                   is_archived = COALESCE($7, is_archived),
                   updated_at = $8
               WHERE id = $1 AND instructor_id = $2
               RETURNING {COURSE_COLUMNS}"#
        ))
        .bind(id)
        .bind(instructor_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.thumbnail)
        .bind(data.duration_minutes)
        .bind(data.is_archived)
        .bind(Utc::now())
        .fetch_optional(executor)
        .await
    }

    /// Memberships go with the course through `ON DELETE CASCADE`.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
