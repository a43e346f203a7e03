use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection};
use ts_rs::TS;
use uuid::Uuid;

/// Membership of a course in a learning path. Within one path the positions
/// are always `0..N-1`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathCourse {
    pub id: Uuid,
    pub learning_path_id: Uuid,
    pub course_id: Uuid,
    #[serde(rename = "order")]
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// Member joined with whatever is left of its course. The course columns are
/// NULL when the course row is gone.
#[derive(Debug, Clone, FromRow)]
pub struct LearningPathCourseSummary {
    pub course_id: Uuid,
    pub position: i64,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub duration_minutes: Option<i64>,
    pub is_archived: Option<bool>,
}

impl LearningPathCourse {
    pub async fn find_by_learning_path_id<'e, E>(
        executor: E,
        learning_path_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, LearningPathCourse>(
            r#"SELECT id, learning_path_id, course_id, position, created_at
               FROM learning_path_courses
               WHERE learning_path_id = $1
               ORDER BY position ASC"#,
        )
        .bind(learning_path_id)
        .fetch_all(executor)
        .await
    }

    /// Course ids of a path in position order.
    pub async fn course_ids<'e, E>(
        executor: E,
        learning_path_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"SELECT course_id
               FROM learning_path_courses
               WHERE learning_path_id = $1
               ORDER BY position ASC"#,
        )
        .bind(learning_path_id)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn count<'e, E>(executor: E, learning_path_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM learning_path_courses WHERE learning_path_id = $1",
        )
        .bind(learning_path_id)
        .fetch_one(executor)
        .await
    }

    pub async fn learning_path_ids_for_course<'e, E>(
        executor: E,
        course_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT DISTINCT learning_path_id FROM learning_path_courses WHERE course_id = $1",
        )
        .bind(course_id)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn create<'e, E>(
        executor: E,
        learning_path_id: Uuid,
        course_id: Uuid,
        position: i64,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, LearningPathCourse>(
            r#"INSERT INTO learning_path_courses (id, learning_path_id, course_id, position, created_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, learning_path_id, course_id, position, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(learning_path_id)
        .bind(course_id)
        .bind(position)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn delete<'e, E>(
        executor: E,
        learning_path_id: Uuid,
        course_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "DELETE FROM learning_path_courses WHERE learning_path_id = $1 AND course_id = $2",
        )
        .bind(learning_path_id)
        .bind(course_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Moves every position of a path to `-position - 1`, freeing `0..N-1`
    /// so a following assignment pass never trips
    /// `UNIQUE(learning_path_id, position)`.
    async fn park_positions<'e, E>(executor: E, learning_path_id: Uuid) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE learning_path_courses SET position = -position - 1 WHERE learning_path_id = $1",
        )
        .bind(learning_path_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    async fn set_position<'e, E>(
        executor: E,
        learning_path_id: Uuid,
        course_id: Uuid,
        position: i64,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"UPDATE learning_path_courses
               SET position = $3
               WHERE learning_path_id = $1 AND course_id = $2"#,
        )
        .bind(learning_path_id)
        .bind(course_id)
        .bind(position)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Writes `position = i` for `ordered_course_ids[i]`. Every id must already
    /// be a member and the slice must cover all members; callers validate that
    /// and run this inside a transaction.
    pub async fn apply_order(
        conn: &mut SqliteConnection,
        learning_path_id: Uuid,
        ordered_course_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        Self::park_positions(&mut *conn, learning_path_id).await?;

        for (position, course_id) in ordered_course_ids.iter().enumerate() {
            let updated =
                Self::set_position(&mut *conn, learning_path_id, *course_id, position as i64)
                    .await?;
            if updated != 1 {
                return Err(sqlx::Error::RowNotFound);
            }
        }

        Ok(())
    }

    /// Closes gaps left by removed members, keeping relative order.
    pub async fn renumber(
        conn: &mut SqliteConnection,
        learning_path_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        let ordered = Self::course_ids(&mut *conn, learning_path_id).await?;
        Self::apply_order(conn, learning_path_id, &ordered).await
    }

    /// Makes the membership of a path exactly `ordered_course_ids`, in that
    /// order. Rows for courses that stay keep their id; dropped courses lose
    /// their row; new courses get a fresh row. Ids must be distinct and must
    /// reference existing courses.
    pub async fn sync_members(
        conn: &mut SqliteConnection,
        learning_path_id: Uuid,
        ordered_course_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        let current: HashSet<Uuid> = Self::course_ids(&mut *conn, learning_path_id)
            .await?
            .into_iter()
            .collect();
        let wanted: HashSet<Uuid> = ordered_course_ids.iter().copied().collect();

        for course_id in current.difference(&wanted) {
            Self::delete(&mut *conn, learning_path_id, *course_id).await?;
        }

        Self::park_positions(&mut *conn, learning_path_id).await?;

        for (position, course_id) in ordered_course_ids.iter().enumerate() {
            if current.contains(course_id) {
                Self::set_position(&mut *conn, learning_path_id, *course_id, position as i64)
                    .await?;
            } else {
                Self::create(&mut *conn, learning_path_id, *course_id, position as i64).await?;
            }
        }

        Ok(())
    }

    pub async fn find_summaries<'e, E>(
        executor: E,
        learning_path_id: Uuid,
    ) -> Result<Vec<LearningPathCourseSummary>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, LearningPathCourseSummary>(
            r#"SELECT
                 lpc.course_id,
                 lpc.position,
                 c.title,
                 c.thumbnail,
                 c.duration_minutes,
                 c.is_archived
               FROM learning_path_courses lpc
               LEFT JOIN courses c ON c.id = lpc.course_id
               WHERE lpc.learning_path_id = $1
               ORDER BY lpc.position ASC"#,
        )
        .bind(learning_path_id)
        .fetch_all(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService, is_unique_violation,
        models::{
            course::{Course, CreateCourse},
            learning_path::{CreateLearningPath, LearningPath},
        },
    };

    async fn seed(db: &DBService, courses: usize) -> (Uuid, Vec<Uuid>) {
        let instructor = Uuid::new_v4();
        let path = LearningPath::create(
            &db.pool,
            Uuid::new_v4(),
            instructor,
            &CreateLearningPath {
                title: "LP1".to_string(),
                description: None,
                thumbnail: None,
                estimated_completion_time: None,
                is_published: None,
                course_ids: vec![],
            },
        )
        .await
        .unwrap();

        let mut ids = Vec::new();
        for i in 0..courses {
            let course = Course::create(
                &db.pool,
                Uuid::new_v4(),
                instructor,
                &CreateCourse {
                    title: format!("course {i}"),
                    description: None,
                    thumbnail: None,
                    duration_minutes: Some(30),
                },
            )
            .await
            .unwrap();
            LearningPathCourse::create(&db.pool, path.id, course.id, i as i64)
                .await
                .unwrap();
            ids.push(course.id);
        }
        (path.id, ids)
    }

    #[tokio::test]
    async fn apply_order_rewrites_positions() {
        let db = DBService::new_in_memory().await.unwrap();
        let (path_id, ids) = seed(&db, 3).await;
        let wanted = vec![ids[2], ids[0], ids[1]];

        let mut tx = db.pool.begin().await.unwrap();
        LearningPathCourse::apply_order(&mut tx, path_id, &wanted)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let members = LearningPathCourse::find_by_learning_path_id(&db.pool, path_id)
            .await
            .unwrap();
        let got: Vec<(Uuid, i64)> = members.iter().map(|m| (m.course_id, m.position)).collect();
        assert_eq!(got, vec![(ids[2], 0), (ids[0], 1), (ids[1], 2)]);
    }

    #[tokio::test]
    async fn duplicate_membership_is_a_unique_violation() {
        let db = DBService::new_in_memory().await.unwrap();
        let (path_id, ids) = seed(&db, 1).await;

        let err = LearningPathCourse::create(&db.pool, path_id, ids[0], 1)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn renumber_closes_gaps() {
        let db = DBService::new_in_memory().await.unwrap();
        let (path_id, ids) = seed(&db, 4).await;

        LearningPathCourse::delete(&db.pool, path_id, ids[1])
            .await
            .unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        LearningPathCourse::renumber(&mut conn, path_id).await.unwrap();
        drop(conn);

        let members = LearningPathCourse::find_by_learning_path_id(&db.pool, path_id)
            .await
            .unwrap();
        let got: Vec<(Uuid, i64)> = members.iter().map(|m| (m.course_id, m.position)).collect();
        assert_eq!(got, vec![(ids[0], 0), (ids[2], 1), (ids[3], 2)]);
    }

    #[tokio::test]
    async fn deleting_a_course_cascades_its_memberships() {
        let db = DBService::new_in_memory().await.unwrap();
        let (path_id, ids) = seed(&db, 2).await;

        Course::delete(&db.pool, ids[0]).await.unwrap();

        let remaining = LearningPathCourse::course_ids(&db.pool, path_id)
            .await
            .unwrap();
        assert_eq!(remaining, vec![ids[1]]);
    }

    #[tokio::test]
    async fn sync_members_keeps_row_identity_for_retained_courses() {
        let db = DBService::new_in_memory().await.unwrap();
        let (path_id, ids) = seed(&db, 3).await;
        let before = LearningPathCourse::find_by_learning_path_id(&db.pool, path_id)
            .await
            .unwrap();
        let retained_row = before.iter().find(|m| m.course_id == ids[2]).unwrap().id;

        let newcomer = Course::create(
            &db.pool,
            Uuid::new_v4(),
            Uuid::new_v4(),
            &CreateCourse {
                title: "newcomer".to_string(),
                description: None,
                thumbnail: None,
                duration_minutes: None,
            },
        )
        .await
        .unwrap();

        let mut tx = db.pool.begin().await.unwrap();
        LearningPathCourse::sync_members(&mut tx, path_id, &[ids[2], newcomer.id, ids[0]])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let after = LearningPathCourse::find_by_learning_path_id(&db.pool, path_id)
            .await
            .unwrap();
        let got: Vec<(Uuid, i64)> = after.iter().map(|m| (m.course_id, m.position)).collect();
        assert_eq!(got, vec![(ids[2], 0), (newcomer.id, 1), (ids[0], 2)]);
        assert_eq!(after[0].id, retained_row);
    }
}
