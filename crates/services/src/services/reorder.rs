//! Wholesale reordering of the courses inside a learning path.

use db::models::{learning_path::LearningPath, learning_path_course::LearningPathCourse};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    auth::Principal,
    learning_path::LearningPathError,
    membership,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CoursePosition {
    pub course_id: Uuid,
    pub order: i64,
}

/// Body of the courses-order endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ReorderCourses {
    pub courses: Vec<CoursePosition>,
}

impl ReorderCourses {
    /// Course ids sorted by their `order` value.
    pub fn ordered_course_ids(&self) -> Result<Vec<Uuid>, LearningPathError> {
        let entries: Vec<(Uuid, i64)> = self
            .courses
            .iter()
            .map(|entry| (entry.course_id, entry.order))
            .collect();
        Ok(membership::sequence_from_positions(&entries)?)
    }
}

pub struct ReorderService;

impl ReorderService {
    /// Rewrites positions so that `ordered_course_ids[i]` sits at `i`.
    ///
    /// The ids must be exactly the current members of the path. Validation and
    /// the writes share one transaction, so a rejected or failed call leaves
    /// the stored order as it was.
    pub async fn reorder(
        pool: &SqlitePool,
        principal: &Principal,
        instructor_id: Uuid,
        learning_path_id: Uuid,
        ordered_course_ids: &[Uuid],
    ) -> Result<Vec<LearningPathCourse>, LearningPathError> {
        principal.ensure_can_manage(instructor_id)?;

        let mut tx = pool.begin().await?;
        if !LearningPath::touch_for_instructor(&mut *tx, learning_path_id, instructor_id).await? {
            return Err(LearningPathError::path_not_found(learning_path_id));
        }

        let current = LearningPathCourse::course_ids(&mut *tx, learning_path_id).await?;
        membership::ensure_permutation(&current, ordered_course_ids)?;

        if current.as_slice() == ordered_course_ids {
            debug!(learning_path_id = %learning_path_id, "Order unchanged");
        } else {
            LearningPathCourse::apply_order(&mut tx, learning_path_id, ordered_course_ids).await?;
        }

        let members = LearningPathCourse::find_by_learning_path_id(&mut *tx, learning_path_id).await?;
        tx.commit().await?;

        info!(
            learning_path_id = %learning_path_id,
            courses = members.len(),
            "Reordered learning path courses"
        );
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use db::{DBService, models::learning_path::CreateLearningPath};

    use super::*;
    use crate::services::{
        auth::Role,
        learning_path::{
            LearningPathService,
            test_support::{course, instructor},
        },
    };

    struct Fixture {
        db: DBService,
        owner: Principal,
        path_id: Uuid,
        courses: Vec<Uuid>,
    }

    async fn fixture(n: usize) -> Fixture {
        let db = DBService::new_in_memory().await.unwrap();
        let owner = instructor();
        let mut courses = Vec::new();
        for i in 0..n {
            courses.push(course(&db, owner.user_id, &format!("course-{i}"), 30).await.id);
        }
        let path = LearningPathService::create(
            &db.pool,
            &owner,
            owner.user_id,
            CreateLearningPath {
                title: "LP1".to_string(),
                description: None,
                thumbnail: None,
                estimated_completion_time: None,
                is_published: Some(true),
                course_ids: courses.clone(),
            },
        )
        .await
        .unwrap();
        Fixture {
            db,
            owner,
            path_id: path.id,
            courses,
        }
    }

    async fn stored_order(f: &Fixture) -> Vec<(Uuid, i64)> {
        LearningPathService::get(&f.db.pool, f.path_id)
            .await
            .unwrap()
            .courses
            .iter()
            .map(|m| (m.course_id, m.position))
            .collect()
    }

    async fn reorder(f: &Fixture, ids: &[Uuid]) -> Result<Vec<LearningPathCourse>, LearningPathError> {
        ReorderService::reorder(&f.db.pool, &f.owner, f.owner.user_id, f.path_id, ids).await
    }

    #[tokio::test]
    async fn reorder_then_rejected_reorder_leaves_previous_order() {
        let f = fixture(3).await;
        let (a, b, c) = (f.courses[0], f.courses[1], f.courses[2]);

        reorder(&f, &[c, a, b]).await.unwrap();
        assert_eq!(stored_order(&f).await, vec![(c, 0), (a, 1), (b, 2)]);

        let missing_c = reorder(&f, &[a, b]).await;
        assert!(matches!(missing_c, Err(LearningPathError::Validation(_))));
        assert_eq!(stored_order(&f).await, vec![(c, 0), (a, 1), (b, 2)]);
    }

    #[tokio::test]
    async fn every_permutation_is_applied_exactly() {
        let f = fixture(3).await;
        let c = &f.courses;
        let perms = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for perm in perms {
            let wanted: Vec<Uuid> = perm.iter().map(|i| c[*i]).collect();
            let members = reorder(&f, &wanted).await.unwrap();
            let got: Vec<Uuid> = members.iter().map(|m| m.course_id).collect();
            assert_eq!(got, wanted);
            let positions: Vec<i64> = members.iter().map(|m| m.position).collect();
            assert_eq!(positions, vec![0, 1, 2]);
        }
    }

    #[tokio::test]
    async fn rejects_duplicates_and_strangers_without_side_effects() {
        let f = fixture(3).await;
        let before = stored_order(&f).await;
        let c = &f.courses;

        for bad in [
            vec![c[0], c[0], c[1]],
            vec![c[0], c[1], c[2], Uuid::new_v4()],
            vec![c[0], c[1], Uuid::new_v4()],
            vec![],
        ] {
            let result = reorder(&f, &bad).await;
            assert!(matches!(result, Err(LearningPathError::Validation(_))), "{bad:?}");
            assert_eq!(stored_order(&f).await, before);
        }
    }

    #[tokio::test]
    async fn reorder_is_idempotent_and_keeps_member_ids() {
        let f = fixture(3).await;
        let ids_before: Vec<Uuid> = LearningPathService::get(&f.db.pool, f.path_id)
            .await
            .unwrap()
            .courses
            .iter()
            .map(|m| m.id)
            .collect();
        let wanted = vec![f.courses[2], f.courses[1], f.courses[0]];

        let first = reorder(&f, &wanted).await.unwrap();
        let second = reorder(&f, &wanted).await.unwrap();
        assert_eq!(first, second);

        let mut ids_after: Vec<Uuid> = second.iter().map(|m| m.id).collect();
        ids_after.reverse();
        assert_eq!(ids_after, ids_before);
    }

    #[tokio::test]
    async fn failure_mid_write_rolls_back_every_position() {
        let f = fixture(3).await;
        let before = stored_order(&f).await;

        sqlx::query(
            r#"CREATE TRIGGER fail_last_position
               BEFORE UPDATE OF position ON learning_path_courses
               WHEN NEW.position = 2
               BEGIN
                 SELECT RAISE(ABORT, 'injected failure');
               END"#,
        )
        .execute(&f.db.pool)
        .await
        .unwrap();

        let wanted = vec![f.courses[2], f.courses[0], f.courses[1]];
        let result = reorder(&f, &wanted).await;
        assert!(matches!(result, Err(LearningPathError::Database(_))));
        assert_eq!(stored_order(&f).await, before);
    }

    #[tokio::test]
    async fn empty_path_accepts_empty_order() {
        let f = fixture(0).await;
        let members = reorder(&f, &[]).await.unwrap();
        assert!(members.is_empty());
    }

    #[tokio::test]
    async fn authorization_and_scope_are_checked() {
        let f = fixture(2).await;
        let wanted = vec![f.courses[1], f.courses[0]];

        let student = Principal::new(f.owner.user_id, Role::Student);
        let denied = ReorderService::reorder(&f.db.pool, &student, f.owner.user_id, f.path_id, &wanted).await;
        assert!(matches!(denied, Err(LearningPathError::Forbidden(_))));

        let lead = Principal::new(Uuid::new_v4(), Role::Lead);
        let wrong_scope =
            ReorderService::reorder(&f.db.pool, &lead, Uuid::new_v4(), f.path_id, &wanted).await;
        assert!(matches!(wrong_scope, Err(LearningPathError::NotFound(_))));

        ReorderService::reorder(&f.db.pool, &lead, f.owner.user_id, f.path_id, &wanted)
            .await
            .unwrap();
        assert_eq!(stored_order(&f).await, vec![(wanted[0], 0), (wanted[1], 1)]);
    }

    #[test]
    fn body_entries_sort_by_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let body = ReorderCourses {
            courses: vec![
                CoursePosition { course_id: a, order: 3 },
                CoursePosition { course_id: b, order: 1 },
            ],
        };
        assert_eq!(body.ordered_course_ids().unwrap(), vec![b, a]);

        let clash = ReorderCourses {
            courses: vec![
                CoursePosition { course_id: a, order: 0 },
                CoursePosition { course_id: b, order: 0 },
            ],
        };
        assert!(matches!(clash.ordered_course_ids(), Err(LearningPathError::Validation(_))));
    }
}
