use db::models::{
    learning_path::LearningPath,
    learning_path_course::{LearningPathCourse, LearningPathCourseSummary},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use ts_rs::TS;
use uuid::Uuid;

use super::{auth::Principal, learning_path::LearningPathError};

/// One course slot as shown to learners.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathCourseView {
    pub course_id: Uuid,
    pub order: i64,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub duration_minutes: Option<i64>,
    /// False when the course was archived or no longer exists.
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub learning_path: LearningPath,
    pub courses: Vec<LearningPathCourseView>,
    pub course_count: usize,
    pub available_course_count: usize,
    pub total_duration_minutes: i64,
}

impl LearningPathDetail {
    pub fn compose(learning_path: LearningPath, summaries: Vec<LearningPathCourseSummary>) -> Self {
        let courses: Vec<LearningPathCourseView> = summaries
            .into_iter()
            .map(|summary| {
                let available = summary.title.is_some() && summary.is_archived == Some(false);
                LearningPathCourseView {
                    course_id: summary.course_id,
                    order: summary.position,
                    title: summary.title,
                    thumbnail: summary.thumbnail,
                    duration_minutes: summary.duration_minutes,
                    available,
                }
            })
            .collect();

        let available = courses.iter().filter(|c| c.available);
        let available_course_count = available.clone().count();
        // Saturates instead of overflowing on absurd durations.
        let total_duration_minutes = available
            .filter_map(|c| c.duration_minutes)
            .fold(0i64, i64::saturating_add);

        Self {
            learning_path,
            course_count: courses.len(),
            available_course_count,
            total_duration_minutes,
            courses,
        }
    }
}

pub struct LearningPathDetailService;

impl LearningPathDetailService {
    /// Drafts are only visible to principals allowed to manage them; anyone
    /// else gets the same `NotFound` as for a missing path.
    pub async fn get_detail(
        pool: &SqlitePool,
        id: Uuid,
        viewer: Option<&Principal>,
    ) -> Result<LearningPathDetail, LearningPathError> {
        let learning_path = LearningPath::find_by_id(pool, id)
            .await?
            .filter(|path| {
                path.is_published || viewer.is_some_and(|p| p.can_manage(path.instructor_id))
            })
            .ok_or_else(|| LearningPathError::path_not_found(id))?;

        let summaries = LearningPathCourse::find_summaries(pool, id).await?;
        Ok(LearningPathDetail::compose(learning_path, summaries))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::{
        DBService,
        models::{
            course::{Course, UpdateCourse},
            learning_path::{CreateLearningPath, UpdateLearningPath},
        },
    };

    use super::*;
    use crate::services::{
        auth::Role,
        learning_path::{
            LearningPathService,
            test_support::{course, instructor},
        },
    };

    fn path() -> LearningPath {
        LearningPath {
            id: Uuid::new_v4(),
            instructor_id: Uuid::new_v4(),
            title: "Data".to_string(),
            description: None,
            thumbnail: None,
            estimated_completion_time: Some(4),
            is_published: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn summary(position: i64, minutes: Option<i64>, archived: Option<bool>) -> LearningPathCourseSummary {
        LearningPathCourseSummary {
            course_id: Uuid::new_v4(),
            position,
            title: archived.map(|_| format!("course {position}")),
            thumbnail: None,
            duration_minutes: minutes,
            is_archived: archived,
        }
    }

    #[test]
    fn compose_counts_only_available_courses() {
        let detail = LearningPathDetail::compose(
            path(),
            vec![
                summary(0, Some(30), Some(false)),
                summary(1, Some(45), Some(true)),
                summary(2, None, None),
                summary(3, Some(15), Some(false)),
            ],
        );

        assert_eq!(detail.course_count, 4);
        assert_eq!(detail.available_course_count, 2);
        assert_eq!(detail.total_duration_minutes, 45);
        let flags: Vec<bool> = detail.courses.iter().map(|c| c.available).collect();
        assert_eq!(flags, vec![true, false, false, true]);
        let orders: Vec<i64> = detail.courses.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[test]
    fn total_duration_saturates_instead_of_overflowing() {
        let detail = LearningPathDetail::compose(
            path(),
            vec![
                summary(0, Some(i64::MAX), Some(false)),
                summary(1, Some(1), Some(false)),
            ],
        );
        assert_eq!(detail.total_duration_minutes, i64::MAX);
        assert_eq!(detail.available_course_count, 2);
    }

    #[tokio::test]
    async fn detail_survives_huge_course_durations() {
        let db = DBService::new_in_memory().await.unwrap();
        let owner = instructor();
        let a = course(&db, owner.user_id, "A", i64::MAX).await;
        let b = course(&db, owner.user_id, "B", 1).await;
        let created = LearningPathService::create(
            &db.pool,
            &owner,
            owner.user_id,
            CreateLearningPath {
                title: "Long".to_string(),
                description: None,
                thumbnail: None,
                estimated_completion_time: None,
                is_published: Some(true),
                course_ids: vec![a.id, b.id],
            },
        )
        .await
        .unwrap();

        let detail = LearningPathDetailService::get_detail(&db.pool, created.id, None)
            .await
            .unwrap();
        assert_eq!(detail.total_duration_minutes, i64::MAX);
    }

    #[test]
    fn empty_path_has_zero_totals() {
        let detail = LearningPathDetail::compose(path(), vec![]);
        assert_eq!(detail.course_count, 0);
        assert_eq!(detail.total_duration_minutes, 0);
    }

    #[tokio::test]
    async fn detail_follows_order_and_flags_archived_courses() {
        let db = DBService::new_in_memory().await.unwrap();
        let owner = instructor();
        let a = course(&db, owner.user_id, "A", 60).await;
        let b = course(&db, owner.user_id, "B", 30).await;
        let created = LearningPathService::create(
            &db.pool,
            &owner,
            owner.user_id,
            CreateLearningPath {
                title: "Path".to_string(),
                description: None,
                thumbnail: None,
                estimated_completion_time: None,
                is_published: Some(true),
                course_ids: vec![b.id, a.id],
            },
        )
        .await
        .unwrap();
        Course::update(
            &db.pool,
            a.id,
            owner.user_id,
            &UpdateCourse {
                is_archived: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let detail = LearningPathDetailService::get_detail(&db.pool, created.id, None)
            .await
            .unwrap();
        let ids: Vec<Uuid> = detail.courses.iter().map(|c| c.course_id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
        assert_eq!(detail.available_course_count, 1);
        assert_eq!(detail.total_duration_minutes, 30);
        assert_eq!(detail.courses[1].title.as_deref(), Some("A"));
        assert!(!detail.courses[1].available);
    }

    #[tokio::test]
    async fn drafts_are_hidden_from_everyone_but_managers() {
        let db = DBService::new_in_memory().await.unwrap();
        let owner = instructor();
        let created = LearningPathService::create(
            &db.pool,
            &owner,
            owner.user_id,
            CreateLearningPath {
                title: "Draft".to_string(),
                description: None,
                thumbnail: None,
                estimated_completion_time: None,
                is_published: None,
                course_ids: vec![],
            },
        )
        .await
        .unwrap();

        let anonymous = LearningPathDetailService::get_detail(&db.pool, created.id, None).await;
        assert!(matches!(anonymous, Err(LearningPathError::NotFound(_))));

        let student = Principal::new(Uuid::new_v4(), Role::Student);
        let as_student = LearningPathDetailService::get_detail(&db.pool, created.id, Some(&student)).await;
        assert!(matches!(as_student, Err(LearningPathError::NotFound(_))));

        assert!(
            LearningPathDetailService::get_detail(&db.pool, created.id, Some(&owner))
                .await
                .is_ok()
        );
        let admin = Principal::new(Uuid::new_v4(), Role::Admin);
        assert!(
            LearningPathDetailService::get_detail(&db.pool, created.id, Some(&admin))
                .await
                .is_ok()
        );

        LearningPathService::update(
            &db.pool,
            &owner,
            owner.user_id,
            created.id,
            UpdateLearningPath {
                is_published: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(
            LearningPathDetailService::get_detail(&db.pool, created.id, None)
                .await
                .is_ok()
        );
    }
}
