//! Routes for learning paths and the order of their courses.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{delete, get, post, put},
};
use db::models::{
    learning_path::{CreateLearningPath, LearningPath, LearningPathWithCourses, UpdateLearningPath},
    learning_path_course::LearningPathCourse,
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::{
    learning_path::LearningPathService,
    learning_path_detail::{LearningPathDetail, LearningPathDetailService},
    pagination::{Page, PageRequest},
    reorder::{ReorderCourses, ReorderService},
};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::ListQuery;
use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{AppJson, AppPath, AppQuery},
    middleware::{Auth, MaybeAuth},
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AddLearningPathCourse {
    pub course_id: Uuid,
}

pub async fn create_learning_path(
    State(deployment): State<DeploymentImpl>,
    Auth(principal): Auth,
    AppPath(instructor_id): AppPath<Uuid>,
    AppJson(payload): AppJson<CreateLearningPath>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<LearningPathWithCourses>>), ApiError> {
    let learning_path =
        LearningPathService::create(&deployment.db().pool, &principal, instructor_id, payload)
            .await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(learning_path)),
    ))
}

/// All of an instructor's paths, drafts included.
pub async fn list_instructor_learning_paths(
    State(deployment): State<DeploymentImpl>,
    Auth(principal): Auth,
    AppPath(instructor_id): AppPath<Uuid>,
    AppQuery(page): AppQuery<PageRequest>,
) -> Result<ResponseJson<ApiResponse<Page<LearningPath>>>, ApiError> {
    let page = LearningPathService::list_for_instructor(
        &deployment.db().pool,
        &principal,
        deployment.page_limits(),
        instructor_id,
        &page,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn get_instructor_learning_path(
    State(deployment): State<DeploymentImpl>,
    Auth(principal): Auth,
    AppPath((instructor_id, id)): AppPath<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<LearningPathWithCourses>>, ApiError> {
    let learning_path = LearningPathService::get_for_instructor(
        &deployment.db().pool,
        &principal,
        instructor_id,
        id,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(learning_path)))
}

pub async fn update_learning_path(
    State(deployment): State<DeploymentImpl>,
    Auth(principal): Auth,
    AppPath((instructor_id, id)): AppPath<(Uuid, Uuid)>,
    AppJson(payload): AppJson<UpdateLearningPath>,
) -> Result<ResponseJson<ApiResponse<LearningPathWithCourses>>, ApiError> {
    let learning_path = LearningPathService::update(
        &deployment.db().pool,
        &principal,
        instructor_id,
        id,
        payload,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(learning_path)))
}

pub async fn delete_learning_path(
    State(deployment): State<DeploymentImpl>,
    Auth(principal): Auth,
    AppPath((instructor_id, id)): AppPath<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    LearningPathService::delete(&deployment.db().pool, &principal, instructor_id, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Replaces the course order; the body must list every member exactly once.
pub async fn reorder_learning_path_courses(
    State(deployment): State<DeploymentImpl>,
    Auth(principal): Auth,
    AppPath((instructor_id, id)): AppPath<(Uuid, Uuid)>,
    AppJson(payload): AppJson<ReorderCourses>,
) -> Result<ResponseJson<ApiResponse<Vec<LearningPathCourse>>>, ApiError> {
    let ordered = payload.ordered_course_ids()?;
    let members = ReorderService::reorder(
        &deployment.db().pool,
        &principal,
        instructor_id,
        id,
        &ordered,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(members)))
}

pub async fn add_learning_path_course(
    State(deployment): State<DeploymentImpl>,
    Auth(principal): Auth,
    AppPath((instructor_id, id)): AppPath<(Uuid, Uuid)>,
    AppJson(payload): AppJson<AddLearningPathCourse>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<LearningPathWithCourses>>), ApiError> {
    let learning_path = LearningPathService::add_course(
        &deployment.db().pool,
        &principal,
        instructor_id,
        id,
        payload.course_id,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(learning_path)),
    ))
}

pub async fn remove_learning_path_course(
    State(deployment): State<DeploymentImpl>,
    Auth(principal): Auth,
    AppPath((instructor_id, id, course_id)): AppPath<(Uuid, Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<LearningPathWithCourses>>, ApiError> {
    let learning_path = LearningPathService::remove_course(
        &deployment.db().pool,
        &principal,
        instructor_id,
        id,
        course_id,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(learning_path)))
}

/// Published paths, optionally narrowed with `?instructorId=`.
pub async fn list_learning_paths(
    State(deployment): State<DeploymentImpl>,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<ResponseJson<ApiResponse<Page<LearningPath>>>, ApiError> {
    let page = LearningPathService::list_published(
        &deployment.db().pool,
        deployment.page_limits(),
        query.instructor_id,
        &query.page(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn get_learning_path_detail(
    State(deployment): State<DeploymentImpl>,
    MaybeAuth(viewer): MaybeAuth,
    AppPath(id): AppPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<LearningPathDetail>>, ApiError> {
    let detail =
        LearningPathDetailService::get_detail(&deployment.db().pool, id, viewer.as_ref()).await?;
    Ok(ResponseJson(ApiResponse::success(detail)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/instructors/{instructor_id}/learning-paths",
            get(list_instructor_learning_paths).post(create_learning_path),
        )
        .route(
            "/instructors/{instructor_id}/learning-paths/{id}",
            get(get_instructor_learning_path)
                .put(update_learning_path)
                .delete(delete_learning_path),
        )
        .route(
            "/instructors/{instructor_id}/learning-paths/{id}/courses-order",
            put(reorder_learning_path_courses),
        )
        .route(
            "/instructors/{instructor_id}/learning-paths/{id}/courses",
            post(add_learning_path_course),
        )
        .route(
            "/instructors/{instructor_id}/learning-paths/{id}/courses/{course_id}",
            delete(remove_learning_path_course),
        )
        .route("/learning-paths", get(list_learning_paths))
        .route("/learning-paths/{id}", get(get_learning_path_detail))
}
