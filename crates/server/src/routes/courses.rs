use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::course::{Course, CreateCourse, UpdateCourse};
use deployment::Deployment;
use services::services::{course::CourseService, pagination::Page};
use utils::response::ApiResponse;
use uuid::Uuid;

use super::ListQuery;
use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{AppJson, AppPath, AppQuery},
    middleware::Auth,
};

pub async fn create_course(
    State(deployment): State<DeploymentImpl>,
    Auth(principal): Auth,
    AppPath(instructor_id): AppPath<Uuid>,
    AppJson(payload): AppJson<CreateCourse>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Course>>), ApiError> {
    let course =
        CourseService::create(&deployment.db().pool, &principal, instructor_id, payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(course))))
}

pub async fn update_course(
    State(deployment): State<DeploymentImpl>,
    Auth(principal): Auth,
    AppPath((instructor_id, course_id)): AppPath<(Uuid, Uuid)>,
    AppJson(payload): AppJson<UpdateCourse>,
) -> Result<ResponseJson<ApiResponse<Course>>, ApiError> {
    let course = CourseService::update(
        &deployment.db().pool,
        &principal,
        instructor_id,
        course_id,
        payload,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(course)))
}

/// Also removes the course from every learning path holding it.
pub async fn delete_course(
    State(deployment): State<DeploymentImpl>,
    Auth(principal): Auth,
    AppPath((instructor_id, course_id)): AppPath<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    CourseService::delete(&deployment.db().pool, &principal, instructor_id, course_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn list_courses(
    State(deployment): State<DeploymentImpl>,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<ResponseJson<ApiResponse<Page<Course>>>, ApiError> {
    let page = CourseService::list(
        &deployment.db().pool,
        deployment.page_limits(),
        query.instructor_id,
        &query.page(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

pub async fn get_course(
    State(deployment): State<DeploymentImpl>,
    AppPath(course_id): AppPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Course>>, ApiError> {
    let course = CourseService::get(&deployment.db().pool, course_id).await?;
    Ok(ResponseJson(ApiResponse::success(course)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/instructors/{instructor_id}/courses", post(create_course))
        .route(
            "/instructors/{instructor_id}/courses/{course_id}",
            put(update_course).delete(delete_course),
        )
        .route("/courses", get(list_courses))
        .route("/courses/{course_id}", get(get_course))
}
