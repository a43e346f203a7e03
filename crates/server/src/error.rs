use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use db::is_unique_violation;
use services::services::{
    auth::AuthError, course::CourseError, learning_path::LearningPathError,
};
use thiserror::Error;
use utils::response::ApiResponse;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    LearningPath(#[from] LearningPathError),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("authentication required")]
    Unauthorized,
    #[error(transparent)]
    Json(#[from] JsonRejection),
    #[error(transparent)]
    Query(#[from] QueryRejection),
    #[error(transparent)]
    Path(#[from] PathRejection),
}

fn database_error<E: std::fmt::Display>(err: &E, unique_violation: bool) -> (StatusCode, String) {
    if unique_violation {
        return (
            StatusCode::BAD_REQUEST,
            "the request conflicts with an existing record".to_string(),
        );
    }
    tracing::error!(error = %err, "Database error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_ERROR_MESSAGE.to_string(),
    )
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::LearningPath(err) => match err {
                LearningPathError::Database(e) => database_error(e, is_unique_violation(e)),
                LearningPathError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                LearningPathError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                LearningPathError::Forbidden(e) => (StatusCode::FORBIDDEN, e.to_string()),
                LearningPathError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            },
            ApiError::Course(err) => match err {
                CourseError::Database(e) => database_error(e, is_unique_violation(e)),
                CourseError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CourseError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                CourseError::Forbidden(e) => (StatusCode::FORBIDDEN, e.to_string()),
            },
            ApiError::Auth(err) => {
                tracing::debug!(error = %err, "Rejected bearer token");
                (
                    StatusCode::UNAUTHORIZED,
                    "invalid or expired token".to_string(),
                )
            }
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Json(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            ApiError::Query(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            ApiError::Path(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = ApiResponse::<()>::error(&message);
        (status, ResponseJson(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use services::services::auth::AccessDenied;

    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (
                ApiError::from(LearningPathError::Validation("bad".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(LearningPathError::NotFound("gone".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(LearningPathError::Forbidden(AccessDenied("no".into()))),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::from(LearningPathError::Conflict("busy".into())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(CourseError::NotFound("gone".into())),
                StatusCode::NOT_FOUND,
            ),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn database_details_are_not_exposed() {
        let err = ApiError::from(LearningPathError::Database(sqlx::Error::PoolTimedOut));
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, INTERNAL_ERROR_MESSAGE);
    }
}
