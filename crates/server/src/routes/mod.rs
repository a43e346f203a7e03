use axum::Router;
use serde::Deserialize;
use services::services::pagination::PageRequest;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::DeploymentImpl;

pub mod courses;
pub mod health;
pub mod learning_paths;

/// Query string of the public list endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub instructor_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub page_token: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest {
            limit: self.limit,
            page_token: self.page_token.clone(),
        }
    }
}

pub fn router(deployment: DeploymentImpl) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(learning_paths::router(&deployment))
        .merge(courses::router(&deployment));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(deployment)
}
