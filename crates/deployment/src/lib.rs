use async_trait::async_trait;
use db::DBService;
use services::services::{
    config::{Config, ConfigError},
    database_validator::DatabaseValidationError,
    pagination::PageLimits,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    DatabaseValidation(#[from] DatabaseValidationError),
}

/// Everything a request handler needs from the running environment.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn db(&self) -> &DBService;

    fn config(&self) -> &Config;

    fn page_limits(&self) -> PageLimits {
        self.config().page_limits
    }

    fn jwt_secret(&self) -> &str {
        &self.config().jwt_secret
    }
}
