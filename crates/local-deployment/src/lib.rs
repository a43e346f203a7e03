use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{config::Config, database_validator::DatabaseValidator};

/// Single-node deployment backed by a local SQLite file.
#[derive(Clone)]
pub struct LocalDeployment {
    db: DBService,
    config: Arc<Config>,
}

impl LocalDeployment {
    /// Wires an already opened database; used by tests and tooling.
    pub fn from_parts(db: DBService, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = Config::from_env()?;
        let db = DBService::new(&config.database_url).await?;

        let report = DatabaseValidator::new(db.pool.clone()).validate().await?;
        tracing::info!(
            environment = %config.environment,
            summary = %report.summary(),
            "Local deployment ready"
        );

        Ok(Self::from_parts(db, config))
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn config(&self) -> &Config {
        &self.config
    }
}
