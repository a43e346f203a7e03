//! Startup check that the schema the services rely on is in place.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

/// Tables every request path touches.
pub const REQUIRED_TABLES: &[&str] = &["courses", "learning_paths", "learning_path_courses"];

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("database not initialized: {0}")]
    NotInitialized(String),
}

pub struct DatabaseValidator {
    pool: SqlitePool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub migrations_applied: usize,
    pub latest_migration: Option<String>,
    pub missing_tables: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.migrations_applied > 0 && self.missing_tables.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.missing_tables.is_empty() {
            format!(
                "Database OK - {} migration(s) applied, latest: {}",
                self.migrations_applied,
                self.latest_migration.as_deref().unwrap_or("none")
            )
        } else {
            format!("Missing tables: {}", self.missing_tables.join(", "))
        }
    }
}

impl DatabaseValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fails with `NotInitialized` when migrations never ran or a required
    /// table is absent.
    pub async fn validate(&self) -> Result<ValidationReport, DatabaseValidationError> {
        if !self.table_exists("_sqlx_migrations").await? {
            warn!("_sqlx_migrations table does not exist");
            return Err(DatabaseValidationError::NotInitialized(
                "no migrations have been applied".to_string(),
            ));
        }

        let migrations_applied = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(&self.pool)
        .await? as usize;

        let latest_migration = sqlx::query_scalar::<_, String>(
            "SELECT description FROM _sqlx_migrations WHERE success = 1 ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let missing_tables = self.missing_tables(REQUIRED_TABLES).await?;
        let report = ValidationReport {
            migrations_applied,
            latest_migration,
            missing_tables,
        };

        if !report.is_ok() {
            warn!(summary = %report.summary(), "Database validation failed");
            return Err(DatabaseValidationError::NotInitialized(report.summary()));
        }

        info!(migrations_applied, "Database validation complete");
        Ok(report)
    }

    pub async fn missing_tables(&self, required: &[&str]) -> Result<Vec<String>, DatabaseValidationError> {
        let mut missing = Vec::new();
        for table in required {
            if !self.table_exists(table).await? {
                missing.push(table.to_string());
            }
        }
        Ok(missing)
    }

    async fn table_exists(&self, name: &str) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }
}
