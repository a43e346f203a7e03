//! Environment-driven server configuration.

use thiserror::Error;

use super::pagination::PageLimits;

const DEV_JWT_SECRET: &str = "dev-jwt-secret-not-for-production";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in the {1} environment")]
    Missing(&'static str, String),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// HS256 secret shared with the identity provider
    pub jwt_secret: String,
    /// development | staging | production
    pub environment: String,
    pub page_limits: PageLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://gradestack.db".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3001,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            environment: "development".to_string(),
            page_limits: PageLimits::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let environment = get("ENVIRONMENT").unwrap_or(defaults.environment);
        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if environment == "development" => defaults.jwt_secret,
            None => return Err(ConfigError::Missing("JWT_SECRET", environment)),
        };

        let page_limits = PageLimits {
            default: parse_or(get("DEFAULT_PAGE_SIZE"), "DEFAULT_PAGE_SIZE", defaults.page_limits.default)?,
            max: parse_or(get("MAX_PAGE_SIZE"), "MAX_PAGE_SIZE", defaults.page_limits.max)?,
        };
        if page_limits.default < 1 || page_limits.max < page_limits.default {
            return Err(ConfigError::Invalid {
                name: "DEFAULT_PAGE_SIZE",
                value: format!("{} (max {})", page_limits.default, page_limits.max),
            });
        }

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(get("PORT"), "PORT", defaults.port)?,
            jwt_secret,
            environment,
            page_limits,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
