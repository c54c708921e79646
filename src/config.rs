use std::env;

use thiserror::Error;

use crate::services::stats_service::DEFAULT_RECENT_LIMIT;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Bootstrap admin created at startup when both variables are present.
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub environment: String,
    pub allowed_origins: Vec<String>,
    pub stats_recent_limit: usize,
    pub admin_seed: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = match non_empty("PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                reason: format!("{}", e),
            })?,
            None => 3000,
        };

        let stats_recent_limit: usize = match non_empty("STATS_RECENT_LIMIT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "STATS_RECENT_LIMIT",
                reason: format!("{}", e),
            })?,
            None => DEFAULT_RECENT_LIMIT,
        };
        if stats_recent_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "STATS_RECENT_LIMIT",
                reason: "must be at least 1".to_string(),
            });
        }

        let allowed_origins = non_empty("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let admin_seed = match (non_empty("ADMIN_EMAIL"), non_empty("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                email: email.trim().to_string(),
                password,
            }),
            _ => None,
        };

        Ok(Config {
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: non_empty("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            jwt_secret: non_empty("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            environment: non_empty("APP_ENV").unwrap_or_else(|| "development".to_string()),
            allowed_origins,
            stats_recent_limit,
            admin_seed,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Session cookies carry `Secure` only in production so local HTTP works.
    pub fn secure_cookies(&self) -> bool {
        self.is_production()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
