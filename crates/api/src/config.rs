use std::str::FromStr;

use giftlock_lifecycle::context::DEFAULT_GIFT_LIFETIME_DAYS;
use giftlock_lifecycle::LifecycleSettings;

use crate::auth::jwt::JwtConfig;

/// A required variable is missing or a value does not parse.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
    /// Base URL of the recipient app, used for tracking links.
    pub public_base_url: String,
    pub gift_lifetime_days: i64,
    /// How often overdue gifts are swept to `expired`.
    pub expiry_sweep_secs: u64,
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                    |
    /// |--------------------------|----------------------------|
    /// | `HOST`                   | `0.0.0.0`                  |
    /// | `PORT`                   | `3000`                     |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`  | `30`                       |
    /// | `PUBLIC_BASE_URL`        | `http://localhost:3000`    |
    /// | `GIFT_LIFETIME_DAYS`     | `7`                        |
    /// | `GIFT_EXPIRY_SWEEP_SECS` | `300`                      |
    /// | `JWT_SECRET`             | required                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        let cors_origins = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: env_or("HOST", "0.0.0.0"),
            port: parse_env("PORT", 3000)?,
            cors_origins,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: parse_env("SHUTDOWN_TIMEOUT_SECS", 30)?,
            public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost:3000"),
            gift_lifetime_days: parse_env("GIFT_LIFETIME_DAYS", DEFAULT_GIFT_LIFETIME_DAYS)?,
            expiry_sweep_secs: parse_env("GIFT_EXPIRY_SWEEP_SECS", 300)?,
            jwt: JwtConfig::from_env()?,
        })
    }

    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        LifecycleSettings {
            public_base_url: self.public_base_url.clone(),
            default_gift_lifetime: chrono::Duration::days(self.gift_lifetime_days),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

pub(crate) fn parse_env<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
