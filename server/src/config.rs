//! Server configuration from environment variables.

use std::env;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DAILY_GLOBAL_LIMIT: i64 = 500;
pub const DEFAULT_DAILY_USER_LIMIT: i64 = 50;
pub const DEFAULT_HOURLY_GLOBAL_LIMIT: i64 = 100;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Server configuration.
///
/// Required:
/// - `DATABASE_URL`: Postgres connection string
/// - `SUPABASE_URL`: identity/storage base URL
/// - `SUPABASE_JWT_SECRET`: symmetric secret for bearer tokens
/// - `SUPABASE_SERVICE_KEY`: key for object-store uploads
///
/// Optional:
/// - `PORT` (default 3000)
/// - `DAILY_GLOBAL_LIMIT` (500), `DAILY_USER_LIMIT` (50), `HOURLY_GLOBAL_LIMIT` (100)
/// - `ADMIN_API_KEY`: enables /admin/stats when set
///
/// Provider variables (`AI_PROVIDER`, `AI_MODEL`, `OPENAI_API_KEY`,
/// `GEMINI_API_KEY`, `IMAGE_PROVIDER`, `IMAGE_MODEL`) are read by the core
/// provider factories.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub supabase_url: String,
    pub supabase_jwt_secret: String,
    pub supabase_service_key: String,
    pub admin_api_key: Option<String>,
    pub daily_global_limit: i64,
    pub daily_user_limit: i64,
    pub hourly_global_limit: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_or(env::var("PORT").ok(), DEFAULT_PORT),
            database_url: required("DATABASE_URL")?,
            supabase_url: required("SUPABASE_URL")?.trim_end_matches('/').to_string(),
            supabase_jwt_secret: required("SUPABASE_JWT_SECRET")?,
            supabase_service_key: required("SUPABASE_SERVICE_KEY")?,
            admin_api_key: env::var("ADMIN_API_KEY").ok().filter(|k| !k.is_empty()),
            daily_global_limit: parse_or(
                env::var("DAILY_GLOBAL_LIMIT").ok(),
                DEFAULT_DAILY_GLOBAL_LIMIT,
            ),
            daily_user_limit: parse_or(
                env::var("DAILY_USER_LIMIT").ok(),
                DEFAULT_DAILY_USER_LIMIT,
            ),
            hourly_global_limit: parse_or(
                env::var("HOURLY_GLOBAL_LIMIT").ok(),
                DEFAULT_HOURLY_GLOBAL_LIMIT,
            ),
        })
    }

    /// Issuer expected in bearer tokens.
    pub fn jwt_issuer(&self) -> String {
        format!("{}/auth/v1", self.supabase_url)
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_falls_back() {
        assert_eq!(parse_or::<u16>(None, 3000), 3000);
        assert_eq!(parse_or::<u16>(Some("8080".to_string()), 3000), 8080);
        assert_eq!(parse_or::<u16>(Some("not a port".to_string()), 3000), 3000);
    }
}
