//! Server configuration loaded once at startup.
//!
//! Environment variables:
//! - `DATABASE_URL`: PostgreSQL URL; when unset, records live in memory
//! - `HOST` / `PORT`: listen address (default `0.0.0.0:3000`)
//! - `CATCH_CONSUMERS`: `key:secret[,key:secret...]` token consumers
//! - `CATCH_SECRET_KEY` / `CATCH_CONSUMER_KEY`: a single consumer, added to
//!   `CATCH_CONSUMERS` (key defaults to `catch`)
//! - `CATCH_JWT_ALGORITHM`: `HS256` (default), `HS384` or `HS512`
//! - `CATCH_COMPAT_MODE`: `true` makes the legacy format the default
//! - `CATCH_RESPONSE_LIMIT`: search row ceiling (default 200)
//! - `CATCH_LOG_SQL`: `true` logs generated search SQL at debug
//! - `ALLOWED_ORIGINS`: comma-separated CORS origins
//! - `MAX_BODY_SIZE_BYTES`: request body limit (default 16 MiB)

use std::env;
use std::str::FromStr;

use catch_auth::{parse_algorithm, Algorithm, Consumer, StaticConsumers};
use catch_core::defaults::{MAX_BODY_SIZE_BYTES, MAX_RESPONSE_LIMIT, SERVER_PORT};
use catch_core::{Error, ResponseFormat, Result};

/// Consumer key used for `CATCH_SECRET_KEY` when none is given.
pub const DEFAULT_CONSUMER_KEY: &str = "catch";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub consumers: StaticConsumers,
    pub algorithm: Algorithm,
    pub default_format: ResponseFormat,
    pub response_limit: i64,
    pub log_sql: bool,
    pub allowed_origins: Vec<String>,
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: "0.0.0.0".to_string(),
            port: SERVER_PORT,
            consumers: StaticConsumers::new(),
            algorithm: Algorithm::HS256,
            default_format: ResponseFormat::Catcha,
            response_limit: MAX_RESPONSE_LIMIT,
            log_sql: false,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            max_body_size: MAX_BODY_SIZE_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let mut consumers = StaticConsumers::parse(&env::var("CATCH_CONSUMERS").unwrap_or_default());
        if let Ok(secret) = env::var("CATCH_SECRET_KEY") {
            if !secret.is_empty() {
                consumers.insert(Consumer {
                    key: env::var("CATCH_CONSUMER_KEY")
                        .unwrap_or_else(|_| DEFAULT_CONSUMER_KEY.to_string()),
                    secret,
                    expire_on: None,
                });
            }
        }
        if consumers.is_empty() {
            tracing::warn!("No token consumers configured; every request will be rejected");
        }

        let algorithm = match env::var("CATCH_JWT_ALGORITHM") {
            Ok(name) => parse_algorithm(&name).map_err(|e| Error::Config(e.to_string()))?,
            Err(_) => defaults.algorithm,
        };

        let default_format = if flag("CATCH_COMPAT_MODE") {
            ResponseFormat::AnnotatorJs
        } else {
            ResponseFormat::Catcha
        };

        let allowed_origins = match env::var("ALLOWED_ORIGINS") {
            Ok(list) if !list.trim().is_empty() => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => defaults.allowed_origins,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|u| !u.is_empty()),
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT", defaults.port),
            consumers,
            algorithm,
            default_format,
            response_limit: parsed("CATCH_RESPONSE_LIMIT", defaults.response_limit),
            log_sql: flag("CATCH_LOG_SQL"),
            allowed_origins,
            max_body_size: parsed("MAX_BODY_SIZE_BYTES", defaults.max_body_size),
        })
    }
}

fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

fn parsed<T: FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %raw, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.response_limit, 200);
        assert_eq!(config.default_format, ResponseFormat::Catcha);
        assert!(config.database_url.is_none());
        assert!(config.consumers.is_empty());
    }
}
