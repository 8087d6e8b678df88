//! PostgreSQL pool setup for the annotation table.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use catch_core::{Error, Result};

/// Default maximum number of connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default time to wait for a free connection, in seconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Default idle timeout in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Connections are recycled after this many seconds.
pub const MAX_LIFETIME_SECS: u64 = 1800;

/// Pool sizing and timeouts, read from `CATCH_DB_*` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    /// Read `CATCH_DB_MAX_CONNECTIONS`, `CATCH_DB_MIN_CONNECTIONS`,
    /// `CATCH_DB_ACQUIRE_TIMEOUT_SECS` and `CATCH_DB_IDLE_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let read = |key: &str| -> Option<u64> {
            let raw = lookup(key)?;
            match raw.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(subsystem = "database", component = "pool", key, value = %raw, "Ignoring invalid pool setting");
                    None
                }
            }
        };

        let max_connections = read("CATCH_DB_MAX_CONNECTIONS")
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_connections);
        let min_connections = read("CATCH_DB_MIN_CONNECTIONS")
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(defaults.min_connections)
            .min(max_connections);

        Self {
            max_connections,
            min_connections,
            acquire_timeout: read("CATCH_DB_ACQUIRE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.acquire_timeout),
            idle_timeout: read("CATCH_DB_IDLE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
        }
    }
}

/// Open a pool against `database_url`.
pub async fn connect_pool(database_url: &str, config: &PoolConfig) -> Result<PgPool> {
    let start = Instant::now();
    info!(
        subsystem = "database",
        component = "pool",
        op = "create",
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        "Connecting to annotation database"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(Duration::from_secs(MAX_LIFETIME_SECS))
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "database",
        component = "pool",
        op = "established",
        pool_size = pool.size(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Annotation database connected"
    );
    Ok(pool)
}

/// Log pool occupancy; warns when every connection is checked out.
pub fn log_pool_metrics(pool: &PgPool) {
    let size = pool.size();
    let idle = pool.num_idle();
    debug!(
        subsystem = "database",
        component = "pool",
        op = "metrics",
        pool_size = size,
        pool_idle = idle,
        "Pool health check"
    );
    if idle == 0 && size > 0 {
        warn!(
            subsystem = "database",
            component = "pool",
            pool_size = size,
            "No idle connections left in pool"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(PoolConfig::from_lookup(lookup(&[])), PoolConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = PoolConfig::from_lookup(lookup(&[
            ("CATCH_DB_MAX_CONNECTIONS", "20"),
            ("CATCH_DB_MIN_CONNECTIONS", "4"),
            ("CATCH_DB_ACQUIRE_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 4);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = PoolConfig::from_lookup(lookup(&[
            ("CATCH_DB_MAX_CONNECTIONS", "0"),
            ("CATCH_DB_IDLE_TIMEOUT_SECS", "soon"),
        ]));
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.idle_timeout, Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS));
    }

    #[test]
    fn test_min_never_exceeds_max() {
        let config = PoolConfig::from_lookup(lookup(&[
            ("CATCH_DB_MAX_CONNECTIONS", "2"),
            ("CATCH_DB_MIN_CONNECTIONS", "8"),
        ]));
        assert_eq!(config.min_connections, 2);
    }
}
