//! # catch-db
//!
//! Storage layer for the catch annotation store.
//!
//! This crate provides:
//! - Connection pool management
//! - [`PgAnnotationRepository`], the PostgreSQL [`AnnotationStore`]
//! - SQL generation for search queries, with full-text search over the
//!   commenting body via a `tsvector` column
//! - [`MemoryAnnotationStore`] for tests and database-less runs
//!
//! ## Example
//!
//! ```rust,ignore
//! use catch_db::{AnnotationStore, Database, PoolConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/catch", &PoolConfig::from_env()).await?;
//!     db.migrate().await?;
//!
//!     if let Some(anno) = db.annotations.get("1234").await? {
//!         println!("{} by {}", anno.id, anno.creator_name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod annotations;
pub mod memory;
pub mod pool;
pub mod query;

// Always compiled so integration tests (in tests/) and other crates can use
// the fixtures.
pub mod test_fixtures;

// Re-export core types
pub use catch_core::*;

pub use annotations::PgAnnotationRepository;
pub use memory::MemoryAnnotationStore;
pub use pool::{connect_pool, log_pool_metrics, PoolConfig};
pub use query::{QueryParam, SearchQueryBuilder};

/// Database context holding the pool and repositories.
#[derive(Clone)]
pub struct Database {
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub annotations: PgAnnotationRepository,
}

impl Database {
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            annotations: PgAnnotationRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to `url` with the given pool settings.
    pub async fn connect(url: &str, config: &PoolConfig) -> Result<Self> {
        Ok(Self::new(connect_pool(url, config).await?))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
