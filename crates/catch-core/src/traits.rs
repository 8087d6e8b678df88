//! Storage abstraction consumed by the CRUD and search engines.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Annotation;
use crate::search::SearchQuery;

// =============================================================================
// ANNOTATION STORE
// =============================================================================

/// Persistence backend for annotations.
///
/// Implementations fill `total_replies` on every record they return and
/// must enforce uniqueness of `id` across live and soft-deleted records.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Fetch a record by id, including soft-deleted ones.
    async fn get(&self, id: &str) -> Result<Option<Annotation>>;

    /// Insert a new record. Fails with `DuplicateAnnotationId` when the id
    /// is taken.
    async fn insert(&self, anno: &Annotation) -> Result<Annotation>;

    /// Replace an existing record in whole.
    async fn save(&self, anno: &Annotation) -> Result<Annotation>;

    /// Matching records, most recent first. `limit = None` is unbounded.
    async fn filter(
        &self,
        query: &SearchQuery,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Annotation>>;

    /// Number of records matching `query`, ignoring pagination.
    async fn count(&self, query: &SearchQuery) -> Result<i64>;
}
