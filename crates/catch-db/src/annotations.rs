//! Annotation repository implementation.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Pool, Postgres, Row, Transaction};
use std::time::Instant;

use catch_core::{
    Annotation, AnnotationStore, Catcha, Error, Permissions, Result, SearchQuery,
};

use crate::query::{QueryParam, SearchQueryBuilder};

/// Columns selected for every annotation read, with the live reply count.
const ANNO_COLUMNS: &str = "a.anno_id, a.schema_version, a.creator_id, a.creator_name, \
     a.created, a.modified, a.can_read, a.can_update, a.can_delete, a.can_admin, \
     a.body_text, a.tags, a.target_sources, a.target_medias, a.platform_name, \
     a.context_id, a.collection_id, a.target_source_id, a.reply_to, a.deleted, a.raw, \
     (SELECT COUNT(*) FROM anno r WHERE r.reply_to = a.anno_id AND r.deleted = FALSE) \
     AS total_replies";

/// SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL implementation of [`AnnotationStore`].
#[derive(Clone)]
pub struct PgAnnotationRepository {
    pool: Pool<Postgres>,
    log_sql: bool,
}

impl PgAnnotationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            log_sql: false,
        }
    }

    /// Log generated search SQL at debug level.
    pub fn with_sql_logging(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    fn trace_sql(&self, sql: &str, params: &[QueryParam]) {
        if self.log_sql {
            tracing::debug!(
                subsystem = "database",
                component = "annotations",
                sql = %sql,
                params = ?params,
                "Search SQL"
            );
        }
    }

    async fn fetch_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: &str,
    ) -> Result<Option<Annotation>> {
        let sql = format!("SELECT {} FROM anno a WHERE a.anno_id = $1", ANNO_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?;
        row.map(|r| row_to_annotation(&r)).transpose()
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [QueryParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            QueryParam::String(s) => query.bind(s),
            QueryParam::StringArray(arr) => query.bind(arr),
        };
    }
    query
}

fn row_to_annotation(row: &PgRow) -> Result<Annotation> {
    let raw: JsonValue = row.get("raw");
    let raw: Catcha = serde_json::from_value(raw)?;
    Ok(Annotation {
        id: row.get("anno_id"),
        schema_version: row.get("schema_version"),
        creator_id: row.get("creator_id"),
        creator_name: row.get("creator_name"),
        created: row.get("created"),
        modified: row.get("modified"),
        permissions: Permissions {
            can_read: row.get("can_read"),
            can_update: row.get("can_update"),
            can_delete: row.get("can_delete"),
            can_admin: row.get("can_admin"),
        },
        body_text: row.get("body_text"),
        tags: row.get("tags"),
        target_sources: row.get("target_sources"),
        target_medias: row.get("target_medias"),
        platform_name: row.get("platform_name"),
        context_id: row.get("context_id"),
        collection_id: row.get("collection_id"),
        target_source_id: row.get("target_source_id"),
        reply_to: row.get("reply_to"),
        deleted: row.get("deleted"),
        total_replies: row.get("total_replies"),
        raw,
    })
}

fn map_insert_error(id: &str, e: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return Error::DuplicateAnnotationId(format!(
                "anno({}): already exists, failed to create",
                id
            ));
        }
    }
    Error::Database(e)
}

#[async_trait]
impl AnnotationStore for PgAnnotationRepository {
    async fn get(&self, id: &str) -> Result<Option<Annotation>> {
        let sql = format!("SELECT {} FROM anno a WHERE a.anno_id = $1", ANNO_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.map(|r| row_to_annotation(&r)).transpose()
    }

    async fn insert(&self, anno: &Annotation) -> Result<Annotation> {
        let raw = serde_json::to_value(&anno.raw)?;
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO anno (anno_id, schema_version, creator_id, creator_name, created, \
             modified, can_read, can_update, can_delete, can_admin, body_text, tags, \
             target_sources, target_medias, platform_name, context_id, collection_id, \
             target_source_id, reply_to, deleted, raw) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21)",
        )
        .bind(&anno.id)
        .bind(&anno.schema_version)
        .bind(&anno.creator_id)
        .bind(&anno.creator_name)
        .bind(anno.created)
        .bind(anno.modified)
        .bind(&anno.permissions.can_read)
        .bind(&anno.permissions.can_update)
        .bind(&anno.permissions.can_delete)
        .bind(&anno.permissions.can_admin)
        .bind(&anno.body_text)
        .bind(&anno.tags)
        .bind(&anno.target_sources)
        .bind(&anno.target_medias)
        .bind(&anno.platform_name)
        .bind(&anno.context_id)
        .bind(&anno.collection_id)
        .bind(&anno.target_source_id)
        .bind(&anno.reply_to)
        .bind(anno.deleted)
        .bind(&raw)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(&anno.id, e))?;

        let stored = self.fetch_tx(&mut tx, &anno.id).await?;
        tx.commit().await.map_err(Error::Database)?;

        tracing::debug!(
            subsystem = "database",
            component = "annotations",
            op = "insert",
            anno_id = %anno.id,
            "Annotation inserted"
        );
        stored.ok_or_else(|| Error::Internal(format!("anno({}) vanished after insert", anno.id)))
    }

    async fn save(&self, anno: &Annotation) -> Result<Annotation> {
        let raw = serde_json::to_value(&anno.raw)?;
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let result = sqlx::query(
            "UPDATE anno SET schema_version = $2, creator_id = $3, creator_name = $4, \
             created = $5, modified = $6, can_read = $7, can_update = $8, can_delete = $9, \
             can_admin = $10, body_text = $11, tags = $12, target_sources = $13, \
             target_medias = $14, platform_name = $15, context_id = $16, collection_id = $17, \
             target_source_id = $18, reply_to = $19, deleted = $20, raw = $21 \
             WHERE anno_id = $1",
        )
        .bind(&anno.id)
        .bind(&anno.schema_version)
        .bind(&anno.creator_id)
        .bind(&anno.creator_name)
        .bind(anno.created)
        .bind(anno.modified)
        .bind(&anno.permissions.can_read)
        .bind(&anno.permissions.can_update)
        .bind(&anno.permissions.can_delete)
        .bind(&anno.permissions.can_admin)
        .bind(&anno.body_text)
        .bind(&anno.tags)
        .bind(&anno.target_sources)
        .bind(&anno.target_medias)
        .bind(&anno.platform_name)
        .bind(&anno.context_id)
        .bind(&anno.collection_id)
        .bind(&anno.target_source_id)
        .bind(&anno.reply_to)
        .bind(anno.deleted)
        .bind(&raw)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::MissingAnnotation(format!("anno({}) not found", anno.id)));
        }

        let stored = self.fetch_tx(&mut tx, &anno.id).await?;
        tx.commit().await.map_err(Error::Database)?;

        tracing::debug!(
            subsystem = "database",
            component = "annotations",
            op = "save",
            anno_id = %anno.id,
            deleted = anno.deleted,
            "Annotation saved"
        );
        stored.ok_or_else(|| Error::Internal(format!("anno({}) vanished after save", anno.id)))
    }

    async fn filter(
        &self,
        query: &SearchQuery,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Annotation>> {
        let start = Instant::now();
        let (clause, params) = SearchQueryBuilder::new(query).build();
        let n = params.len();
        let sql = format!(
            "SELECT {} FROM anno a WHERE {} ORDER BY a.created DESC, a.anno_id LIMIT ${} OFFSET ${}",
            ANNO_COLUMNS,
            clause,
            n + 1,
            n + 2
        );

        self.trace_sql(&sql, &params);
        let rows = bind_params(sqlx::query(&sql), &params)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let annos = rows
            .iter()
            .map(row_to_annotation)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            subsystem = "database",
            component = "annotations",
            op = "filter",
            result_count = annos.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Annotation filter complete"
        );
        Ok(annos)
    }

    async fn count(&self, query: &SearchQuery) -> Result<i64> {
        let (clause, params) = SearchQueryBuilder::new(query).build();
        let sql = format!("SELECT COUNT(*) AS count FROM anno a WHERE {}", clause);
        self.trace_sql(&sql, &params);
        let row = bind_params(sqlx::query(&sql), &params)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.get("count"))
    }
}
