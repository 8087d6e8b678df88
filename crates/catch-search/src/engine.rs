//! Search execution: parameters → query → paginated page → envelope.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Map, Value as JsonValue};
use tracing::{debug, instrument};

use catch_core::annojs::convert_batch;
use catch_core::defaults::MAX_RESPONSE_LIMIT;
use catch_core::{
    Annotation, AnnotationStore, OverrideFlag, Predicate, ReadScope, ResponseFormat, Result,
    SearchDialect, SearchQuery, TokenClaims,
};

use crate::custom::{CustomQuery, PlatformQuery};
use crate::params::{capitalize, SearchParams};

/// Legacy media tag for replies.
const LEGACY_COMMENT_MEDIA: &str = "comment";

/// Configuration for the search engine.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Hard ceiling on rows returned by a single search.
    pub max_response_limit: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_response_limit: MAX_RESPONSE_LIMIT,
        }
    }
}

impl SearchConfig {
    pub fn with_max_response_limit(mut self, limit: i64) -> Self {
        self.max_response_limit = limit.max(0);
        self
    }
}

/// One page of search results.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub rows: Vec<Annotation>,
    /// Matching records before pagination.
    pub total: i64,
    /// Rows actually returned, after the ceiling.
    pub size: i64,
    /// Limit as requested, negative meaning unbounded.
    pub limit: i64,
    pub offset: i64,
}

impl SearchResult {
    /// Render the response envelope.
    ///
    /// Legacy output adds `failed` and `size_failed`; records that fail
    /// conversion are left out of `rows` but still counted in `size`.
    pub fn render(&self, format: ResponseFormat) -> Result<JsonValue> {
        let mut envelope = Map::new();
        envelope.insert("total".into(), json!(self.total));
        envelope.insert("limit".into(), json!(self.limit));
        envelope.insert("offset".into(), json!(self.offset));
        envelope.insert("size".into(), json!(self.size));

        match format {
            ResponseFormat::Catcha => {
                let rows = self
                    .rows
                    .iter()
                    .map(Annotation::serialized)
                    .collect::<Result<Vec<_>>>()?;
                envelope.insert("rows".into(), JsonValue::Array(rows));
            }
            ResponseFormat::AnnotatorJs => {
                let batch = convert_batch(&self.rows);
                envelope.insert("rows".into(), JsonValue::Array(batch.rows));
                envelope.insert("failed".into(), serde_json::to_value(&batch.failed)?);
                envelope.insert("size_failed".into(), json!(batch.size_failed));
            }
        }
        Ok(JsonValue::Object(envelope))
    }
}

/// Search engine over an [`AnnotationStore`].
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<dyn AnnotationStore>,
    custom: Arc<dyn CustomQuery>,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn AnnotationStore>) -> Self {
        Self {
            store,
            custom: Arc::new(PlatformQuery),
            config: SearchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_custom_query(mut self, custom: Arc<dyn CustomQuery>) -> Self {
        self.custom = custom;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Translate request parameters into a query for `claims`' actor.
    pub fn build_query(
        &self,
        params: &SearchParams,
        claims: &TokenClaims,
        dialect: SearchDialect,
    ) -> SearchQuery {
        let read_scope = if claims.is_admin() || claims.has_override(OverrideFlag::CanRead) {
            ReadScope::All
        } else {
            ReadScope::Actor(claims.user_id.clone())
        };
        let mut query = SearchQuery::new(read_scope);

        match dialect {
            SearchDialect::Current => self.current_predicates(params, &mut query),
            SearchDialect::Legacy => legacy_predicates(params, &mut query),
        }

        let limit = params.limit();
        query.limit = (limit >= 0).then_some(limit);
        query.offset = params.offset();

        debug!(
            subsystem = "search",
            component = "query_builder",
            dialect = ?dialect,
            predicates = query.predicates.len(),
            limit = ?query.limit,
            offset = query.offset,
            "Search query built"
        );
        query
    }

    fn current_predicates(&self, params: &SearchParams, query: &mut SearchQuery) {
        push_many(query, params.get_all("username"), Predicate::Usernames);
        push_many(query, params.get_all("userid"), Predicate::UserIds);
        push_many(query, params.get_all("tag"), Predicate::Tags);
        if let Some(source) = params.get("target_source") {
            query.push(Predicate::TargetSources(vec![source.to_string()]));
        }
        let medias: Vec<String> = params
            .get_all("media")
            .iter()
            .map(|m| capitalize(m))
            .collect();
        push_many(query, medias, Predicate::TargetMedias);
        if let Some(text) = params.get("text") {
            query.push(Predicate::Text(text.to_string()));
        }
        for predicate in self.custom.predicates(params) {
            query.push(predicate);
        }
    }

    /// Run `query`, applying the response ceiling.
    #[instrument(
        skip(self, query),
        fields(subsystem = "search", component = "engine", op = "search")
    )]
    pub async fn execute(&self, query: &SearchQuery) -> Result<SearchResult> {
        let start = Instant::now();
        let ceiling = self.config.max_response_limit;
        let fetch = match query.limit {
            Some(limit) => limit.min(ceiling),
            None => ceiling,
        };

        let total = self.store.count(query).await?;
        let rows = self.store.filter(query, query.offset, Some(fetch)).await?;
        let size = rows.len() as i64;

        debug!(
            total,
            result_count = size,
            ceiling,
            duration_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );

        Ok(SearchResult {
            rows,
            total,
            size,
            limit: query.limit.unwrap_or(-1),
            offset: query.offset,
        })
    }

    /// Parse, build, and execute in one step.
    pub async fn search(
        &self,
        params: &SearchParams,
        claims: &TokenClaims,
        dialect: SearchDialect,
    ) -> Result<SearchResult> {
        let query = self.build_query(params, claims, dialect);
        let mut result = self.execute(&query).await?;
        result.limit = params.limit();
        Ok(result)
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn push_many(query: &mut SearchQuery, values: Vec<String>, make: fn(Vec<String>) -> Predicate) {
    if !values.is_empty() {
        query.push(make(values));
    }
}

fn legacy_predicates(params: &SearchParams, query: &mut SearchQuery) {
    if let Some(uri) = params.get("uri") {
        query.push(Predicate::TargetSourceId(uri.to_string()));
    }
    let medias: Vec<String> = params
        .get_all("media")
        .iter()
        .map(|m| {
            if m.eq_ignore_ascii_case(LEGACY_COMMENT_MEDIA) {
                "Annotation".to_string()
            } else {
                capitalize(m)
            }
        })
        .collect();
    push_many(query, medias, Predicate::TargetMedias);
    if let Some(text) = params.get("text") {
        query.push(Predicate::Text(text.to_string()));
    }
    push_many(query, params.get_all("userid"), Predicate::UserIds);
    push_many(query, params.get_all("username"), Predicate::Usernames);
    if let Some(source) = params.get("source") {
        query.push(Predicate::TargetSources(vec![source.to_string()]));
    }
    if let Some(context) = params.get("contextId") {
        query.push(Predicate::ContextId(context.to_string()));
    }
    if let Some(collection) = params.get("collectionId") {
        query.push(Predicate::CollectionId(collection.to_string()));
    }
    if let Some(parent) = params.get("parentid") {
        query.push(Predicate::ReplyTo(parent.to_string()));
    }
    push_many(query, params.get_all("tag"), Predicate::Tags);
}
