//! Translate a [`SearchQuery`] into a parameterized SQL WHERE clause.

use catch_core::{Predicate, ReadScope, SearchQuery};

/// Bind parameter produced by the query builder.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    String(String),
    StringArray(Vec<String>),
}

/// Builds the WHERE clause for an annotation search.
///
/// Clauses reference the `anno` table as `a`; placeholders are numbered
/// from `$1` in binding order.
///
/// ```
/// use catch_core::{Predicate, ReadScope, SearchQuery};
/// use catch_db::query::{QueryParam, SearchQueryBuilder};
///
/// let query = SearchQuery::new(ReadScope::Actor("bob".into()))
///     .with(Predicate::ContextId("course-1".into()));
/// let (clause, params) = SearchQueryBuilder::new(&query).build();
///
/// assert_eq!(
///     clause,
///     "a.deleted = FALSE AND (cardinality(a.can_read) = 0 OR $1 = ANY(a.can_read)) AND a.context_id = $2"
/// );
/// assert_eq!(params.len(), 2);
/// ```
pub struct SearchQueryBuilder<'a> {
    query: &'a SearchQuery,
}

impl<'a> SearchQueryBuilder<'a> {
    pub fn new(query: &'a SearchQuery) -> Self {
        Self { query }
    }

    /// Returns `(where_clause, params)`.
    pub fn build(&self) -> (String, Vec<QueryParam>) {
        let mut clauses = vec!["a.deleted = FALSE".to_string()];
        let mut params = Vec::new();
        let mut idx = 0;

        let mut next = |param: QueryParam, params: &mut Vec<QueryParam>| {
            idx += 1;
            params.push(param);
            idx
        };

        if let ReadScope::Actor(actor) = &self.query.read_scope {
            let n = next(QueryParam::String(actor.clone()), &mut params);
            clauses.push(format!(
                "(cardinality(a.can_read) = 0 OR ${} = ANY(a.can_read))",
                n
            ));
        }

        for predicate in &self.query.predicates {
            let clause = match predicate {
                Predicate::Usernames(v) => {
                    let n = next(QueryParam::StringArray(v.clone()), &mut params);
                    format!("a.creator_name = ANY(${}::text[])", n)
                }
                Predicate::UserIds(v) => {
                    let n = next(QueryParam::StringArray(v.clone()), &mut params);
                    format!("a.creator_id = ANY(${}::text[])", n)
                }
                Predicate::Tags(v) => {
                    let n = next(QueryParam::StringArray(v.clone()), &mut params);
                    format!("a.tags && ${}::text[]", n)
                }
                Predicate::TargetSources(v) => {
                    let n = next(QueryParam::StringArray(v.clone()), &mut params);
                    format!("a.target_sources && ${}::text[]", n)
                }
                Predicate::TargetMedias(v) => {
                    let n = next(QueryParam::StringArray(v.clone()), &mut params);
                    format!("a.target_medias && ${}::text[]", n)
                }
                Predicate::Text(text) => {
                    let n = next(QueryParam::String(text.clone()), &mut params);
                    format!("a.body_tsv @@ plainto_tsquery('simple', ${})", n)
                }
                Predicate::PlatformName(v) => {
                    let n = next(QueryParam::String(v.clone()), &mut params);
                    format!("a.platform_name = ${}", n)
                }
                Predicate::ContextId(v) => {
                    let n = next(QueryParam::String(v.clone()), &mut params);
                    format!("a.context_id = ${}", n)
                }
                Predicate::CollectionId(v) => {
                    let n = next(QueryParam::String(v.clone()), &mut params);
                    format!("a.collection_id = ${}", n)
                }
                Predicate::TargetSourceId(v) => {
                    let n = next(QueryParam::String(v.clone()), &mut params);
                    format!("a.target_source_id = ${}", n)
                }
                Predicate::ReplyTo(v) => {
                    let n = next(QueryParam::String(v.clone()), &mut params);
                    format!("a.reply_to = ${}", n)
                }
                Predicate::PlatformExtra { key, value } => {
                    let k = next(QueryParam::String(key.clone()), &mut params);
                    let v = next(QueryParam::String(value.clone()), &mut params);
                    format!("a.raw->'platform'->>${} = ${}", k, v)
                }
            };
            clauses.push(clause);
        }

        (clauses.join(" AND "), params)
    }
}
