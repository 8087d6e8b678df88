//! In-memory annotation store for tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use catch_core::{Annotation, AnnotationStore, Error, Result, SearchQuery};

/// [`AnnotationStore`] backed by a map behind an async `RwLock`.
///
/// Uniqueness is checked under the write lock, so concurrent inserts of the
/// same id resolve to exactly one success.
#[derive(Debug, Default)]
pub struct MemoryAnnotationStore {
    records: RwLock<HashMap<String, Annotation>>,
}

impl MemoryAnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, soft-deleted ones included.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn live_replies(records: &HashMap<String, Annotation>, id: &str) -> i64 {
    records
        .values()
        .filter(|a| !a.deleted && a.reply_to.as_deref() == Some(id))
        .count() as i64
}

fn with_replies(records: &HashMap<String, Annotation>, anno: &Annotation) -> Annotation {
    let mut anno = anno.clone();
    anno.total_replies = live_replies(records, &anno.id);
    anno
}

#[async_trait]
impl AnnotationStore for MemoryAnnotationStore {
    async fn get(&self, id: &str) -> Result<Option<Annotation>> {
        let records = self.records.read().await;
        Ok(records.get(id).map(|a| with_replies(&records, a)))
    }

    async fn insert(&self, anno: &Annotation) -> Result<Annotation> {
        let mut records = self.records.write().await;
        if records.contains_key(&anno.id) {
            return Err(Error::DuplicateAnnotationId(format!(
                "anno({}): already exists, failed to create",
                anno.id
            )));
        }
        records.insert(anno.id.clone(), anno.clone());
        tracing::trace!(
            subsystem = "database",
            component = "memory_store",
            op = "insert",
            anno_id = %anno.id,
            "Annotation inserted"
        );
        Ok(with_replies(&records, anno))
    }

    async fn save(&self, anno: &Annotation) -> Result<Annotation> {
        let mut records = self.records.write().await;
        match records.get_mut(&anno.id) {
            Some(existing) => *existing = anno.clone(),
            None => {
                return Err(Error::MissingAnnotation(format!(
                    "anno({}) not found",
                    anno.id
                )))
            }
        }
        Ok(with_replies(&records, anno))
    }

    async fn filter(
        &self,
        query: &SearchQuery,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Annotation>> {
        let records = self.records.read().await;
        let mut matches: Vec<&Annotation> = records.values().filter(|a| query.matches(a)).collect();
        matches.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.id.cmp(&b.id)));

        let skip = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let take = match limit {
            Some(n) => usize::try_from(n.max(0)).unwrap_or(usize::MAX),
            None => usize::MAX,
        };
        Ok(matches
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|a| with_replies(&records, a))
            .collect())
    }

    async fn count(&self, query: &SearchQuery) -> Result<i64> {
        let records = self.records.read().await;
        Ok(records.values().filter(|a| query.matches(a)).count() as i64)
    }
}
