//! Search query model.
//!
//! A [`SearchQuery`] is built once per request from parameters and claims,
//! handed to the store, and discarded. Predicates are ANDed together;
//! multi-valued predicates match when any of their values matches. Sorting
//! is always by creation time, most recent first.

use std::collections::BTreeSet;

use crate::models::Annotation;

/// Parameter dialect of a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDialect {
    Current,
    Legacy,
}

/// Which records the actor may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadScope {
    /// Admin or `CAN_READ` override.
    All,
    /// World-readable records plus records whose `can_read` lists the actor.
    Actor(String),
}

/// One filter predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Usernames(Vec<String>),
    UserIds(Vec<String>),
    Tags(Vec<String>),
    TargetSources(Vec<String>),
    TargetMedias(Vec<String>),
    /// Every term must appear in the commenting text (case-insensitive).
    Text(String),
    PlatformName(String),
    ContextId(String),
    CollectionId(String),
    TargetSourceId(String),
    ReplyTo(String),
    /// Equality on a free-form platform key.
    PlatformExtra { key: String, value: String },
}

impl Predicate {
    pub fn matches(&self, anno: &Annotation) -> bool {
        match self {
            Predicate::Usernames(names) => names.contains(&anno.creator_name),
            Predicate::UserIds(ids) => ids.contains(&anno.creator_id),
            Predicate::Tags(tags) => tags.iter().any(|t| anno.tags.contains(t)),
            Predicate::TargetSources(sources) => {
                sources.iter().any(|s| anno.target_sources.contains(s))
            }
            Predicate::TargetMedias(medias) => {
                medias.iter().any(|m| anno.target_medias.contains(m))
            }
            Predicate::Text(text) => {
                let words = text_terms(&anno.body_text);
                text_terms(text).iter().all(|t| words.contains(t))
            }
            Predicate::PlatformName(v) => anno.platform_name.as_deref() == Some(v.as_str()),
            Predicate::ContextId(v) => anno.context_id.as_deref() == Some(v.as_str()),
            Predicate::CollectionId(v) => anno.collection_id.as_deref() == Some(v.as_str()),
            Predicate::TargetSourceId(v) => {
                anno.target_source_id.as_deref() == Some(v.as_str())
            }
            Predicate::ReplyTo(v) => anno.reply_to.as_deref() == Some(v.as_str()),
            Predicate::PlatformExtra { key, value } => {
                match anno.raw.platform.extra.get(key) {
                    Some(serde_json::Value::String(s)) => s == value,
                    Some(other) => other.to_string() == *value,
                    None => false,
                }
            }
        }
    }
}

/// Lowercased alphanumeric words, the same tokenization the full-text
/// index applies.
pub fn text_terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Filtered, paginated search over annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub read_scope: ReadScope,
    pub predicates: Vec<Predicate>,
    /// `None` means unbounded.
    pub limit: Option<i64>,
    pub offset: i64,
}

impl SearchQuery {
    pub fn new(read_scope: ReadScope) -> Self {
        Self {
            read_scope,
            predicates: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    /// Whether `anno` passes the base exclusions and every predicate.
    ///
    /// Stores that cannot push filters down evaluate records with this.
    pub fn matches(&self, anno: &Annotation) -> bool {
        if anno.deleted {
            return false;
        }
        if let ReadScope::Actor(actor) = &self.read_scope {
            let readers = &anno.permissions.can_read;
            if !readers.is_empty() && !readers.contains(actor) {
                return false;
            }
        }
        self.predicates.iter().all(|p| p.matches(anno))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Catcha, Permissions};
    use chrono::Utc;
    use serde_json::json;

    fn anno(id: &str, user: &str, can_read: &[&str], text: &str, tags: &[&str]) -> Annotation {
        let mut items = vec![json!({"type": "TextualBody", "purpose": "commenting", "value": text})];
        for t in tags {
            items.push(json!({"type": "TextualBody", "purpose": "tagging", "value": t}));
        }
        let mut catcha: Catcha = serde_json::from_value(json!({
            "id": id,
            "creator": {"id": user, "name": format!("{} name", user)},
            "platform": {"context_id": "ctx", "course_tag": "spring"},
            "body": {"type": "List", "items": items},
            "target": {"items": [{"type": "Video", "source": "http://v"}]}
        }))
        .unwrap();
        catcha.permissions = Permissions {
            can_read: can_read.iter().map(|s| s.to_string()).collect(),
            ..Permissions::default_for(user)
        };
        let now = Utc::now();
        Annotation::new(catcha, now, now)
    }

    #[test]
    fn test_read_scope_filters_private() {
        let public = anno("1", "a", &[], "x", &[]);
        let private = anno("2", "a", &["a"], "x", &[]);
        let q = SearchQuery::new(ReadScope::Actor("b".into()));
        assert!(q.matches(&public));
        assert!(!q.matches(&private));
        assert!(SearchQuery::new(ReadScope::All).matches(&private));
    }

    #[test]
    fn test_deleted_always_excluded() {
        let mut a = anno("1", "a", &[], "x", &[]);
        a.soft_delete(Utc::now());
        assert!(!SearchQuery::new(ReadScope::All).matches(&a));
    }

    #[test]
    fn test_predicates_and_together() {
        let a = anno("1", "a", &[], "The quick brown fox", &["animals", "fast"]);
        let q = SearchQuery::new(ReadScope::All)
            .with(Predicate::Tags(vec!["slow".into(), "fast".into()]))
            .with(Predicate::Text("QUICK fox".into()))
            .with(Predicate::TargetMedias(vec!["Video".into()]));
        assert!(q.matches(&a));

        let q = q.with(Predicate::UserIds(vec!["z".into()]));
        assert!(!q.matches(&a));
    }

    #[test]
    fn test_text_requires_all_terms() {
        let a = anno("1", "a", &[], "The quick brown fox", &[]);
        assert!(!Predicate::Text("quick cat".into()).matches(&a));
        assert!(Predicate::Text("brown".into()).matches(&a));
    }

    #[test]
    fn test_platform_predicates() {
        let a = anno("1", "a", &[], "x", &[]);
        assert!(Predicate::ContextId("ctx".into()).matches(&a));
        assert!(!Predicate::CollectionId("ctx".into()).matches(&a));
        assert!(Predicate::PlatformExtra {
            key: "course_tag".into(),
            value: "spring".into()
        }
        .matches(&a));
        assert!(Predicate::Usernames(vec!["a name".into()]).matches(&a));
    }
}
