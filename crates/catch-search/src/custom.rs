//! Extension point for platform-specific search filters.

use catch_core::Predicate;

use crate::params::SearchParams;

/// Prefix for ad-hoc filters on free-form platform keys.
pub const PLATFORM_KEY_PREFIX: &str = "platform.";

/// Contributes extra predicates to current-dialect searches.
pub trait CustomQuery: Send + Sync {
    fn predicates(&self, params: &SearchParams) -> Vec<Predicate>;
}

/// Default platform filters.
///
/// | Parameter            | Field                        |
/// |----------------------|------------------------------|
/// | `platform`           | `platform.platform_name`     |
/// | `context_id`         | `platform.context_id`        |
/// | `collection_id`      | `platform.collection_id`     |
/// | `source_id`          | `platform.target_source_id`  |
/// | `platform.<key>`     | `platform.<key>`             |
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformQuery;

impl CustomQuery for PlatformQuery {
    fn predicates(&self, params: &SearchParams) -> Vec<Predicate> {
        let mut out = Vec::new();
        if let Some(v) = params.get("platform") {
            out.push(Predicate::PlatformName(v.to_string()));
        }
        if let Some(v) = params.get("context_id") {
            out.push(Predicate::ContextId(v.to_string()));
        }
        if let Some(v) = params.get("collection_id") {
            out.push(Predicate::CollectionId(v.to_string()));
        }
        if let Some(v) = params.get("source_id") {
            out.push(Predicate::TargetSourceId(v.to_string()));
        }
        for (key, value) in params.iter() {
            if let Some(field) = key.strip_prefix(PLATFORM_KEY_PREFIX) {
                if !field.is_empty() && !value.is_empty() {
                    out.push(Predicate::PlatformExtra {
                        key: field.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_query() {
        let params = SearchParams::from_pairs([
            ("context_id", "c1"),
            ("collection_id", "k1"),
            ("source_id", "s1"),
            ("platform.course_tag", "spring"),
            ("unrelated", "x"),
        ]);
        let preds = PlatformQuery.predicates(&params);
        assert_eq!(
            preds,
            vec![
                Predicate::ContextId("c1".into()),
                Predicate::CollectionId("k1".into()),
                Predicate::TargetSourceId("s1".into()),
                Predicate::PlatformExtra {
                    key: "course_tag".into(),
                    value: "spring".into()
                },
            ]
        );
    }
}
