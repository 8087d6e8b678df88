//! Normalization and validation of canonical annotation input.

use serde_json::Value as JsonValue;
use std::collections::BTreeSet;

use crate::annojs;
use crate::defaults::CATCH_CURRENT_SCHEMA_VERSION;
use crate::error::{Error, Result};
use crate::models::{BodyPurpose, Catcha, Permissions, TargetMedia};

/// Legacy input has no `schema_version` and names its author under `user`.
pub fn is_legacy(input: &JsonValue) -> bool {
    input.get("schema_version").is_none() && input.get("user").is_some()
}

impl Catcha {
    /// Parse and validate request input into a canonical document.
    ///
    /// Legacy (AnnotatorJS) input is detected and converted first. A missing
    /// permissions block yields the default ACL for the creator.
    pub fn normalize(input: JsonValue) -> Result<Catcha> {
        if !input.is_object() {
            return Err(Error::InvalidInput(
                "annotation must be a json object".to_string(),
            ));
        }
        if is_legacy(&input) {
            return annojs::to_canonical(&input)?.validated();
        }

        let mut input = input;
        let has_permissions = input.get("permissions").is_some_and(|p| !p.is_null());
        if let Some(obj) = input.as_object_mut() {
            if let Some(id) = obj.get("id").and_then(JsonValue::as_i64) {
                obj.insert("id".to_string(), JsonValue::String(id.to_string()));
            }
            if !has_permissions {
                obj.remove("permissions");
            }
        }

        let mut catcha: Catcha = serde_json::from_value(input)
            .map_err(|e| Error::InvalidInput(format!("invalid annotation: {}", e)))?;
        if !has_permissions {
            catcha.permissions = Permissions::default_for(&catcha.creator.id);
        }
        catcha.validated()
    }

    /// Check structural rules and deduplicate lists.
    pub fn validated(mut self) -> Result<Catcha> {
        if self.kind != "Annotation" {
            return Err(invalid(&self.id, format!("type must be Annotation, got {}", self.kind)));
        }
        if self.schema_version != CATCH_CURRENT_SCHEMA_VERSION {
            return Err(invalid(
                &self.id,
                format!("unsupported schema_version({})", self.schema_version),
            ));
        }
        if self.creator.id.trim().is_empty() {
            return Err(invalid(&self.id, "missing creator id".to_string()));
        }
        if self.target.items.is_empty() {
            return Err(invalid(&self.id, "missing target items".to_string()));
        }
        if self.target.items.iter().any(|t| t.source.trim().is_empty()) {
            return Err(invalid(&self.id, "target item without source".to_string()));
        }

        let replies = self
            .target
            .items
            .iter()
            .filter(|t| t.media == TargetMedia::Annotation)
            .count();
        if replies > 0 && self.target.items.len() != 1 {
            return Err(invalid(
                &self.id,
                "reply must target exactly one annotation".to_string(),
            ));
        }

        if self
            .body
            .items
            .iter()
            .any(|b| b.purpose == BodyPurpose::Tagging && b.value.trim().is_empty())
        {
            return Err(invalid(&self.id, "empty tag".to_string()));
        }

        let mut seen_tags = BTreeSet::new();
        self.body.items.retain(|b| {
            b.purpose != BodyPurpose::Tagging || seen_tags.insert(b.value.clone())
        });
        self.permissions.dedup();
        Ok(self)
    }
}

fn invalid(id: &str, msg: String) -> Error {
    if id.is_empty() {
        Error::InvalidInput(msg)
    } else {
        Error::InvalidInput(format!("anno({}): {}", id, msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical() -> JsonValue {
        json!({
            "@context": "http://catchpy.harvardx.harvard.edu.s3.amazonaws.com/jsonld/catch_context_jsonld.json",
            "type": "Annotation",
            "schema_version": "catch_v2.0",
            "id": "c1",
            "creator": {"id": "alice", "name": "Alice"},
            "permissions": {
                "can_read": ["alice", "alice"],
                "can_update": ["alice"],
                "can_delete": ["alice"],
                "can_admin": ["alice"]
            },
            "body": {"type": "List", "items": [
                {"type": "TextualBody", "purpose": "commenting", "value": "hi"},
                {"type": "TextualBody", "purpose": "tagging", "value": "x"},
                {"type": "TextualBody", "purpose": "tagging", "value": "x"}
            ]},
            "target": {"type": "List", "items": [
                {"type": "Text", "source": "http://example.com"}
            ]}
        })
    }

    #[test]
    fn test_normalize_dedups() {
        let c = Catcha::normalize(canonical()).unwrap();
        assert_eq!(c.permissions.can_read, vec!["alice"]);
        assert_eq!(c.tags(), vec!["x"]);
    }

    #[test]
    fn test_normalize_default_permissions() {
        let mut input = canonical();
        input.as_object_mut().unwrap().remove("permissions");
        let c = Catcha::normalize(input).unwrap();
        assert_eq!(c.permissions, Permissions::default_for("alice"));
    }

    #[test]
    fn test_normalize_numeric_id() {
        let mut input = canonical();
        input["id"] = json!(42);
        assert_eq!(Catcha::normalize(input).unwrap().id, "42");
    }

    #[test]
    fn test_normalize_rejects_missing_target() {
        let mut input = canonical();
        input["target"]["items"] = json!([]);
        let err = Catcha::normalize(input).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_normalize_rejects_bad_schema_version() {
        let mut input = canonical();
        input["schema_version"] = json!("catch_v1.0");
        assert!(Catcha::normalize(input).is_err());
    }

    #[test]
    fn test_normalize_rejects_missing_creator() {
        let mut input = canonical();
        input.as_object_mut().unwrap().remove("creator");
        assert!(Catcha::normalize(input).is_err());
    }

    #[test]
    fn test_normalize_rejects_mixed_reply_target() {
        let mut input = canonical();
        input["target"]["items"] = json!([
            {"type": "Annotation", "source": "p1"},
            {"type": "Text", "source": "http://example.com"}
        ]);
        assert!(Catcha::normalize(input).is_err());
    }

    #[test]
    fn test_normalize_rejects_non_object() {
        assert!(Catcha::normalize(json!([1, 2])).is_err());
    }

    #[test]
    fn test_normalize_detects_legacy() {
        let legacy = json!({
            "id": 7,
            "user": {"id": "bob", "name": "Bob"},
            "media": "text",
            "uri": "http://example.com",
            "text": "legacy",
            "tags": []
        });
        let c = Catcha::normalize(legacy).unwrap();
        assert_eq!(c.id, "7");
        assert_eq!(c.creator.id, "bob");
        assert_eq!(c.body_text(), "legacy");
    }
}
