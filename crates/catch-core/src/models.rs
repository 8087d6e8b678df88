//! Core data models for the catch annotation store.
//!
//! [`Catcha`] is the canonical wire representation; [`Annotation`] is the
//! stored record, carrying the canonical document verbatim in `raw` plus the
//! derived columns the search layer filters on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::defaults::{
    ANNOTATORJS_FORMAT, CATCH_ANNO_FORMAT, CATCH_CURRENT_SCHEMA_VERSION, CATCH_JSONLD_CONTEXT_IRI,
};
use crate::error::Error;
use crate::permissions::Operation;

// =============================================================================
// IDENTITY & PERMISSIONS
// =============================================================================

/// Author of an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Per-record access control lists.
///
/// An empty `can_read` means the record is world-readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub can_read: Vec<String>,
    #[serde(default)]
    pub can_update: Vec<String>,
    #[serde(default)]
    pub can_delete: Vec<String>,
    #[serde(default)]
    pub can_admin: Vec<String>,
}

impl Permissions {
    /// Default ACL for a new record: world-readable, everything else owned
    /// by `user`.
    pub fn default_for(user: &str) -> Self {
        Self {
            can_read: Vec::new(),
            can_update: vec![user.to_string()],
            can_delete: vec![user.to_string()],
            can_admin: vec![user.to_string()],
        }
    }

    /// Remove duplicate entries, keeping first occurrence order.
    pub fn dedup(&mut self) {
        for list in [
            &mut self.can_read,
            &mut self.can_update,
            &mut self.can_delete,
            &mut self.can_admin,
        ] {
            dedup_preserving_order(list);
        }
    }

    /// ACL list governing `op`.
    pub fn list_for(&self, op: Operation) -> &[String] {
        match op {
            Operation::Read => &self.can_read,
            Operation::Update => &self.can_update,
            Operation::Delete => &self.can_delete,
            Operation::Admin => &self.can_admin,
        }
    }

    /// Order-insensitive comparison of all four lists.
    pub fn same_grants(&self, other: &Permissions) -> bool {
        fn set(list: &[String]) -> BTreeSet<&str> {
            list.iter().map(String::as_str).collect()
        }
        set(&self.can_read) == set(&other.can_read)
            && set(&self.can_update) == set(&other.can_update)
            && set(&self.can_delete) == set(&other.can_delete)
            && set(&self.can_admin) == set(&other.can_admin)
    }
}

pub(crate) fn dedup_preserving_order(list: &mut Vec<String>) {
    let mut seen = BTreeSet::new();
    list.retain(|item| seen.insert(item.clone()));
}

// =============================================================================
// PLATFORM
// =============================================================================

/// Hosting-platform context for an annotation.
///
/// Unknown keys are kept in `extra` so custom search extensions can filter
/// on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_source_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

// =============================================================================
// BODY
// =============================================================================

/// Role of a body item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyPurpose {
    Commenting,
    Tagging,
    Replying,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyItem {
    #[serde(rename = "type", default = "textual_body")]
    pub kind: String,
    pub purpose: BodyPurpose,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl BodyItem {
    pub fn new(purpose: BodyPurpose, value: impl Into<String>) -> Self {
        Self {
            kind: textual_body(),
            purpose,
            value: value.into(),
            format: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    #[serde(rename = "type", default = "list_kind")]
    pub kind: String,
    #[serde(default)]
    pub items: Vec<BodyItem>,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            kind: list_kind(),
            items: Vec::new(),
        }
    }
}

// =============================================================================
// TARGET
// =============================================================================

/// Media type of a target item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetMedia {
    Text,
    Image,
    Video,
    Audio,
    Thumbnail,
    Annotation,
}

impl TargetMedia {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetMedia::Text => "Text",
            TargetMedia::Image => "Image",
            TargetMedia::Video => "Video",
            TargetMedia::Audio => "Audio",
            TargetMedia::Thumbnail => "Thumbnail",
            TargetMedia::Annotation => "Annotation",
        }
    }

    /// Media that can be the primary subject of an annotation.
    pub fn is_primary(&self) -> bool {
        !matches!(self, TargetMedia::Thumbnail)
    }
}

impl fmt::Display for TargetMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetItem {
    #[serde(rename = "type")]
    pub media: TargetMedia,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "type", default = "list_kind")]
    pub kind: String,
    #[serde(default)]
    pub items: Vec<TargetItem>,
}

fn textual_body() -> String {
    "TextualBody".to_string()
}

fn list_kind() -> String {
    "List".to_string()
}

// =============================================================================
// CANONICAL DOCUMENT
// =============================================================================

/// Canonical annotation document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catcha {
    #[serde(rename = "@context", default = "default_context")]
    pub context: String,
    #[serde(rename = "type", default = "default_anno_type")]
    pub kind: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    pub creator: Creator,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub body: Body,
    pub target: Target,
}

fn default_context() -> String {
    CATCH_JSONLD_CONTEXT_IRI.to_string()
}

fn default_anno_type() -> String {
    "Annotation".to_string()
}

fn default_schema_version() -> String {
    CATCH_CURRENT_SCHEMA_VERSION.to_string()
}

impl Catcha {
    /// Text of the first commenting body item, or empty.
    pub fn body_text(&self) -> String {
        self.body
            .items
            .iter()
            .find(|b| b.purpose == BodyPurpose::Commenting)
            .map(|b| b.value.clone())
            .unwrap_or_default()
    }

    /// Values of all tagging body items.
    pub fn tags(&self) -> Vec<String> {
        self.body
            .items
            .iter()
            .filter(|b| b.purpose == BodyPurpose::Tagging)
            .map(|b| b.value.clone())
            .collect()
    }

    /// Parent annotation id when this is a reply.
    pub fn reply_to(&self) -> Option<String> {
        self.target
            .items
            .iter()
            .find(|t| t.media == TargetMedia::Annotation)
            .map(|t| t.source.clone())
    }
}

// =============================================================================
// STORED RECORD
// =============================================================================

/// Stored annotation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub schema_version: String,
    pub creator_id: String,
    pub creator_name: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub permissions: Permissions,
    pub body_text: String,
    pub tags: Vec<String>,
    pub target_sources: Vec<String>,
    pub target_medias: Vec<String>,
    pub platform_name: Option<String>,
    pub context_id: Option<String>,
    pub collection_id: Option<String>,
    pub target_source_id: Option<String>,
    pub reply_to: Option<String>,
    pub deleted: bool,
    /// Count of live replies, filled in by the store on read.
    pub total_replies: i64,
    pub raw: Catcha,
}

impl Annotation {
    /// Build a record from a normalized document, stamping both timestamps
    /// onto the raw document as well.
    pub fn new(mut raw: Catcha, created: DateTime<Utc>, modified: DateTime<Utc>) -> Self {
        raw.created = Some(created);
        raw.modified = Some(modified);
        Self {
            id: raw.id.clone(),
            schema_version: raw.schema_version.clone(),
            creator_id: raw.creator.id.clone(),
            creator_name: raw.creator.name.clone(),
            created,
            modified,
            permissions: raw.permissions.clone(),
            body_text: raw.body_text(),
            tags: raw.tags(),
            target_sources: raw.target.items.iter().map(|t| t.source.clone()).collect(),
            target_medias: raw
                .target
                .items
                .iter()
                .map(|t| t.media.as_str().to_string())
                .collect(),
            platform_name: raw.platform.platform_name.clone(),
            context_id: raw.platform.context_id.clone(),
            collection_id: raw.platform.collection_id.clone(),
            target_source_id: raw.platform.target_source_id.clone(),
            reply_to: raw.reply_to(),
            deleted: false,
            total_replies: 0,
            raw,
        }
    }

    /// Mark as deleted; the row stays in storage.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        self.deleted = true;
        self.modified = now;
        self.raw.modified = Some(now);
    }

    pub fn is_reply(&self) -> bool {
        self.reply_to.is_some()
    }

    /// Canonical JSON for responses, with the reply count attached.
    pub fn serialized(&self) -> crate::Result<JsonValue> {
        let mut value = serde_json::to_value(&self.raw)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("totalReplies".to_string(), self.total_replies.into());
        }
        Ok(value)
    }
}

// =============================================================================
// RESPONSE FORMAT
// =============================================================================

/// Output representation selected per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Catcha,
    AnnotatorJs,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Catcha => CATCH_ANNO_FORMAT,
            ResponseFormat::AnnotatorJs => ANNOTATORJS_FORMAT,
        }
    }
}

impl FromStr for ResponseFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            CATCH_ANNO_FORMAT => Ok(ResponseFormat::Catcha),
            ANNOTATORJS_FORMAT => Ok(ResponseFormat::AnnotatorJs),
            other => Err(Error::UnknownResponseFormat(format!(
                "unknown response format({})",
                other
            ))),
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_catcha() -> Catcha {
        serde_json::from_value(json!({
            "id": "anno-1",
            "creator": {"id": "alice", "name": "Alice"},
            "permissions": {
                "can_read": [],
                "can_update": ["alice"],
                "can_delete": ["alice"],
                "can_admin": ["alice"]
            },
            "platform": {"platform_name": "hxat", "context_id": "course-1", "extra_key": 7},
            "body": {"type": "List", "items": [
                {"type": "TextualBody", "purpose": "commenting", "value": "nice"},
                {"type": "TextualBody", "purpose": "tagging", "value": "t1"},
                {"type": "TextualBody", "purpose": "tagging", "value": "t2"}
            ]},
            "target": {"type": "List", "items": [
                {"type": "Text", "source": "http://example.com/doc"}
            ]}
        }))
        .unwrap()
    }

    #[test]
    fn test_catcha_defaults_filled() {
        let c = sample_catcha();
        assert_eq!(c.kind, "Annotation");
        assert_eq!(c.schema_version, CATCH_CURRENT_SCHEMA_VERSION);
        assert_eq!(c.context, CATCH_JSONLD_CONTEXT_IRI);
        assert_eq!(c.platform.extra.get("extra_key"), Some(&json!(7)));
    }

    #[test]
    fn test_annotation_derives_columns() {
        let now = Utc::now();
        let anno = Annotation::new(sample_catcha(), now, now);
        assert_eq!(anno.creator_id, "alice");
        assert_eq!(anno.body_text, "nice");
        assert_eq!(anno.tags, vec!["t1", "t2"]);
        assert_eq!(anno.target_medias, vec!["Text"]);
        assert_eq!(anno.context_id.as_deref(), Some("course-1"));
        assert_eq!(anno.raw.created, Some(now));
        assert!(!anno.is_reply());
        assert!(!anno.deleted);
    }

    #[test]
    fn test_soft_delete_keeps_record() {
        let now = Utc::now();
        let mut anno = Annotation::new(sample_catcha(), now, now);
        let later = now + chrono::Duration::seconds(5);
        anno.soft_delete(later);
        assert!(anno.deleted);
        assert_eq!(anno.modified, later);
        assert_eq!(anno.created, now);
    }

    #[test]
    fn test_serialized_includes_reply_count() {
        let now = Utc::now();
        let mut anno = Annotation::new(sample_catcha(), now, now);
        anno.total_replies = 3;
        let value = anno.serialized().unwrap();
        assert_eq!(value["totalReplies"], json!(3));
        assert_eq!(value["platform"]["extra_key"], json!(7));
        assert_eq!(value["id"], json!("anno-1"));
    }

    #[test]
    fn test_permissions_dedup_preserves_order() {
        let mut p = Permissions {
            can_read: vec!["b".into(), "a".into(), "b".into()],
            ..Default::default()
        };
        p.dedup();
        assert_eq!(p.can_read, vec!["b", "a"]);
    }

    #[test]
    fn test_permissions_same_grants_ignores_order() {
        let a = Permissions {
            can_update: vec!["x".into(), "y".into()],
            ..Default::default()
        };
        let b = Permissions {
            can_update: vec!["y".into(), "x".into()],
            ..Default::default()
        };
        assert!(a.same_grants(&b));
        assert!(!a.same_grants(&Permissions::default_for("x")));
    }

    #[test]
    fn test_response_format_parse() {
        assert_eq!(
            "ANNOTATORJS_FORMAT".parse::<ResponseFormat>().unwrap(),
            ResponseFormat::AnnotatorJs
        );
        assert_eq!(
            "CATCH_ANNO_FORMAT".parse::<ResponseFormat>().unwrap(),
            ResponseFormat::Catcha
        );
        let err = "HTML".parse::<ResponseFormat>().unwrap_err();
        assert_eq!(err.status(), 400);
    }
}
