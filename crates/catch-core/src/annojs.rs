//! Conversion between the legacy AnnotatorJS format and the canonical one.
//!
//! The legacy format is flat: one `media` kind, one `uri`, a `text` comment,
//! a `tags` list and media-specific anchoring fields (`ranges` and `quote`
//! for text, `rangeTime` for video/audio, `rangePosition` and `thumb` for
//! images). Replies use `media: "comment"` and name the annotated record in
//! `parent`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};

use crate::defaults::{
    CATCH_CURRENT_SCHEMA_VERSION, CATCH_JSONLD_CONTEXT_IRI, LEGACY_NO_PARENT, MEDIA_FRAGMENTS_IRI,
    TEXTUAL_BODY_FORMAT,
};
use crate::error::{Error, Result};
use crate::models::{
    Annotation, Body, BodyItem, BodyPurpose, Catcha, Creator, Permissions, Platform, Target,
    TargetItem, TargetMedia,
};

// =============================================================================
// LEGACY -> CANONICAL
// =============================================================================

/// Convert a legacy record into a canonical document.
///
/// The result still needs [`Catcha::validated`]; this only maps fields.
pub fn to_canonical(legacy: &JsonValue) -> Result<Catcha> {
    let obj = legacy
        .as_object()
        .ok_or_else(|| Error::InvalidInput("annotation must be a json object".to_string()))?;

    let id = obj.get("id").and_then(scalar_string).unwrap_or_default();

    let user = obj
        .get("user")
        .and_then(JsonValue::as_object)
        .ok_or_else(|| invalid(&id, "missing user"))?;
    let user_id = user
        .get("id")
        .and_then(scalar_string)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| invalid(&id, "missing user id"))?;
    let creator = Creator {
        id: user_id.clone(),
        name: user
            .get("name")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string(),
    };

    let permissions = match obj.get("permissions").and_then(JsonValue::as_object) {
        Some(p) => Permissions {
            can_read: string_list(p.get("read")),
            can_update: string_list(p.get("update")),
            can_delete: string_list(p.get("delete")),
            can_admin: string_list(p.get("admin")),
        },
        None => Permissions::default_for(&user_id),
    };

    let media_name = obj
        .get("media")
        .and_then(JsonValue::as_str)
        .unwrap_or("text")
        .to_ascii_lowercase();
    let media = legacy_media(&media_name).ok_or_else(|| {
        invalid(&id, &format!("unsupported media({})", media_name))
    })?;

    let uri = obj
        .get("uri")
        .and_then(scalar_string)
        .filter(|u| !u.is_empty());

    let platform = Platform {
        platform_name: obj.get("platform").and_then(scalar_string),
        context_id: obj.get("contextId").and_then(scalar_string),
        collection_id: obj.get("collectionId").and_then(scalar_string),
        target_source_id: uri.clone(),
        extra: Map::new(),
    };

    let body = Body {
        items: legacy_body(&id, obj)?,
        ..Body::default()
    };

    let target_items = if media == TargetMedia::Annotation {
        let parent = obj
            .get("parent")
            .and_then(scalar_string)
            .filter(|p| !p.is_empty() && p != LEGACY_NO_PARENT)
            .ok_or_else(|| invalid(&id, "comment without parent"))?;
        vec![TargetItem {
            media,
            source: parent,
            format: None,
            selector: None,
        }]
    } else {
        let source = uri.ok_or_else(|| invalid(&id, "missing uri"))?;
        let mut items = vec![TargetItem {
            media,
            source,
            format: None,
            selector: legacy_selector(media, obj),
        }];
        if media == TargetMedia::Image {
            if let Some(thumb) = obj.get("thumb").and_then(JsonValue::as_str) {
                if !thumb.is_empty() {
                    items.push(TargetItem {
                        media: TargetMedia::Thumbnail,
                        source: thumb.to_string(),
                        format: None,
                        selector: None,
                    });
                }
            }
        }
        items
    };

    Ok(Catcha {
        context: CATCH_JSONLD_CONTEXT_IRI.to_string(),
        kind: "Annotation".to_string(),
        schema_version: CATCH_CURRENT_SCHEMA_VERSION.to_string(),
        id,
        created: obj.get("created").and_then(parse_timestamp),
        modified: obj.get("updated").and_then(parse_timestamp),
        creator,
        permissions,
        platform,
        body,
        target: Target {
            kind: "List".to_string(),
            items: target_items,
        },
    })
}

fn legacy_media(name: &str) -> Option<TargetMedia> {
    match name {
        "text" => Some(TargetMedia::Text),
        "image" => Some(TargetMedia::Image),
        "video" => Some(TargetMedia::Video),
        "audio" => Some(TargetMedia::Audio),
        "comment" => Some(TargetMedia::Annotation),
        _ => None,
    }
}

fn legacy_body(id: &str, obj: &Map<String, JsonValue>) -> Result<Vec<BodyItem>> {
    let mut items = Vec::new();
    match obj.get("text") {
        None | Some(JsonValue::Null) => {}
        Some(JsonValue::String(text)) => {
            let mut item = BodyItem::new(BodyPurpose::Commenting, text.clone());
            item.format = Some(TEXTUAL_BODY_FORMAT.to_string());
            items.push(item);
        }
        Some(_) => return Err(invalid(id, "text must be a string")),
    }
    match obj.get("tags") {
        None | Some(JsonValue::Null) => {}
        Some(JsonValue::Array(tags)) => {
            for tag in tags {
                let tag = tag
                    .as_str()
                    .ok_or_else(|| invalid(id, "tags must be a list of strings"))?;
                items.push(BodyItem::new(BodyPurpose::Tagging, tag));
            }
        }
        Some(_) => return Err(invalid(id, "tags must be a list of strings")),
    }
    Ok(items)
}

fn legacy_selector(media: TargetMedia, obj: &Map<String, JsonValue>) -> Option<JsonValue> {
    let selectors: Vec<JsonValue> = match media {
        TargetMedia::Text => {
            let mut out: Vec<JsonValue> = obj
                .get("ranges")
                .and_then(JsonValue::as_array)
                .map(|ranges| ranges.iter().filter_map(range_selector).collect())
                .unwrap_or_default();
            if let Some(quote) = obj.get("quote").and_then(JsonValue::as_str) {
                if !quote.is_empty() {
                    out.push(json!({"type": "TextQuoteSelector", "exact": quote}));
                }
            }
            out
        }
        TargetMedia::Video | TargetMedia::Audio => obj
            .get("rangeTime")
            .and_then(JsonValue::as_object)
            .map(|rt| {
                let start = number_text(rt.get("start"));
                let end = number_text(rt.get("end"));
                vec![fragment(format!("t={},{}", start, end))]
            })
            .unwrap_or_default(),
        TargetMedia::Image => match obj.get("rangePosition") {
            Some(JsonValue::String(svg)) if !svg.is_empty() => {
                vec![json!({"type": "SvgSelector", "value": svg})]
            }
            Some(JsonValue::Object(pos)) => {
                let parts: Vec<String> = ["x", "y", "width", "height"]
                    .iter()
                    .map(|k| number_text(pos.get(*k)))
                    .collect();
                vec![fragment(format!("xywh={}", parts.join(",")))]
            }
            _ => Vec::new(),
        },
        TargetMedia::Thumbnail | TargetMedia::Annotation => Vec::new(),
    };

    match selectors.len() {
        0 => None,
        1 => selectors.into_iter().next(),
        _ => Some(json!({"type": "Choice", "items": selectors})),
    }
}

fn range_selector(range: &JsonValue) -> Option<JsonValue> {
    let r = range.as_object()?;
    Some(json!({
        "type": "RangeSelector",
        "startSelector": {"type": "XPathSelector", "value": r.get("start").cloned().unwrap_or_default()},
        "endSelector": {"type": "XPathSelector", "value": r.get("end").cloned().unwrap_or_default()},
        "refinedBy": [{
            "type": "TextPositionSelector",
            "start": r.get("startOffset").cloned().unwrap_or_default(),
            "end": r.get("endOffset").cloned().unwrap_or_default(),
        }],
    }))
}

fn fragment(value: String) -> JsonValue {
    json!({
        "type": "FragmentSelector",
        "conformsTo": MEDIA_FRAGMENTS_IRI,
        "value": value,
    })
}

// =============================================================================
// CANONICAL -> LEGACY
// =============================================================================

/// Convert a stored record into the legacy format.
///
/// Fails with [`Error::FormatConversion`] when the record cannot be
/// expressed as a single flat legacy record.
pub fn to_legacy(anno: &Annotation) -> Result<JsonValue> {
    let fail = |msg: &str| Error::FormatConversion(format!("anno({}): {}", anno.id, msg));

    let items = &anno.raw.target.items;
    if items.is_empty() {
        return Err(fail("no target to convert"));
    }
    let primary: Vec<&TargetItem> = items.iter().filter(|t| t.media.is_primary()).collect();
    let thumbs: Vec<&TargetItem> = items
        .iter()
        .filter(|t| t.media == TargetMedia::Thumbnail)
        .collect();

    let target = match primary.as_slice() {
        [] => return Err(fail("unsupported media Thumbnail without primary target")),
        [one] => *one,
        many => {
            if many.iter().any(|t| t.media != many[0].media) {
                return Err(fail("mixed target media"));
            }
            return Err(fail("multiple targets"));
        }
    };
    if thumbs.len() > 1 {
        return Err(fail("multiple thumbnails"));
    }
    if !thumbs.is_empty() && target.media != TargetMedia::Image {
        return Err(fail("thumbnail on non-image target"));
    }
    let comments = anno
        .raw
        .body
        .items
        .iter()
        .filter(|b| b.purpose == BodyPurpose::Commenting)
        .count();
    if comments > 1 {
        return Err(fail("multiple commenting bodies"));
    }

    let mut out = Map::new();
    out.insert("id".into(), anno.id.clone().into());
    out.insert("created".into(), timestamp(anno.created).into());
    out.insert("updated".into(), timestamp(anno.modified).into());
    out.insert(
        "user".into(),
        json!({"id": anno.creator_id, "name": anno.creator_name}),
    );
    out.insert(
        "permissions".into(),
        json!({
            "read": anno.permissions.can_read,
            "update": anno.permissions.can_update,
            "delete": anno.permissions.can_delete,
            "admin": anno.permissions.can_admin,
        }),
    );
    out.insert("text".into(), anno.body_text.clone().into());
    out.insert("tags".into(), json!(anno.tags));
    out.insert("totalComments".into(), anno.total_replies.into());

    for (key, value) in [
        ("contextId", &anno.context_id),
        ("collectionId", &anno.collection_id),
        ("platform", &anno.platform_name),
    ] {
        if let Some(v) = value {
            out.insert(key.into(), v.clone().into());
        }
    }

    let selectors = selector_items(target.selector.as_ref());
    match target.media {
        TargetMedia::Annotation => {
            out.insert("media".into(), "comment".into());
            out.insert(
                "uri".into(),
                anno.target_source_id.clone().unwrap_or_default().into(),
            );
            out.insert("parent".into(), target.source.clone().into());
        }
        media => {
            out.insert("media".into(), media.as_str().to_ascii_lowercase().into());
            out.insert("uri".into(), target.source.clone().into());
            out.insert("parent".into(), LEGACY_NO_PARENT.into());
        }
    }

    match target.media {
        TargetMedia::Text => {
            let ranges: Vec<JsonValue> = selectors
                .iter()
                .filter(|s| selector_type(s) == "RangeSelector")
                .map(|s| legacy_range(s))
                .collect();
            let quote = selectors
                .iter()
                .find(|s| selector_type(s) == "TextQuoteSelector")
                .and_then(|s| s.get("exact"))
                .and_then(JsonValue::as_str)
                .unwrap_or_default();
            out.insert("ranges".into(), ranges.into());
            out.insert("quote".into(), quote.into());
        }
        TargetMedia::Video | TargetMedia::Audio => {
            if let Some(values) = fragment_values(&selectors, "t=") {
                if let [start, end] = values.as_slice() {
                    out.insert("rangeTime".into(), json!({"start": start, "end": end}));
                }
            }
        }
        TargetMedia::Image => {
            if let Some(values) = fragment_values(&selectors, "xywh=") {
                if let [x, y, w, h] = values.as_slice() {
                    out.insert(
                        "rangePosition".into(),
                        json!({"x": x, "y": y, "width": w, "height": h}),
                    );
                }
            } else if let Some(svg) = selectors
                .iter()
                .find(|s| selector_type(s) == "SvgSelector")
                .and_then(|s| s.get("value"))
            {
                out.insert("rangePosition".into(), svg.clone());
            }
            if let Some(thumb) = thumbs.first() {
                out.insert("thumb".into(), thumb.source.clone().into());
            }
        }
        TargetMedia::Thumbnail | TargetMedia::Annotation => {}
    }

    Ok(JsonValue::Object(out))
}

fn selector_items(selector: Option<&JsonValue>) -> Vec<&JsonValue> {
    match selector {
        None => Vec::new(),
        Some(s) => match s.get("items").and_then(JsonValue::as_array) {
            Some(items) => items.iter().collect(),
            None => vec![s],
        },
    }
}

fn selector_type(selector: &JsonValue) -> &str {
    selector
        .get("type")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
}

fn legacy_range(selector: &JsonValue) -> JsonValue {
    let position = selector
        .get("refinedBy")
        .and_then(JsonValue::as_array)
        .and_then(|r| r.first());
    json!({
        "start": selector.pointer("/startSelector/value").cloned().unwrap_or_default(),
        "end": selector.pointer("/endSelector/value").cloned().unwrap_or_default(),
        "startOffset": position.and_then(|p| p.get("start")).cloned().unwrap_or_default(),
        "endOffset": position.and_then(|p| p.get("end")).cloned().unwrap_or_default(),
    })
}

fn fragment_values(selectors: &[&JsonValue], prefix: &str) -> Option<Vec<JsonValue>> {
    let value = selectors
        .iter()
        .filter(|s| selector_type(s) == "FragmentSelector")
        .filter_map(|s| s.get("value").and_then(JsonValue::as_str))
        .find_map(|v| v.strip_prefix(prefix))?;
    Some(value.split(',').map(parse_number).collect())
}

fn parse_number(text: &str) -> JsonValue {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return i.into();
    }
    match text.parse::<f64>() {
        Ok(f) => json!(f),
        Err(_) => text.into(),
    }
}

// =============================================================================
// BATCH CONVERSION
// =============================================================================

/// Per-record conversion failure reported alongside successful rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionFailure {
    pub id: String,
    pub msg: String,
}

/// Outcome of converting one record.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionResult {
    Converted(JsonValue),
    Failed(ConversionFailure),
}

/// Result of converting a page of records to the legacy format.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LegacyBatch {
    pub rows: Vec<JsonValue>,
    pub failed: Vec<ConversionFailure>,
    pub size_failed: usize,
}

pub fn convert_one(anno: &Annotation) -> ConversionResult {
    match to_legacy(anno) {
        Ok(value) => ConversionResult::Converted(value),
        Err(e) => ConversionResult::Failed(ConversionFailure {
            id: anno.id.clone(),
            msg: e.to_string(),
        }),
    }
}

/// Convert every record, collecting failures instead of aborting.
pub fn convert_batch(annos: &[Annotation]) -> LegacyBatch {
    let mut batch = LegacyBatch::default();
    for anno in annos {
        match convert_one(anno) {
            ConversionResult::Converted(row) => batch.rows.push(row),
            ConversionResult::Failed(failure) => {
                tracing::trace!(
                    subsystem = "format",
                    anno_id = %failure.id,
                    error = %failure.msg,
                    "Record skipped in legacy conversion"
                );
                batch.failed.push(failure);
            }
        }
    }
    batch.size_failed = batch.failed.len();
    batch
}

// =============================================================================
// EQUIVALENCE
// =============================================================================

const VOLATILE_KEYS: &[&str] = &["created", "updated", "totalComments"];

/// Semantic equality of two legacy records.
///
/// Ignores key order, timestamps and reply counts, the number-vs-string
/// form of ids, list order of tags and permissions, and absent-vs-empty
/// values.
pub fn equivalent(a: &JsonValue, b: &JsonValue) -> bool {
    comparable(a) == comparable(b)
}

fn comparable(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(obj) => {
            let mut out = Map::new();
            for (key, v) in obj {
                if VOLATILE_KEYS.contains(&key.as_str()) {
                    continue;
                }
                let v = match key.as_str() {
                    "id" | "parent" => match scalar_string(v) {
                        Some(s) if key == "parent" && s == LEGACY_NO_PARENT => continue,
                        Some(s) => JsonValue::String(s),
                        None => comparable(v),
                    },
                    "tags" | "read" | "update" | "delete" | "admin" => sorted(v),
                    _ => comparable(v),
                };
                if !is_empty_value(&v) {
                    out.insert(key.clone(), v);
                }
            }
            JsonValue::Object(out)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(comparable).collect()),
        JsonValue::Number(n) => n.as_f64().map(|f| json!(f)).unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

fn sorted(value: &JsonValue) -> JsonValue {
    match value.as_array() {
        Some(items) => {
            let mut items: Vec<JsonValue> = items.iter().map(comparable).collect();
            items.sort_by_key(|v| v.to_string());
            JsonValue::Array(items)
        }
        None => comparable(value),
    }
}

fn is_empty_value(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(a) => a.is_empty(),
        JsonValue::Object(o) => o.is_empty(),
        _ => false,
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn invalid(id: &str, msg: &str) -> Error {
    if id.is_empty() {
        Error::InvalidInput(msg.to_string())
    } else {
        Error::InvalidInput(format!("anno({}): {}", id, msg))
    }
}

fn scalar_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list(value: Option<&JsonValue>) -> Vec<String> {
    value
        .and_then(JsonValue::as_array)
        .map(|items| items.iter().filter_map(scalar_string).collect())
        .unwrap_or_default()
}

fn number_text(value: Option<&JsonValue>) -> String {
    value.and_then(scalar_string).unwrap_or_else(|| "0".to_string())
}

fn parse_timestamp(value: &JsonValue) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(legacy: &JsonValue) -> Annotation {
        let catcha = to_canonical(legacy).unwrap().validated().unwrap();
        let now = Utc::now();
        Annotation::new(catcha, now, now)
    }

    fn text_legacy() -> JsonValue {
        json!({
            "id": 1234,
            "created": "2026-01-02T03:04:05Z",
            "updated": "2026-01-02T03:04:05Z",
            "user": {"id": "alice", "name": "Alice"},
            "permissions": {"read": [], "update": ["alice"], "delete": ["alice"], "admin": ["alice"]},
            "contextId": "course-x",
            "collectionId": "coll-1",
            "platform": "hxat",
            "uri": "http://example.com/doc",
            "media": "text",
            "text": "<p>comment</p>",
            "tags": ["b", "a"],
            "parent": "0",
            "ranges": [{"start": "/div[1]", "end": "/div[1]", "startOffset": 0, "endOffset": 12}],
            "quote": "hello world!",
            "totalComments": 0
        })
    }

    #[test]
    fn test_to_canonical_text() {
        let c = to_canonical(&text_legacy()).unwrap();
        assert_eq!(c.id, "1234");
        assert_eq!(c.creator.id, "alice");
        assert_eq!(c.platform.target_source_id.as_deref(), Some("http://example.com/doc"));
        assert_eq!(c.target.items.len(), 1);
        assert_eq!(c.target.items[0].media, TargetMedia::Text);
        let selector = c.target.items[0].selector.as_ref().unwrap();
        assert_eq!(selector["type"], "Choice");
        assert_eq!(c.body_text(), "<p>comment</p>");
        assert_eq!(c.tags(), vec!["b", "a"]);
    }

    #[test]
    fn test_round_trip_text() {
        let legacy = text_legacy();
        let back = to_legacy(&stored(&legacy)).unwrap();
        assert!(equivalent(&legacy, &back), "{} != {}", legacy, back);
    }

    #[test]
    fn test_round_trip_video() {
        let legacy = json!({
            "id": "v1",
            "user": {"id": "bob", "name": "Bob"},
            "permissions": {"read": ["bob"], "update": ["bob"], "delete": ["bob"], "admin": ["bob"]},
            "contextId": "c",
            "collectionId": "k",
            "uri": "https://youtu.be/xyz",
            "media": "video",
            "text": "look here",
            "tags": [],
            "parent": "0",
            "rangeTime": {"start": 10, "end": 12.5}
        });
        let anno = stored(&legacy);
        let selector = anno.raw.target.items[0].selector.clone().unwrap();
        assert_eq!(selector["value"], "t=10,12.5");
        let back = to_legacy(&anno).unwrap();
        assert!(equivalent(&legacy, &back), "{} != {}", legacy, back);
    }

    #[test]
    fn test_round_trip_image_with_thumb() {
        let legacy = json!({
            "id": "i1",
            "user": {"id": "carol", "name": "Carol"},
            "permissions": {"read": [], "update": ["carol"], "delete": ["carol"], "admin": ["carol"]},
            "uri": "http://img/1",
            "media": "image",
            "text": "",
            "tags": ["t"],
            "parent": "0",
            "rangePosition": {"x": 1, "y": 2, "width": 30, "height": 40},
            "thumb": "http://img/1/thumb"
        });
        let anno = stored(&legacy);
        assert_eq!(anno.raw.target.items.len(), 2);
        let back = to_legacy(&anno).unwrap();
        assert!(equivalent(&legacy, &back), "{} != {}", legacy, back);
    }

    #[test]
    fn test_round_trip_comment() {
        let legacy = json!({
            "id": "r1",
            "user": {"id": "dave", "name": "Dave"},
            "permissions": {"read": [], "update": ["dave"], "delete": ["dave"], "admin": ["dave"]},
            "uri": "http://example.com/doc",
            "media": "comment",
            "text": "reply",
            "tags": [],
            "parent": 1234
        });
        let anno = stored(&legacy);
        assert_eq!(anno.reply_to.as_deref(), Some("1234"));
        let back = to_legacy(&anno).unwrap();
        assert_eq!(back["media"], "comment");
        assert!(equivalent(&legacy, &back), "{} != {}", legacy, back);
    }

    #[test]
    fn test_to_canonical_missing_user() {
        let mut legacy = text_legacy();
        legacy.as_object_mut().unwrap().remove("user");
        assert!(matches!(to_canonical(&legacy), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_to_canonical_missing_uri() {
        let mut legacy = text_legacy();
        legacy.as_object_mut().unwrap().remove("uri");
        assert!(to_canonical(&legacy).is_err());
    }

    #[test]
    fn test_to_canonical_comment_without_parent() {
        let mut legacy = text_legacy();
        legacy["media"] = json!("comment");
        legacy["parent"] = json!("0");
        assert!(to_canonical(&legacy).is_err());
    }

    #[test]
    fn test_to_canonical_bad_tags() {
        let mut legacy = text_legacy();
        legacy["tags"] = json!([1, 2]);
        assert!(to_canonical(&legacy).is_err());
        legacy["tags"] = json!("a,b");
        assert!(to_canonical(&legacy).is_err());
    }

    #[test]
    fn test_to_legacy_rejects_mixed_media() {
        let mut anno = stored(&text_legacy());
        anno.raw.target.items.push(TargetItem {
            media: TargetMedia::Video,
            source: "http://v".into(),
            format: None,
            selector: None,
        });
        let err = to_legacy(&anno).unwrap_err();
        assert!(matches!(err, Error::FormatConversion(_)));
        assert!(err.to_string().contains("mixed target media"));
    }

    #[test]
    fn test_to_legacy_rejects_thumbnail_only() {
        let mut anno = stored(&text_legacy());
        anno.raw.target.items = vec![TargetItem {
            media: TargetMedia::Thumbnail,
            source: "http://t".into(),
            format: None,
            selector: None,
        }];
        assert!(to_legacy(&anno).is_err());
    }

    #[test]
    fn test_convert_batch_isolates_failures() {
        let good = stored(&text_legacy());
        let mut bad = stored(&text_legacy());
        bad.id = "broken".into();
        bad.raw.target.items.clear();

        let batch = convert_batch(&[good.clone(), bad, good]);
        assert_eq!(batch.rows.len(), 2);
        assert_eq!(batch.size_failed, 1);
        assert_eq!(batch.failed[0].id, "broken");
    }

    #[test]
    fn test_equivalent_ignores_volatile_and_order() {
        let a = json!({"id": 5, "tags": ["x", "y"], "created": "a", "parent": "0", "quote": ""});
        let b = json!({"id": "5", "tags": ["y", "x"], "created": "b"});
        assert!(equivalent(&a, &b));
        let c = json!({"id": "5", "tags": ["y"]});
        assert!(!equivalent(&a, &c));
    }
}
