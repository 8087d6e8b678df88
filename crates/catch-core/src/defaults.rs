//! Centralized default constants for the catch annotation store.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers and strings.

// =============================================================================
// FORMATS
// =============================================================================

/// Response format tag for the canonical (W3C-style) representation.
pub const CATCH_ANNO_FORMAT: &str = "CATCH_ANNO_FORMAT";

/// Response format tag for the legacy AnnotatorJS representation.
pub const ANNOTATORJS_FORMAT: &str = "ANNOTATORJS_FORMAT";

/// Request header selecting the response format.
pub const RESPONSE_FORMAT_HEADER: &str = "x-catch-response-format";

/// Schema version stamped on every canonical record.
pub const CATCH_CURRENT_SCHEMA_VERSION: &str = "catch_v2.0";

/// JSON-LD context IRI for canonical records.
pub const CATCH_JSONLD_CONTEXT_IRI: &str =
    "http://catchpy.harvardx.harvard.edu.s3.amazonaws.com/jsonld/catch_context_jsonld.json";

/// Format declared on textual bodies converted from legacy records.
pub const TEXTUAL_BODY_FORMAT: &str = "text/html";

/// Media fragments IRI used by time-range selectors.
pub const MEDIA_FRAGMENTS_IRI: &str = "http://www.w3.org/TR/media-frags/";

/// Legacy `parent` value meaning "not a reply".
pub const LEGACY_NO_PARENT: &str = "0";

// =============================================================================
// AUTHORIZATION
// =============================================================================

/// Back-compat superuser identity; always passes permission checks.
pub const CATCH_ADMIN_GROUP_ID: &str = "__admin__";

/// Header carrying the auth token (alternative to `Authorization`).
pub const AUTH_TOKEN_HEADER: &str = "x-annotator-auth-token";

/// Default token time-to-live in seconds for minted tokens.
pub const TOKEN_TTL_SECS: i64 = 60;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for search requests.
pub const PAGE_LIMIT: i64 = 10;

/// Default page offset.
pub const PAGE_OFFSET: i64 = 0;

/// Hard ceiling on rows returned by one search response.
pub const MAX_RESPONSE_LIMIT: i64 = 200;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Maximum request body size in bytes (bulk imports can be large).
pub const MAX_BODY_SIZE_BYTES: usize = 16 * 1024 * 1024;

/// Default CORS max-age in seconds (1 hour).
pub const CORS_MAX_AGE_SECS: u64 = 3600;
