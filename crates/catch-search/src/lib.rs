//! # catch-search
//!
//! Search over stored annotations.
//!
//! This crate provides:
//! - [`SearchParams`], multi-valued request parameters with lenient paging
//! - Query building for the current and legacy parameter dialects
//! - [`CustomQuery`], the extension point for platform-specific filters
//! - [`SearchEngine`], which runs a query against any
//!   [`AnnotationStore`](catch_core::AnnotationStore) under a response
//!   ceiling and renders the result envelope
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use catch_search::{SearchDialect, SearchEngine, SearchParams};
//!
//! let engine = SearchEngine::new(Arc::new(store));
//! let params = SearchParams::from_pairs([("tag", "intro"), ("limit", "20")]);
//! let result = engine.search(&params, &claims, SearchDialect::Current).await?;
//! let body = result.render(ResponseFormat::Catcha)?;
//! ```

pub mod custom;
pub mod engine;
pub mod params;

// Re-export core types
pub use catch_core::*;

pub use custom::{CustomQuery, PlatformQuery, PLATFORM_KEY_PREFIX};
pub use engine::{SearchConfig, SearchEngine, SearchResult};
pub use params::{capitalize, SearchParams};
