//! # catch-core
//!
//! Core types, traits, and abstractions for the catch annotation store.
//!
//! This crate provides the annotation data model, the canonical ("catcha")
//! and legacy (AnnotatorJS) wire formats with conversion between them, the
//! per-record permission rules, the search query model, and the storage
//! trait that concrete backends implement.

pub mod annojs;
pub mod catcha;
pub mod claims;
pub mod defaults;
pub mod error;
pub mod ids;
pub mod logging;
pub mod models;
pub mod permissions;
pub mod search;
pub mod traits;

// Re-export commonly used types at crate root
pub use annojs::{ConversionFailure, ConversionResult, LegacyBatch};
pub use claims::{OverrideFlag, OverrideSet, TokenClaims};
pub use error::{Error, Result};
pub use ids::{generate_uid, new_v7};
pub use models::*;
pub use permissions::{has_permission, Operation};
pub use search::*;
pub use traits::*;
