//! Service layer for business logic.

pub mod crud_service;

pub use crud_service::{parse_body, CrudService, ImportFailure, ImportSummary};
