//! Error types for the catch annotation store.
//!
//! Every variant maps to an HTTP-equivalent status code through
//! [`Error::status`]; the boundary layer renders [`Error::payload`] as the
//! message list of the response.

use thiserror::Error;

/// Result type alias using catch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for annotation store operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing, invalid or expired auth token
    #[error("{0}")]
    Unauthorized(String),

    /// Actor lacks the permission required by the operation
    #[error("{0}")]
    NoPermissionForOperation(String),

    /// Annotation absent or soft-deleted
    #[error("{0}")]
    MissingAnnotation(String),

    /// Annotation id already taken (live or soft-deleted)
    #[error("{0}")]
    DuplicateAnnotationId(String),

    /// Annotation creator does not match the requesting user
    #[error("{0}")]
    InvalidAnnotationCreator(String),

    /// Malformed json or annotation schema
    #[error("{0}")]
    InvalidInput(String),

    /// Create/update request without a json body
    #[error("{0}")]
    MissingAnnotationInput(String),

    /// Operation succeeded but the record could not be shaped for output
    #[error("{0}")]
    FormatConversion(String),

    /// Response format tag not recognized
    #[error("{0}")]
    UnknownResponseFormat(String),

    /// HTTP method not supported by the endpoint
    #[error("{0}")]
    MethodNotAllowed(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP-equivalent status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            Error::Unauthorized(_) => 401,
            Error::NoPermissionForOperation(_) => 403,
            Error::MissingAnnotation(_) => 404,
            Error::MethodNotAllowed(_) => 405,
            Error::DuplicateAnnotationId(_) | Error::InvalidAnnotationCreator(_) => 409,
            Error::InvalidInput(_)
            | Error::MissingAnnotationInput(_)
            | Error::UnknownResponseFormat(_) => 400,
            Error::Database(_)
            | Error::FormatConversion(_)
            | Error::Serialization(_)
            | Error::Config(_)
            | Error::Internal(_) => 500,
        }
    }

    /// Human-readable message list carried in error responses.
    pub fn payload(&self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::Unauthorized("x".into()).status(), 401);
        assert_eq!(Error::NoPermissionForOperation("x".into()).status(), 403);
        assert_eq!(Error::MissingAnnotation("x".into()).status(), 404);
        assert_eq!(Error::MethodNotAllowed("x".into()).status(), 405);
        assert_eq!(Error::DuplicateAnnotationId("x".into()).status(), 409);
        assert_eq!(Error::InvalidAnnotationCreator("x".into()).status(), 409);
        assert_eq!(Error::InvalidInput("x".into()).status(), 400);
        assert_eq!(Error::MissingAnnotationInput("x".into()).status(), 400);
        assert_eq!(Error::UnknownResponseFormat("x".into()).status(), 400);
        assert_eq!(Error::FormatConversion("x".into()).status(), 500);
        assert_eq!(Error::Internal("x".into()).status(), 500);
    }

    #[test]
    fn test_domain_errors_display_bare_message() {
        let err = Error::MissingAnnotation("anno(123) not found".to_string());
        assert_eq!(err.to_string(), "anno(123) not found");
        assert_eq!(err.payload(), vec!["anno(123) not found".to_string()]);
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing secret".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing secret");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
