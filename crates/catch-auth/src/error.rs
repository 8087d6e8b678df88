//! Error types for token handling.

use thiserror::Error;

/// Token authentication errors.
///
/// Every variant renders as the message returned to the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// No token in the request headers.
    #[error("missing auth token")]
    Missing,

    /// Token could not be decoded.
    #[error("failed to decode auth token")]
    Malformed,

    /// Token names no consumer, or one that is not registered.
    #[error("invalid consumer({0})")]
    UnknownConsumer(String),

    /// Consumer registration has expired.
    #[error("consumer({0}) expired")]
    ExpiredConsumer(String),

    /// Signature check failed for the consumer's secret.
    #[error("invalid auth token signature")]
    InvalidSignature,

    /// Claims are missing required fields.
    #[error("invalid auth token claims: {0}")]
    InvalidClaims(String),

    /// Claims failed validation (expiry, format).
    #[error("{0}")]
    Rejected(String),

    /// Unsupported signing algorithm.
    #[error("unsupported jwt algorithm({0})")]
    UnsupportedAlgorithm(String),

    /// Encoding a token failed.
    #[error("failed to encode auth token: {0}")]
    Encoding(String),
}

impl From<TokenError> for catch_core::Error {
    fn from(e: TokenError) -> Self {
        catch_core::Error::Unauthorized(e.to_string())
    }
}
