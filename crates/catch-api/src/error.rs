//! HTTP rendering of store errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use catch_auth::TokenError;

/// Error returned by handlers, rendered as `{status, payload: [msg]}`.
#[derive(Debug)]
pub struct ApiError(pub catch_core::Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<catch_core::Error> for ApiError {
    fn from(err: catch_core::Error) -> Self {
        ApiError(err)
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(subsystem = "api", error = %self.0, "Request failed");
        } else {
            tracing::info!(subsystem = "api", status = status.as_u16(), error = %self.0, "Request rejected");
        }
        let body = Json(json!({
            "status": status.as_u16(),
            "payload": self.0.payload(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = ApiError::from(catch_core::Error::MissingAnnotation("anno(x) not found".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = ApiError::from(TokenError::Missing);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
