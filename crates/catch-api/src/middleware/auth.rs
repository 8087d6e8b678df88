//! Auth gate: every annotation route runs behind a validated token.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;

use crate::error::ApiError;
use crate::AppState;

/// Validate the request token and attach its
/// [`TokenClaims`](catch_core::TokenClaims) as a request extension.
pub async fn require_catchjwt(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = state.auth.authenticate(request.headers(), Utc::now())?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
