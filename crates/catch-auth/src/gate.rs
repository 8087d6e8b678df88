//! Request authentication: header extraction through validated claims.

use chrono::{DateTime, Utc};
use http::header::AUTHORIZATION;
use http::HeaderMap;
use jsonwebtoken::Algorithm;
use std::sync::Arc;

use catch_core::defaults::AUTH_TOKEN_HEADER;
use catch_core::TokenClaims;

use crate::consumer::ConsumerStore;
use crate::error::TokenError;
use crate::jwt::decode_token;
use crate::validate::validate_token;

/// Token carried by the request, if any.
///
/// Accepts `Authorization: Token <jwt>`, `Authorization: Bearer <jwt>` or
/// the bare token in `x-annotator-auth-token`.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        let mut parts = value.split_whitespace();
        if let (Some(scheme), Some(token)) = (parts.next(), parts.next()) {
            if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
                return Some(token.to_string());
            }
        }
    }
    headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Auth gate producing validated claims for a request.
#[derive(Clone)]
pub struct Authenticator {
    consumers: Arc<dyn ConsumerStore>,
    algorithm: Algorithm,
}

impl Authenticator {
    pub fn new(consumers: Arc<dyn ConsumerStore>, algorithm: Algorithm) -> Self {
        Self {
            consumers,
            algorithm,
        }
    }

    /// Authenticate request headers at time `now`.
    ///
    /// The token is read once without verification to learn its consumer,
    /// then verified against that consumer's secret and validated.
    pub fn authenticate(
        &self,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, TokenError> {
        let token = extract_token(headers).ok_or(TokenError::Missing)?;

        let unverified =
            decode_token(&token, "", false, self.algorithm).ok_or(TokenError::Malformed)?;
        let consumer_key = unverified
            .get("consumerKey")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TokenError::InvalidClaims("missing consumerKey".to_string()))?;

        let secret = self.consumers.secret_for(consumer_key, now)?;
        let payload = decode_token(&token, &secret, true, self.algorithm)
            .ok_or(TokenError::InvalidSignature)?;

        let claims = TokenClaims::from_payload(payload)
            .map_err(|e| TokenError::InvalidClaims(e.to_string()))?;
        if let Some(msg) = validate_token(&claims, now) {
            tracing::info!(
                subsystem = "auth",
                component = "gate",
                consumer_key = %claims.consumer_key,
                user_id = %claims.user_id,
                reason = %msg,
                "Auth token rejected"
            );
            return Err(TokenError::Rejected(msg));
        }

        tracing::debug!(
            subsystem = "auth",
            component = "gate",
            consumer_key = %claims.consumer_key,
            user_id = %claims.user_id,
            overrides = claims.overrides.iter().count(),
            "Request authenticated"
        );
        Ok(claims)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_extract_token_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer xyz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));

        let mut headers = HeaderMap::new();
        headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_static("raw"));
        assert_eq!(extract_token(&headers).as_deref(), Some("raw"));

        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_unknown_scheme_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert_eq!(extract_token(&headers), None);
    }
}
