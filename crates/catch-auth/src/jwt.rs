//! JWT encoding and decoding.

use chrono::{DateTime, SecondsFormat, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{json, Value as JsonValue};
use std::collections::HashSet;
use uuid::Uuid;

use catch_core::defaults::TOKEN_TTL_SECS;

use crate::error::TokenError;

/// Parse a configured algorithm name. Only HMAC algorithms are accepted.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, TokenError> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(TokenError::UnsupportedAlgorithm(other.to_string())),
    }
}

/// Decode a token into its raw payload.
///
/// Returns `None` (and logs) for malformed tokens or, with `verify`, a bad
/// signature. Registered claims such as `exp` are not checked here; expiry
/// is computed from `issuedAt` and `ttl` by token validation.
pub fn decode_token(
    token: &str,
    secret: &str,
    verify: bool,
    algorithm: Algorithm,
) -> Option<JsonValue> {
    let mut validation = Validation::new(algorithm);
    validation.required_spec_claims = HashSet::new();
    validation.validate_exp = false;
    validation.validate_aud = false;
    if !verify {
        validation.insecure_disable_signature_validation();
    }

    match decode::<JsonValue>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::info!(
                subsystem = "auth",
                component = "jwt",
                op = "decode",
                verify,
                error = %e,
                "Unable to decode auth token"
            );
            None
        }
    }
}

/// Sign an arbitrary payload.
pub fn encode_token(
    payload: &JsonValue,
    secret: &str,
    algorithm: Algorithm,
) -> Result<String, TokenError> {
    encode(
        &Header::new(algorithm),
        payload,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Encoding(e.to_string()))
}

/// Inputs for minting a catch token. Unset fields get defaults.
#[derive(Debug, Clone, Default)]
pub struct CatchJwtRequest {
    /// Consumer key; random UUID when unset.
    pub apikey: Option<String>,
    /// User id; random UUID when unset.
    pub user: Option<String>,
    /// Issue time; now when unset.
    pub issued_at: Option<DateTime<Utc>>,
    /// Seconds; 60 when unset.
    pub ttl: Option<i64>,
    pub overrides: Vec<String>,
}

/// Claims payload a catch token carries.
pub fn catchjwt_payload(req: CatchJwtRequest) -> JsonValue {
    let issued_at = req.issued_at.unwrap_or_else(Utc::now);
    json!({
        "consumerKey": req.apikey.unwrap_or_else(|| Uuid::new_v4().to_string()),
        "userId": req.user.unwrap_or_else(|| Uuid::new_v4().to_string()),
        "issuedAt": issued_at.to_rfc3339_opts(SecondsFormat::Secs, false),
        "ttl": req.ttl.unwrap_or(TOKEN_TTL_SECS),
        "override": req.overrides,
    })
}

/// Mint a signed catch token.
pub fn encode_catchjwt(
    req: CatchJwtRequest,
    secret: &str,
    algorithm: Algorithm,
) -> Result<String, TokenError> {
    encode_token(&catchjwt_payload(req), secret, algorithm)
}
