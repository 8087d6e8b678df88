//! Claims validation.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;

use catch_core::TokenClaims;

/// Check the time-bound claims of a token against `now`.
///
/// Returns the rejection message, or `None` when the claims are valid.
pub fn validate_token(claims: &TokenClaims, now: DateTime<Utc>) -> Option<String> {
    let (issued_at, ttl) = match (&claims.issued_at, &claims.ttl) {
        (Some(issued_at), Some(ttl)) if !ttl.is_null() => (issued_at, ttl),
        _ => return Some("missing `issuedAt` or `ttl` in auth token".to_string()),
    };

    let issued_at = match parse_iso8601(issued_at) {
        Ok(dt) => dt,
        Err(e) => {
            return Some(format!(
                "invalid `issuedAt` date format, expected iso8601. {}",
                e
            ))
        }
    };
    let ttl = match parse_ttl(ttl) {
        Some(ttl) => ttl,
        None => return Some("invalid `ttl` value, expected integer".to_string()),
    };

    let Some(expires) = Duration::try_seconds(ttl).and_then(|d| issued_at.checked_add_signed(d))
    else {
        return Some("invalid `ttl` value, expected integer".to_string());
    };
    if expires < now {
        return Some("token has expired".to_string());
    }
    if issued_at > now {
        return Some("invalid `issuedAt` in the future.".to_string());
    }
    None
}

/// Parse an ISO-8601 timestamp; values without an offset are taken as UTC.
fn parse_iso8601(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(e) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| e),
    }
}

fn parse_ttl(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::SecondsFormat;
    use serde_json::json;

    fn claims(issued_at: Option<DateTime<Utc>>, ttl: Option<JsonValue>) -> TokenClaims {
        TokenClaims::from_payload(json!({
            "consumerKey": "ck",
            "userId": "alice",
            "issuedAt": issued_at.map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, false)),
            "ttl": ttl,
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_token() {
        let now = Utc::now();
        assert_eq!(validate_token(&claims(Some(now), Some(json!(60))), now), None);
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now();
        let c = claims(Some(now - Duration::seconds(120)), Some(json!(60)));
        assert_eq!(validate_token(&c, now).as_deref(), Some("token has expired"));
    }

    #[test]
    fn test_issued_in_future() {
        let now = Utc::now();
        let c = claims(Some(now + Duration::seconds(60)), Some(json!(60)));
        assert_eq!(
            validate_token(&c, now).as_deref(),
            Some("invalid `issuedAt` in the future.")
        );
    }

    #[test]
    fn test_missing_ttl() {
        let now = Utc::now();
        let c = claims(Some(now), None);
        assert_eq!(
            validate_token(&c, now).as_deref(),
            Some("missing `issuedAt` or `ttl` in auth token")
        );
    }

    #[test]
    fn test_bad_issued_at_format() {
        let mut c = claims(None, Some(json!(60)));
        c.issued_at = Some("yesterday".into());
        let msg = validate_token(&c, Utc::now()).unwrap();
        assert!(msg.starts_with("invalid `issuedAt` date format, expected iso8601."));
    }

    #[test]
    fn test_ttl_as_string_and_invalid() {
        let now = Utc::now();
        assert_eq!(validate_token(&claims(Some(now), Some(json!("60"))), now), None);
        assert_eq!(
            validate_token(&claims(Some(now), Some(json!("sixty"))), now).as_deref(),
            Some("invalid `ttl` value, expected integer")
        );
    }

    #[test]
    fn test_ttl_out_of_range() {
        let now = Utc::now();
        let c = claims(Some(now), Some(json!(9_000_000_000_000_000i64)));
        assert_eq!(
            validate_token(&c, now).as_deref(),
            Some("invalid `ttl` value, expected integer")
        );
        let c = claims(Some(now), Some(json!(i64::MIN)));
        assert_eq!(
            validate_token(&c, now).as_deref(),
            Some("invalid `ttl` value, expected integer")
        );
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let now = Utc::now();
        let mut c = claims(None, Some(json!(60)));
        c.issued_at = Some(now.format("%Y-%m-%dT%H:%M:%S").to_string());
        assert_eq!(validate_token(&c, now), None);
    }
}
