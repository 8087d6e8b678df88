//! Token claims carried by an authenticated request.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::defaults::CATCH_ADMIN_GROUP_ID;
use crate::error::{Error, Result};

/// Capability flag that bypasses per-record ACL checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OverrideFlag {
    CanRead,
    CanUpdate,
    CanDelete,
    CanAdmin,
}

impl OverrideFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideFlag::CanRead => "CAN_READ",
            OverrideFlag::CanUpdate => "CAN_UPDATE",
            OverrideFlag::CanDelete => "CAN_DELETE",
            OverrideFlag::CanAdmin => "CAN_ADMIN",
        }
    }
}

impl FromStr for OverrideFlag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CAN_READ" => Ok(OverrideFlag::CanRead),
            "CAN_UPDATE" => Ok(OverrideFlag::CanUpdate),
            "CAN_DELETE" => Ok(OverrideFlag::CanDelete),
            "CAN_ADMIN" => Ok(OverrideFlag::CanAdmin),
            _ => Err(Error::InvalidInput(format!("unknown override flag({})", s))),
        }
    }
}

impl fmt::Display for OverrideFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of override flags parsed from the token.
///
/// Unrecognized strings are dropped at parse time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideSet(BTreeSet<OverrideFlag>);

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, flag: OverrideFlag) -> bool {
        self.0.contains(&flag)
    }

    pub fn insert(&mut self, flag: OverrideFlag) {
        self.0.insert(flag);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OverrideFlag> {
        self.0.iter()
    }

    /// Parse free-form strings, ignoring unknown flags.
    pub fn from_strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for item in items {
            match item.as_ref().parse::<OverrideFlag>() {
                Ok(flag) => set.insert(flag),
                Err(_) => tracing::debug!(
                    subsystem = "auth",
                    component = "claims",
                    flag = item.as_ref(),
                    "Ignoring unknown override flag"
                ),
            }
        }
        set
    }
}

impl FromIterator<OverrideFlag> for OverrideSet {
    fn from_iter<T: IntoIterator<Item = OverrideFlag>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for OverrideSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(OverrideFlag::as_str))
    }
}

impl<'de> Deserialize<'de> for OverrideSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<Vec<String>>::deserialize(deserializer)?;
        Ok(Self::from_strings(raw.unwrap_or_default()))
    }
}

/// Claims decoded from a request token.
///
/// `issued_at` and `ttl` are kept loosely typed so that token validation can
/// report their format errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub consumer_key: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<JsonValue>,
    #[serde(rename = "override", default)]
    pub overrides: OverrideSet,
}

impl TokenClaims {
    /// Build claims from a decoded token payload.
    pub fn from_payload(payload: JsonValue) -> Result<Self> {
        serde_json::from_value(payload)
            .map_err(|e| Error::Unauthorized(format!("failed to read auth token claims: {}", e)))
    }

    /// Whether the actor is the back-compat superuser.
    pub fn is_admin(&self) -> bool {
        self.user_id == CATCH_ADMIN_GROUP_ID
    }

    pub fn has_override(&self, flag: OverrideFlag) -> bool {
        self.overrides.contains(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_override_flag_case_insensitive() {
        assert_eq!("can_read".parse::<OverrideFlag>().unwrap(), OverrideFlag::CanRead);
        assert_eq!("CAN_ADMIN".parse::<OverrideFlag>().unwrap(), OverrideFlag::CanAdmin);
        assert!("CAN_FLY".parse::<OverrideFlag>().is_err());
    }

    #[test]
    fn test_claims_from_payload() {
        let claims = TokenClaims::from_payload(json!({
            "consumerKey": "ck",
            "userId": "alice",
            "issuedAt": "2026-01-01T00:00:00Z",
            "ttl": 60,
            "override": ["CAN_READ", "CAN_FLY", "can_delete"]
        }))
        .unwrap();
        assert_eq!(claims.user_id, "alice");
        assert!(claims.has_override(OverrideFlag::CanRead));
        assert!(claims.has_override(OverrideFlag::CanDelete));
        assert!(!claims.has_override(OverrideFlag::CanUpdate));
        assert_eq!(claims.overrides.iter().count(), 2);
        assert!(!claims.is_admin());
    }

    #[test]
    fn test_claims_missing_user_is_unauthorized() {
        let err = TokenClaims::from_payload(json!({"consumerKey": "ck"})).unwrap_err();
        assert_eq!(err.status(), 401);
    }

    #[test]
    fn test_claims_null_override() {
        let claims = TokenClaims::from_payload(json!({
            "consumerKey": "ck",
            "userId": "__admin__",
            "override": null
        }))
        .unwrap();
        assert!(claims.overrides.is_empty());
        assert!(claims.is_admin());
    }

    #[test]
    fn test_override_set_serializes_as_strings() {
        let set: OverrideSet = [OverrideFlag::CanUpdate, OverrideFlag::CanRead]
            .into_iter()
            .collect();
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            json!(["CAN_READ", "CAN_UPDATE"])
        );
    }
}
