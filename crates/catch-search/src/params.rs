//! Multi-valued search request parameters.

use catch_core::defaults::{PAGE_LIMIT, PAGE_OFFSET};

/// Request parameters in arrival order; keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded `key=value` pairs (query string or form body).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Append further pairs, e.g. a form body after the query string.
    pub fn extend<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.pairs
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    /// First non-empty value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    /// All non-empty values for `key`, in order.
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Requested page size. Non-integers fall back to the default; any
    /// negative value means unbounded.
    pub fn limit(&self) -> i64 {
        self.get("limit")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(PAGE_LIMIT)
    }

    /// Requested offset. Non-integers fall back to the default; negatives
    /// clamp to zero.
    pub fn offset(&self) -> i64 {
        self.get("offset")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(PAGE_OFFSET)
            .max(0)
    }
}

/// First letter upper-cased, the rest lower-cased.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
