//! Consumer registry: which secret signs tokens for which consumer key.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::TokenError;

/// Lookup of signing secrets by consumer key.
pub trait ConsumerStore: Send + Sync {
    /// Secret for `key`, failing for unknown or expired consumers.
    fn secret_for(&self, key: &str, now: DateTime<Utc>) -> Result<String, TokenError>;
}

/// A registered token consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumer {
    pub key: String,
    pub secret: String,
    pub expire_on: Option<DateTime<Utc>>,
}

/// Consumers held in memory, loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticConsumers {
    consumers: HashMap<String, Consumer>,
}

impl StaticConsumers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_consumer(mut self, consumer: Consumer) -> Self {
        self.insert(consumer);
        self
    }

    pub fn insert(&mut self, consumer: Consumer) {
        self.consumers.insert(consumer.key.clone(), consumer);
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }

    /// Parse `key:secret[,key:secret...]`. Entries without a `:` are
    /// skipped with a warning.
    pub fn parse(raw: &str) -> Self {
        let mut store = Self::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.split_once(':') {
                Some((key, secret)) if !key.trim().is_empty() && !secret.is_empty() => {
                    store.insert(Consumer {
                        key: key.trim().to_string(),
                        secret: secret.to_string(),
                        expire_on: None,
                    });
                }
                _ => tracing::warn!(
                    subsystem = "auth",
                    component = "consumer",
                    "Skipping malformed consumer entry"
                ),
            }
        }
        store
    }
}

impl ConsumerStore for StaticConsumers {
    fn secret_for(&self, key: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let consumer = self
            .consumers
            .get(key)
            .ok_or_else(|| TokenError::UnknownConsumer(key.to_string()))?;
        if consumer.expire_on.is_some_and(|exp| exp < now) {
            return Err(TokenError::ExpiredConsumer(key.to_string()));
        }
        Ok(consumer.secret.clone())
    }
}
