//! In-memory default implementation of the token store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::token_store::TokenStore;
use super::types::AuthError;

/// Process-local store; clones share the same map.
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    entries: Arc<DashMap<String, String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn has(&self, key: &str) -> Result<bool, AuthError> {
        Ok(self.entries.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), AuthError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.entries.remove(key);
        Ok(())
    }
}
