//! Session store used to memoize lookups across one sync pass.
//!
//! The store is an external collaborator provided by the host. It offers no
//! transactional guarantee; callers treat it as best effort.

use crate::error::ClientResult;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Key/value store scoped to a sync pass.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reads one value.
    async fn get(&self, key: &str) -> ClientResult<Option<Vec<u8>>>;

    /// Writes one value.
    async fn set(&self, key: &str, value: Vec<u8>) -> ClientResult<()>;

    /// Reads several values. Missing keys are absent from the result.
    async fn get_many(&self, keys: &[String]) -> ClientResult<HashMap<String, Vec<u8>>>;

    /// Writes several values.
    async fn set_many(&self, values: HashMap<String, Vec<u8>>) -> ClientResult<()>;
}

/// In-process store; entries live until the store is dropped.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> ClientResult<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> ClientResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_many(&self, keys: &[String]) -> ClientResult<HashMap<String, Vec<u8>>> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    async fn set_many(&self, values: HashMap<String, Vec<u8>>) -> ClientResult<()> {
        self.entries.write().await.extend(values);
        Ok(())
    }
}
