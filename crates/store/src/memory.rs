//! In-memory key/value store backed by a `HashMap` behind a `Mutex`.

use async_trait::async_trait;
use huddle_types::{KeyValueStore, traits::Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// An in-memory [`KeyValueStore`] implementation for testing and ephemeral use.
pub struct InMemoryKeyValueStore {
    data: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryKeyValueStore::new();
        store.set("access_token", "tok-1").await.unwrap();
        let loaded = store.get("access_token").await.unwrap();
        assert_eq!(loaded.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = InMemoryKeyValueStore::new();
        assert!(store.get("refresh_token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemoryKeyValueStore::new();
        store.set("access_token", "tok").await.unwrap();
        store.remove("access_token").await.unwrap();
        assert!(store.get("access_token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let store = InMemoryKeyValueStore::new();
        store.remove("nothing_here").await.unwrap();
    }

    #[tokio::test]
    async fn test_overwrite() {
        let store = InMemoryKeyValueStore::new();
        store.set("access_token", "first").await.unwrap();
        store.set("access_token", "second").await.unwrap();
        let loaded = store.get("access_token").await.unwrap();
        assert_eq!(loaded.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_independent_keys() {
        let store = InMemoryKeyValueStore::new();
        store.set("access_token", "a").await.unwrap();
        store.set("refresh_token", "r").await.unwrap();
        store.remove("access_token").await.unwrap();
        assert_eq!(
            store.get("refresh_token").await.unwrap().as_deref(),
            Some("r")
        );
    }
}
