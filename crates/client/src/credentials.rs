//! Token-scoped access to the host platform's durable key/value storage.
//!
//! Owns the access/refresh token pair under fixed storage keys. Writes and
//! clears are best-effort: a storage I/O failure is logged and swallowed so
//! that a flaky disk can never fail a login or a request that otherwise
//! succeeded.

use huddle_types::KeyValueStore;
use std::sync::Arc;

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Scoped accessor for the persisted access/refresh token pair.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    /// Creates a credential store on top of the given storage backend.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current access token, or `None` if absent or unreadable.
    pub async fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY).await
    }

    /// Persist a new access token. Failures are logged, not propagated.
    pub async fn set_access_token(&self, token: &str) {
        self.write(ACCESS_TOKEN_KEY, token).await;
    }

    /// Remove the stored access token.
    pub async fn clear_access_token(&self) {
        self.clear(ACCESS_TOKEN_KEY).await;
    }

    /// Current refresh token, or `None` if absent or unreadable.
    pub async fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY).await
    }

    /// Persist a new refresh token. Failures are logged, not propagated.
    pub async fn set_refresh_token(&self, token: &str) {
        self.write(REFRESH_TOKEN_KEY, token).await;
    }

    /// Remove the stored refresh token.
    pub async fn clear_refresh_token(&self) {
        self.clear(REFRESH_TOKEN_KEY).await;
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read credential; treating as absent");
                None
            }
        }
    }

    async fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value).await {
            tracing::warn!(key, error = %e, "failed to persist credential");
        }
    }

    async fn clear(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            tracing::warn!(key, error = %e, "failed to clear credential");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use huddle_store::InMemoryKeyValueStore;
    use huddle_types::{HuddleError, traits::Result};

    fn make_store() -> CredentialStore {
        CredentialStore::new(Arc::new(InMemoryKeyValueStore::new()))
    }

    #[tokio::test]
    async fn test_access_token_round_trip() {
        let creds = make_store();
        assert!(creds.access_token().await.is_none());
        creds.set_access_token("tok-1").await;
        assert_eq!(creds.access_token().await.as_deref(), Some("tok-1"));
        creds.clear_access_token().await;
        assert!(creds.access_token().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_round_trip() {
        let creds = make_store();
        creds.set_refresh_token("ref-1").await;
        assert_eq!(creds.refresh_token().await.as_deref(), Some("ref-1"));
        creds.clear_refresh_token().await;
        assert!(creds.refresh_token().await.is_none());
    }

    #[tokio::test]
    async fn test_tokens_are_independent() {
        let creds = make_store();
        creds.set_access_token("acc").await;
        creds.set_refresh_token("ref").await;
        creds.clear_access_token().await;
        assert!(creds.access_token().await.is_none());
        assert_eq!(creds.refresh_token().await.as_deref(), Some("ref"));
    }

    /// A backend whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(HuddleError::Storage("disk gone".into()))
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(HuddleError::Storage("disk gone".into()))
        }
        async fn remove(&self, _key: &str) -> Result<()> {
            Err(HuddleError::Storage("disk gone".into()))
        }
    }

    #[tokio::test]
    async fn test_storage_failures_are_swallowed() {
        let creds = CredentialStore::new(Arc::new(BrokenStore));
        // None of these may panic or propagate the error.
        creds.set_access_token("tok").await;
        creds.set_refresh_token("ref").await;
        creds.clear_access_token().await;
        creds.clear_refresh_token().await;
        assert!(creds.access_token().await.is_none());
        assert!(creds.refresh_token().await.is_none());
    }
}
