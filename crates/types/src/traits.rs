//! Async traits shared across all huddle crates.
//!
//! Every cross-crate abstraction is defined here so that higher layers depend
//! only on `huddle-types`, not on each other.

use crate::HuddleError;
use async_trait::async_trait;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, HuddleError>;

/// Durable key/value storage supplied by the host platform.
///
/// Writes must be durable before the call returns. The client layer treats
/// write failures as best-effort (logged, never fatal), so implementations
/// should report errors rather than panic.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;
    /// Persist `value` under `key`, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Remove the value stored under `key`. Removing a missing key is a no-op.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Supplies the locale sent as `Accept-Language` on every request.
pub trait LanguageProvider: Send + Sync {
    /// Current UI locale, e.g. `"en"` or `"de-AT"`.
    fn language(&self) -> String;
}

/// A [`LanguageProvider`] that always returns a fixed locale.
///
/// Used as the default when the application does not inject its own provider.
pub struct StaticLanguage(pub String);

impl StaticLanguage {
    /// Creates a provider for the given fixed locale.
    pub fn new(locale: impl Into<String>) -> Self {
        Self(locale.into())
    }
}

impl LanguageProvider for StaticLanguage {
    fn language(&self) -> String {
        self.0.clone()
    }
}

/// Hook invoked when a token refresh definitively fails and the session is
/// unrecoverable (e.g. force logout and navigate to sign-in).
///
/// Implementations must be idempotent: the pipeline guarantees at most one
/// invocation per failed refresh cycle, but overlapping cycles across process
/// restarts may still call it more than once.
#[async_trait]
pub trait SessionExpiredHandler: Send + Sync {
    /// Called once per failed refresh cycle.
    async fn on_session_expired(&self);
}
