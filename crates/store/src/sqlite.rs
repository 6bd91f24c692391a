//! SQLite-backed key/value store using sqlx.
//!
//! Schema: `kv(key, value, updated_at)` with `key` as primary key. Writes are
//! committed before the call returns, so credentials survive app restarts.

use async_trait::async_trait;
use huddle_types::{KeyValueStore, traits::Result};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;

/// A persistent [`KeyValueStore`] backed by `SQLite`.
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Connects to a `SQLite` database (e.g. `"sqlite:./session.db"` or
    /// `"sqlite::memory:"`).
    ///
    /// Automatically creates the database file if it does not exist and runs
    /// the schema migration.
    ///
    /// # Errors
    ///
    /// Returns a [`sqlx::Error`] if the connection or table creation fails.
    pub async fn new(database_url: &str) -> std::result::Result<Self, sqlx::Error> {
        let opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Single connection: SQLite allows one writer, and `sqlite::memory:`
        // would otherwise give every pooled connection its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Create the `kv` table if it does not exist.
    async fn migrate(pool: &SqlitePool) -> std::result::Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT    NOT NULL PRIMARY KEY,
                value      TEXT    NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (unixepoch())
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = unixepoch()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn mem() -> SqliteKeyValueStore {
        SqliteKeyValueStore::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let s = mem().await;
        s.set("access_token", "tok-1").await.unwrap();
        assert_eq!(
            s.get("access_token").await.unwrap().as_deref(),
            Some("tok-1")
        );
    }

    #[tokio::test]
    async fn test_get_missing() {
        let s = mem().await;
        assert!(s.get("refresh_token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let s = mem().await;
        s.set("access_token", "tok").await.unwrap();
        s.remove("access_token").await.unwrap();
        assert!(s.get("access_token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert() {
        let s = mem().await;
        s.set("access_token", "first").await.unwrap();
        s.set("access_token", "second").await.unwrap();
        assert_eq!(
            s.get("access_token").await.unwrap().as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn test_independent_keys() {
        let s = mem().await;
        s.set("access_token", "a").await.unwrap();
        s.set("refresh_token", "r").await.unwrap();
        s.remove("access_token").await.unwrap();
        assert_eq!(s.get("refresh_token").await.unwrap().as_deref(), Some("r"));
    }

    #[tokio::test]
    async fn test_migrate_idempotent() {
        let s = mem().await;
        SqliteKeyValueStore::migrate(&s.pool).await.unwrap();
        s.set("access_token", "still-works").await.unwrap();
        assert!(s.get("access_token").await.unwrap().is_some());
    }
}
