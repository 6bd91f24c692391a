//! Key/value storage backends for persisting session credentials.
//!
//! Provides an in-memory store for testing and a SQLite-backed store for
//! production. Both implement [`huddle_types::KeyValueStore`].

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;
