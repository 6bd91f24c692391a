//! Authenticated request pipeline for the Huddle app.
//!
//! One shared [`ApiClient`] serves every screen and service wrapper in the
//! application. It attaches the bearer credential and `Accept-Language`
//! header to each call, transparently refreshes an expired access token at
//! most once per request, and coordinates concurrent callers so that only a
//! single `POST /auth/refresh` exchange is ever in flight — all other
//! contenders wait on that one refresh and resume with the rotated token.
//!
//! ```no_run
//! use huddle_client::ApiClient;
//! use huddle_store::SqliteKeyValueStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> huddle_types::traits::Result<()> {
//! let storage = Arc::new(
//!     SqliteKeyValueStore::new("sqlite:./session.db")
//!         .await
//!         .map_err(|e| huddle_types::HuddleError::Storage(e.to_string()))?,
//! );
//! let api = ApiClient::builder("https://api.huddle.app", storage).build()?;
//!
//! let feed: serde_json::Value = api.get("/posts").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod credentials;
pub mod options;
mod refresh;

pub use client::{ApiClient, ApiClientBuilder};
pub use credentials::CredentialStore;
pub use options::{FileUpload, RequestBody, RequestOptions};

pub use huddle_types::{
    HuddleError, KeyValueStore, LanguageProvider, SessionExpiredHandler, StaticLanguage,
};
