//! Core types and traits for the huddle workspace.
//!
//! This crate defines the shared abstractions used across all layers of the
//! huddle API client, including the error taxonomy, the durable key/value
//! storage primitive supplied by the host platform, and the hooks the
//! surrounding application injects into the request pipeline.

pub mod error;
pub mod traits;

pub use error::HuddleError;
pub use traits::{KeyValueStore, LanguageProvider, Result, SessionExpiredHandler, StaticLanguage};
