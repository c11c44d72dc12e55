//! Todo Core - todos, tags and their persistence
//!
//! This crate provides the core of the todo service:
//!
//! - **Todo**: task records with title, sort hint, completion flag and tag set
//! - **Tags**: set-valued labels; "todos by tag" is an inverted lookup
//! - **Ids**: numeric id allocation when no store assigns keys
//! - **Store**: asynchronous document store adapters (no-op and SQLite)
//! - **Repository**: the in-memory projection every request resolves against
//! - **Sync**: load-at-start and flush-at-stop against the store
//! - **Config**: server and storage settings from file and environment
//!
//! # Consistency
//!
//! The in-memory repository is authoritative. Single-todo mutations are
//! committed to the store first and applied in memory only on success; bulk
//! operations (clear, clear all tags, flush) are best-effort against the store.

pub mod config;
pub mod error;
pub mod ids;
pub mod repository;
pub mod store;
pub mod tags;
pub mod todo;

pub use config::{ServerConfig, StorageBackend, StorageConfig, TodoConfig};
pub use error::{ConfigError, Result, StoreError, StoreResult, TodoError};
pub use ids::IdAllocator;
pub use repository::{SyncReport, TodoRepository};
pub use store::{open_store, DocumentScan, NullStore, StoredTodo, TodoStore};
#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
pub use tags::{parse_tag_list, parse_tag_value, parse_tags_body, validate_tag, TagSet};
pub use todo::{NewTodo, Todo, TodoDocument, TodoId, TodoPatch};

/// Returns the version of todo-core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
