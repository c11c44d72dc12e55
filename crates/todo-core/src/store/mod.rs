//! Document store adapters.
//!
//! The repository talks to persistence only through [`TodoStore`]. Two
//! implementations exist: [`NullStore`], which persists nothing and lets the
//! repository run purely in memory, and [`SqliteStore`], a JSON document
//! store on SQLite.

mod null;
#[cfg(feature = "sqlite")]
mod schema;
#[cfg(feature = "sqlite")]
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::StoreResult;
use crate::todo::{TodoDocument, TodoId};

pub use null::NullStore;
#[cfg(feature = "sqlite")]
pub use schema::{Schema, SCHEMA_VERSION};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// A persisted document together with its store key
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTodo {
    pub id: TodoId,
    pub document: TodoDocument,
}

/// Every persisted document, split by whether its body decoded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentScan {
    pub documents: Vec<StoredTodo>,
    /// Keys whose body is not a valid todo document
    pub undecodable: Vec<TodoId>,
}

impl DocumentScan {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Asynchronous key-document store for todos
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Whether writes actually reach durable storage
    fn is_persistent(&self) -> bool;

    /// Insert a new document.
    ///
    /// Returns the store-generated key, or `None` when the store does not
    /// assign keys and the caller must allocate one.
    async fn create(&self, document: &TodoDocument) -> StoreResult<Option<TodoId>>;

    async fn find_by_id(&self, id: &TodoId) -> StoreResult<Option<TodoDocument>>;

    /// Scan every document. A body that fails to decode is reported in
    /// [`DocumentScan::undecodable`] and does not fail the scan.
    async fn find_all(&self) -> StoreResult<DocumentScan>;

    /// Documents whose `tags` array contains `tag` (exact match).
    /// Undecodable bodies are left out.
    async fn find_by_tag_contains(&self, tag: &str) -> StoreResult<Vec<StoredTodo>>;

    /// Replace an existing document. Returns `false` if no document had that key.
    async fn update_by_id(&self, id: &TodoId, document: &TodoDocument) -> StoreResult<bool>;

    /// Insert or replace the document under `id`
    async fn upsert_by_id(&self, id: &TodoId, document: &TodoDocument) -> StoreResult<()>;

    /// Delete a document. Returns `false` if no document had that key.
    async fn delete_by_id(&self, id: &TodoId) -> StoreResult<bool>;

    /// Delete every document, returning how many were removed
    async fn delete_all(&self) -> StoreResult<u64>;

    /// Release the underlying connection. Later calls fail with
    /// [`crate::StoreError::Closed`].
    async fn close(&self) -> StoreResult<()>;
}

/// Open the store selected by `config`.
///
/// A store that cannot be opened degrades to [`NullStore`] so the service
/// still starts, in memory only.
pub fn open_store(config: &StorageConfig) -> Arc<dyn TodoStore> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Storage backend is memory; todos will not be persisted");
            Arc::new(NullStore)
        }
        #[cfg(feature = "sqlite")]
        StorageBackend::Sqlite => match SqliteStore::open(&config.url) {
            Ok(store) => {
                tracing::info!("Opened SQLite document store at {}", config.url);
                Arc::new(store)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to open SQLite store at {}: {}, running in memory only",
                    config.url,
                    e
                );
                Arc::new(NullStore)
            }
        },
        #[cfg(not(feature = "sqlite"))]
        StorageBackend::Sqlite => {
            tracing::warn!("SQLite support not enabled, running in memory only");
            Arc::new(NullStore)
        }
    }
}
