//! Store adapter used when no document store is configured or reachable.

use async_trait::async_trait;

use super::{DocumentScan, StoredTodo, TodoStore};
use crate::error::StoreResult;
use crate::todo::{TodoDocument, TodoId};

/// Persists nothing. Every write succeeds, every read is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

#[async_trait]
impl TodoStore for NullStore {
    fn name(&self) -> &'static str {
        "null"
    }

    fn is_persistent(&self) -> bool {
        false
    }

    async fn create(&self, _document: &TodoDocument) -> StoreResult<Option<TodoId>> {
        Ok(None)
    }

    async fn find_by_id(&self, _id: &TodoId) -> StoreResult<Option<TodoDocument>> {
        Ok(None)
    }

    async fn find_all(&self) -> StoreResult<DocumentScan> {
        Ok(DocumentScan::default())
    }

    async fn find_by_tag_contains(&self, _tag: &str) -> StoreResult<Vec<StoredTodo>> {
        Ok(Vec::new())
    }

    async fn update_by_id(&self, _id: &TodoId, _document: &TodoDocument) -> StoreResult<bool> {
        Ok(true)
    }

    async fn upsert_by_id(&self, _id: &TodoId, _document: &TodoDocument) -> StoreResult<()> {
        Ok(())
    }

    async fn delete_by_id(&self, _id: &TodoId) -> StoreResult<bool> {
        Ok(true)
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        Ok(0)
    }

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}
