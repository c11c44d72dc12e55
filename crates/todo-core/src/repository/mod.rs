//! Authoritative in-memory projection of all todos.
//!
//! Every operation resolves against the in-memory table. When the configured
//! store is persistent, a mutation is written to the store while the table
//! write lock is held and only applied in memory once the store accepted it,
//! so a failed write leaves both sides unchanged.

mod sync;
mod tags;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{Result, TodoError};
use crate::ids::IdAllocator;
use crate::store::{NullStore, TodoStore};
use crate::todo::{NewTodo, Todo, TodoId, TodoPatch};

pub use sync::SyncReport;

/// Table state guarded by one lock so id allocation and insertion are atomic
#[derive(Debug, Default)]
struct TodoTable {
    todos: BTreeMap<TodoId, Todo>,
    ids: IdAllocator,
}

/// Repository of todos backed by a [`TodoStore`]
pub struct TodoRepository {
    table: RwLock<TodoTable>,
    store: Arc<dyn TodoStore>,
}

impl TodoRepository {
    /// Create an empty repository persisting through `store`
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self {
            table: RwLock::new(TodoTable::default()),
            store,
        }
    }

    /// Create a repository that persists nothing
    pub fn in_memory() -> Self {
        Self::new(Arc::new(NullStore))
    }

    /// Start allocating ids at `next` instead of the default
    pub fn with_id_start(self, next: u64) -> Self {
        Self {
            table: RwLock::new(TodoTable {
                todos: BTreeMap::new(),
                ids: IdAllocator::starting_at(next),
            }),
            store: self.store,
        }
    }

    pub fn store(&self) -> &Arc<dyn TodoStore> {
        &self.store
    }

    /// Whether changes reach durable storage
    pub fn is_persistent(&self) -> bool {
        self.store.is_persistent()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.todos.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.todos.is_empty()
    }

    /// All todos in id order
    pub async fn list(&self) -> Vec<Todo> {
        self.table.read().await.todos.values().cloned().collect()
    }

    pub async fn get(&self, id: &TodoId) -> Result<Todo> {
        self.table
            .read()
            .await
            .todos
            .get(id)
            .cloned()
            .ok_or_else(|| TodoError::NotFound(id.clone()))
    }

    /// Create a todo.
    ///
    /// The store assigns the id when it generates keys; otherwise the
    /// allocator does. Nothing is inserted if the store write fails.
    pub async fn add(&self, payload: NewTodo) -> Result<Todo> {
        payload.validate()?;

        let mut table = self.table.write().await;
        let document = payload.to_document();
        let assigned = self.store.create(&document).await.map_err(|e| {
            tracing::error!("Failed to persist new todo '{}': {}", payload.title, e);
            e
        })?;
        let id = match assigned {
            Some(id) => id,
            None => table.ids.allocate(),
        };

        let todo = Todo::new(id.clone(), payload);
        table.todos.insert(id, todo.clone());
        tracing::debug!("Added todo {}", todo.id);
        Ok(todo)
    }

    /// Shallow-merge `patch` into an existing todo
    pub async fn update(&self, id: &TodoId, patch: TodoPatch) -> Result<Todo> {
        self.modify(id, |todo| {
            let before = todo.clone();
            patch.apply(todo);
            Ok(*todo != before)
        })
        .await
    }

    /// Delete a todo. A store failure leaves it in place.
    pub async fn remove(&self, id: &TodoId) -> Result<()> {
        let mut table = self.table.write().await;
        if !table.todos.contains_key(id) {
            return Err(TodoError::NotFound(id.clone()));
        }

        let existed = self.store.delete_by_id(id).await.map_err(|e| {
            tracing::error!("Failed to delete todo {} from {} store: {}", id, self.store.name(), e);
            e
        })?;
        if !existed {
            tracing::debug!("Todo {} was not persisted in {} store", id, self.store.name());
        }

        table.todos.remove(id);
        tracing::debug!("Removed todo {}", id);
        Ok(())
    }

    /// Delete every todo, in memory and in the store.
    ///
    /// Clearing the store is best-effort: a failure is logged, not returned.
    /// The id allocator keeps counting so ids are never reused.
    pub async fn clear(&self) {
        let mut table = self.table.write().await;
        let count = table.todos.len();
        table.todos.clear();

        match self.store.delete_all().await {
            Ok(deleted) => {
                tracing::info!("Cleared {} todos ({} persisted documents)", count, deleted)
            }
            Err(e) => tracing::warn!(
                "Cleared {} todos in memory but failed to clear {} store: {}",
                count,
                self.store.name(),
                e
            ),
        }
    }

    /// Read-modify-write of a single todo.
    ///
    /// `change` edits a copy and reports whether anything changed; unchanged
    /// todos skip the store round-trip.
    async fn modify<F>(&self, id: &TodoId, change: F) -> Result<Todo>
    where
        F: FnOnce(&mut Todo) -> Result<bool> + Send,
    {
        let mut table = self.table.write().await;
        let mut todo = table
            .todos
            .get(id)
            .cloned()
            .ok_or_else(|| TodoError::NotFound(id.clone()))?;

        if !change(&mut todo)? {
            return Ok(todo);
        }

        self.persist(&todo).await?;
        table.todos.insert(id.clone(), todo.clone());
        Ok(todo)
    }

    /// Write a todo's current state to the store.
    ///
    /// A document missing from the store (e.g. created before the store
    /// became reachable) is re-inserted under the same key.
    async fn persist(&self, todo: &Todo) -> Result<()> {
        let document = todo.to_document();
        let found = self
            .store
            .update_by_id(&todo.id, &document)
            .await
            .map_err(|e| {
                tracing::error!("Failed to persist todo {}: {}", todo.id, e);
                e
            })?;

        if !found {
            tracing::warn!(
                "Todo {} missing from {} store, re-inserting",
                todo.id,
                self.store.name()
            );
            self.store
                .upsert_by_id(&todo.id, &document)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to re-insert todo {}: {}", todo.id, e);
                    TodoError::Store(e)
                })?;
        }
        Ok(())
    }
}

impl Default for TodoRepository {
    fn default() -> Self {
        Self::in_memory()
    }
}
