//! Lifecycle synchronization between the repository and its store.
//!
//! [`TodoRepository::load_all`] runs once before requests are served and
//! [`TodoRepository::flush_all`] once during graceful shutdown, before
//! [`TodoRepository::close`]. Both are best-effort: failures are logged and
//! reported, never returned.

use super::TodoRepository;
use crate::store::StoredTodo;
use crate::tags::TagSet;
use crate::todo::Todo;

/// Outcome of a load or flush pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Todos loaded into memory or written to the store
    pub synced: usize,
    /// Persisted documents ignored because they break todo invariants
    pub skipped: usize,
    /// Store operations that failed
    pub failed: usize,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.failed == 0
    }
}

impl TodoRepository {
    /// Replace the in-memory table with every persisted document.
    ///
    /// The id allocator moves to one past the largest numeric key in the
    /// store, including keys whose body could not be decoded. If the store
    /// cannot be read the repository keeps its current (empty) state.
    pub async fn load_all(&self) -> SyncReport {
        let mut report = SyncReport::default();

        let stored = match self.store.find_all().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(
                    "Failed to load todos from {} store: {}, starting empty",
                    self.store.name(),
                    e
                );
                report.failed = 1;
                return report;
            }
        };

        for id in &stored.undecodable {
            tracing::warn!("Skipping persisted todo {} with undecodable body", id);
        }
        report.skipped += stored.undecodable.len();

        let mut table = self.table.write().await;
        table.todos.clear();

        for StoredTodo { id, document } in stored.documents {
            if document.title.is_empty() {
                tracing::warn!("Skipping persisted todo {} with empty title", id);
                report.skipped += 1;
                continue;
            }

            let (tags, dropped) = TagSet::from_lenient(document.tags);
            if dropped > 0 {
                tracing::debug!("Dropped {} invalid tags from persisted todo {}", dropped, id);
            }

            let todo = Todo {
                id: id.clone(),
                title: document.title,
                order: document.order,
                completed: document.completed,
                tags,
            };
            table.todos.insert(id, todo);
            report.synced += 1;
        }

        let table = &mut *table;
        // undecodable keys still occupy their ids
        table
            .ids
            .reconcile(table.todos.keys().chain(&stored.undecodable));

        tracing::info!(
            "Loaded {} todos from {} store (next id {})",
            report.synced,
            self.store.name(),
            table.ids.peek()
        );
        report
    }

    /// Write every in-memory todo back to the store, upserting by id.
    ///
    /// Individual failures are counted and logged; the pass continues.
    pub async fn flush_all(&self) -> SyncReport {
        let mut report = SyncReport::default();

        if !self.store.is_persistent() {
            tracing::debug!("No persistent store configured, nothing to flush");
            return report;
        }

        let table = self.table.read().await;
        for todo in table.todos.values() {
            match self.store.upsert_by_id(&todo.id, &todo.to_document()).await {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    tracing::warn!("Failed to flush todo {}: {}", todo.id, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Flushed {} todos to {} store ({} failed)",
            report.synced,
            self.store.name(),
            report.failed
        );
        report
    }

    /// Close the store connection. Failures are logged.
    pub async fn close(&self) {
        if let Err(e) = self.store.close().await {
            tracing::warn!("Failed to close {} store: {}", self.store.name(), e);
        }
    }
}
