//! Id allocation for todos created without a document store.

use crate::todo::TodoId;

/// First id handed out by a fresh allocator
pub const DEFAULT_START: u64 = 0;

/// Produces monotonically increasing numeric ids.
///
/// After loading persisted todos, [`IdAllocator::reconcile`] moves the next
/// value past every numeric id observed. Store-assigned keys do not take part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::starting_at(DEFAULT_START)
    }

    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// Hand out the next id
    pub fn allocate(&mut self) -> TodoId {
        let id = self.next;
        self.next += 1;
        TodoId::Seq(id)
    }

    /// The value the next call to [`IdAllocator::allocate`] will use
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Recompute the next value as `max(numeric ids) + 1`.
    ///
    /// With no numeric ids the current value is kept.
    pub fn reconcile<'a>(&mut self, ids: impl IntoIterator<Item = &'a TodoId>) {
        if let Some(max) = ids.into_iter().filter_map(TodoId::as_seq).max() {
            self.next = max + 1;
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
