// ============================================================================
// piglet - Batching
// Per-kind pending queues that coalesce one turn's changes into one flush
// ============================================================================

use std::cell::{Cell, RefCell};

// =============================================================================
// PENDING QUEUE
// =============================================================================

/// FIFO of change records waiting for the next flush.
///
/// `push` reports whether it opened a new batch, so the caller schedules
/// exactly one deferred flush per batch; later pushes in the same turn
/// join it.
pub struct PendingQueue<T> {
    items: RefCell<Vec<T>>,
    open: Cell<bool>,
}

impl<T> PendingQueue<T> {
    pub fn new() -> Self {
        Self {
            items: RefCell::new(Vec::new()),
            open: Cell::new(false),
        }
    }

    /// Append a record. Returns true when this push opened the batch.
    pub fn push(&self, item: T) -> bool {
        self.items.borrow_mut().push(item);
        !self.open.replace(true)
    }

    /// Take the whole batch, closing it.
    pub fn drain(&self) -> Vec<T> {
        self.open.set(false);
        self.items.replace(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.open.set(false);
        self.items.borrow_mut().clear();
    }
}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
