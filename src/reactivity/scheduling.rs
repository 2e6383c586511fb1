// ============================================================================
// piglet - Deferred Scheduling
// A microtask queue that runs work after the current synchronous turn
// ============================================================================
//
// The runtime is single-threaded and cooperative. Work that must observe
// every synchronous mutation of a turn (batched flushes) is queued here
// and runs when the host ends the turn with `run_until_idle()`. Tasks
// queued while draining run in the same drain, before control returns.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use tracing::trace;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Upper bound on tasks executed by one drain, guarding against flushes
/// that keep rescheduling each other.
pub const MAX_TASKS_PER_DRAIN: usize = 100_000;

// =============================================================================
// SCHEDULER
// =============================================================================

pub struct Scheduler {
    queue: RefCell<VecDeque<Task>>,
    draining: Cell<bool>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
            draining: Cell::new(false),
        }
    }

    /// Queue a task to run after the current synchronous turn.
    pub fn queue_microtask(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Number of tasks waiting to run
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Whether a drain is in progress
    pub fn is_draining(&self) -> bool {
        self.draining.get()
    }

    /// End the current turn: run queued tasks in FIFO order until the queue
    /// is empty. Returns the number of tasks run.
    ///
    /// Re-entrant calls (from inside a task) return 0 and leave the work to
    /// the outer drain.
    pub fn run_until_idle(&self) -> usize {
        if self.draining.replace(true) {
            return 0;
        }

        struct DrainGuard<'a>(&'a Cell<bool>);
        impl Drop for DrainGuard<'_> {
            fn drop(&mut self) {
                self.0.set(false);
            }
        }
        let _guard = DrainGuard(&self.draining);

        let mut ran = 0;
        loop {
            // Release the borrow before running the task
            let next = self.queue.borrow_mut().pop_front();
            let Some(task) = next else { break };
            task();
            ran += 1;

            if ran >= MAX_TASKS_PER_DRAIN {
                tracing::warn!(
                    remaining = self.pending(),
                    "microtask drain limit reached, deferring the rest to the next turn"
                );
                break;
            }
        }

        if ran > 0 {
            trace!(ran, "microtask drain complete");
        }
        ran
    }

    /// Drop every queued task without running it.
    pub fn clear(&self) {
        self.queue.borrow_mut().clear();
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
