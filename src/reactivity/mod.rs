// ============================================================================
// piglet - Reactivity Module
// Deferred scheduling and per-kind change batching
// ============================================================================

pub mod batching;
pub mod scheduling;

pub use batching::PendingQueue;
pub use scheduling::{Scheduler, Task, MAX_TASKS_PER_DRAIN};
