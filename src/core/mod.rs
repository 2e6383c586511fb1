// ============================================================================
// piglet - Core Module
// Shared types, wire constants and the runtime context
// ============================================================================

pub mod constants;
pub mod context;
pub mod types;

pub use constants::*;
pub use context::{reset, reset_with, runtime, with_runtime, Runtime, RuntimeOptions, WeakRuntime};
pub use types::{AttributeChange, ChangeKind, ComponentKey, NodeId, NotCloneable, StateChange, StateValue};
