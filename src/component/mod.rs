// ============================================================================
// piglet - Component Module
// Definitions, the lifecycle state machine, reasons and the conditional
// ============================================================================

pub mod conditional;
pub mod definition;
pub mod lifecycle;
pub mod reason;

pub use definition::{ComponentDefinition, Registry, SetupFn};
pub use lifecycle::{Component, HookFn, Lifecycle};
pub use reason::{Reason, ReasonData, ReasonName};
