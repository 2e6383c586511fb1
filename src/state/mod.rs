// ============================================================================
// piglet - State Module
// State cells, observers, the herd registry and nested state wrapping
// ============================================================================

pub mod cell;
pub mod deep;
pub mod herd;
pub mod observer;

pub use cell::{StateCell, Storage};
pub use deep::{wrap_deep, DeepState};
pub use herd::{Herd, Observation, StateAccessor, StateOptions, StateSubscriber};
pub use observer::{Capabilities, ChangeFn, Observer};
