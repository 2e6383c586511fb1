// ============================================================================
// piglet - Single-File Components for Custom Elements
// ============================================================================
//
// Two halves that share one set of wire conventions:
//
// - the compiler turns `*.pig.html` sources into an HTML fragment, a script
//   module and a class module per component
// - the runtime gives every custom element a state cell store, an attribute
//   pipeline, a parent-before-children mount order and a batched update
//   scheduler, against an in-process document
//
// All runtime work happens on one thread. `Runtime::tick()` ends the
// current turn and runs the deferred flushes it queued.
// ============================================================================

pub mod compiler;
pub mod component;
pub mod core;
pub mod dom;
pub mod error;
pub mod hot_reload;
pub mod naming;
pub mod reactivity;
pub mod state;
pub mod tracker;

mod macros;

// Runtime context at the crate root
pub use core::constants;
pub use core::context::{reset, reset_with, runtime, with_runtime, Runtime, RuntimeOptions, WeakRuntime};
pub use core::types::{
    AttributeChange, ChangeKind, ComponentKey, NodeId, NotCloneable, StateChange, StateValue,
};

pub use component::{Component, ComponentDefinition, Lifecycle, Reason, ReasonData, ReasonName};
pub use dom::{Document, NodeKind, DOCUMENT_NODE};
pub use error::{CompileError, CompileResult, RuntimeError, RuntimeResult};
pub use hot_reload::{HotReloadMessage, ReloadAction};
pub use state::{DeepState, Herd, Observation, StateAccessor, StateCell, StateOptions, Storage};
pub use tracker::{TreeNode, TreeTracker};

pub use compiler::{BuildReport, Compiler, CompilerConfig, ScriptTransformer, TemplateCompiler};

// =============================================================================
// TESTS
// =============================================================================
