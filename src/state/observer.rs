// ============================================================================
// piglet - Observers
// Capability records bound to state cells
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::core::types::StateChange;

/// Callback invoked with one change record.
pub type ChangeFn = Box<dyn Fn(&StateChange)>;

// =============================================================================
// CAPABILITIES
// =============================================================================

/// Which callbacks an observer implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capabilities {
    /// Only the value-change callback
    Value,
    /// Only the reference-change callback
    Reference,
    /// Both callbacks
    Both,
}

impl Capabilities {
    pub fn handles_value(self) -> bool {
        matches!(self, Capabilities::Value | Capabilities::Both)
    }

    pub fn handles_reference(self) -> bool {
        matches!(self, Capabilities::Reference | Capabilities::Both)
    }
}

// =============================================================================
// OBSERVER
// =============================================================================

/// A capability record `{ value_changed, ref_changed? }`.
///
/// Cells hold observers behind `Rc` and remove them by identity.
pub struct Observer {
    on_value: Option<ChangeFn>,
    on_reference: Option<ChangeFn>,
}

impl Observer {
    /// Observer that only handles value-semantics cells.
    pub fn value(f: impl Fn(&StateChange) + 'static) -> Rc<Self> {
        Rc::new(Self {
            on_value: Some(Box::new(f)),
            on_reference: None,
        })
    }

    /// Observer that only handles reference-semantics cells.
    pub fn reference(f: impl Fn(&StateChange) + 'static) -> Rc<Self> {
        Rc::new(Self {
            on_value: None,
            on_reference: Some(Box::new(f)),
        })
    }

    /// Observer implementing both callbacks.
    pub fn both(
        on_value: impl Fn(&StateChange) + 'static,
        on_reference: impl Fn(&StateChange) + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            on_value: Some(Box::new(on_value)),
            on_reference: Some(Box::new(on_reference)),
        })
    }

    pub fn capabilities(&self) -> Capabilities {
        match (self.on_value.is_some(), self.on_reference.is_some()) {
            (true, true) => Capabilities::Both,
            (false, true) => Capabilities::Reference,
            // Constructors never build an observer with neither callback
            _ => Capabilities::Value,
        }
    }

    /// Invoke the value-change callback if implemented.
    pub fn value_changed(&self, change: &StateChange) -> bool {
        match &self.on_value {
            Some(f) => {
                f(change);
                true
            }
            None => false,
        }
    }

    /// Invoke the reference-change callback if implemented.
    pub fn ref_changed(&self, change: &StateChange) -> bool {
        match &self.on_reference {
            Some(f) => {
                f(change);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}
