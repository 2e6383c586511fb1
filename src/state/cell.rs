// ============================================================================
// piglet - State Cell
// A single observable value with a clone policy and an observer list
// ============================================================================
//
// A cell stores either a copy of what it was given (value semantics) or
// the handle itself (reference semantics). Observers are notified in
// registration order. Value cells only call value-change callbacks and
// reference cells only call reference-change callbacks, never both.
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use crate::core::types::{ChangeKind, StateChange, StateValue};
use crate::state::observer::Observer;

// =============================================================================
// STORAGE OUTCOME
// =============================================================================

/// How a payload ended up stored in a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Storage {
    /// A private copy was stored
    Copied,
    /// The handle itself was stored on purpose (ref cell, shared value or
    /// `avoid_clone`)
    Referenced,
    /// Copying failed; the handle was stored instead and a warning emitted
    ReferenceFallback,
}

impl Storage {
    pub fn is_fallback(self) -> bool {
        self == Storage::ReferenceFallback
    }
}

// =============================================================================
// STATE CELL
// =============================================================================

pub struct StateCell {
    key: String,
    value: RefCell<StateValue>,
    is_ref: bool,
    observers: RefCell<Vec<Rc<Observer>>>,
}

impl StateCell {
    /// Create a cell holding `initial` under the clone policy.
    ///
    /// The payload is copied unless the cell has reference semantics,
    /// `avoid_clone` is set, or the payload is already a shared reference.
    pub fn create(
        key: impl Into<String>,
        initial: &StateValue,
        is_ref: bool,
        avoid_clone: bool,
    ) -> (Rc<Self>, Storage) {
        let key = key.into();
        let (value, storage) = store(&key, initial, is_ref || avoid_clone);
        let cell = Rc::new(Self {
            key,
            value: RefCell::new(value),
            is_ref,
            observers: RefCell::new(Vec::new()),
        });
        (cell, storage)
    }

    /// Registry key of this cell
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_ref(&self) -> bool {
        self.is_ref
    }

    /// Current payload (a handle clone; data payloads are copied)
    pub fn get(&self) -> StateValue {
        self.value.borrow().clone()
    }

    /// Access the current payload without copying it.
    pub fn with<R>(&self, f: impl FnOnce(&StateValue) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Store a new payload and notify observers.
    ///
    /// Dispatches on the reference-change path for reference cells and on
    /// the value-change path otherwise.
    pub fn set(&self, new_value: &StateValue) -> Storage {
        let (stored, storage) = store(&self.key, new_value, self.is_ref);
        let old = self.value.replace(stored.clone());

        let change = StateChange {
            path: self.key.clone(),
            new: stored,
            old,
            kind: if self.is_ref {
                ChangeKind::Reference
            } else {
                ChangeKind::Value
            },
        };
        self.dispatch(&change);
        storage
    }

    fn dispatch(&self, change: &StateChange) {
        // Snapshot so callbacks may add or remove observers
        let observers: Vec<Rc<Observer>> = self.observers.borrow().clone();
        for observer in observers {
            if self.is_ref {
                observer.ref_changed(change);
            } else {
                observer.value_changed(change);
            }
        }
    }

    pub fn add_observer(&self, observer: Rc<Observer>) {
        self.observers.borrow_mut().push(observer);
    }

    /// Remove an observer by identity. Returns false if it was not present.
    pub fn remove_observer(&self, observer: &Rc<Observer>) -> bool {
        let mut observers = self.observers.borrow_mut();
        match observers.iter().position(|o| Rc::ptr_eq(o, observer)) {
            Some(index) => {
                observers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    pub fn clear_observers(&self) {
        self.observers.borrow_mut().clear();
    }
}

impl std::fmt::Debug for StateCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCell")
            .field("key", &self.key)
            .field("value", &*self.value.borrow())
            .field("is_ref", &self.is_ref)
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Apply the clone policy to one payload.
fn store(key: &str, value: &StateValue, by_reference: bool) -> (StateValue, Storage) {
    if by_reference || matches!(value, StateValue::Shared(_)) {
        return (value.clone(), Storage::Referenced);
    }
    match value.try_clone_deep() {
        Ok(copy) => (copy, Storage::Copied),
        Err(_) => {
            warn!(key, "state payload is not cloneable, storing it by reference");
            (value.clone(), Storage::ReferenceFallback)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
