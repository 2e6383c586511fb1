// ============================================================================
// piglet - Type Definitions
// Keys, payloads and change records shared by the runtime subsystems
// ============================================================================

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Index of a node in the document arena.
pub type NodeId = usize;

/// Stable identity of a component instance: class name plus a monotonic
/// instance number. Instance 0 is reserved for the tree root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey {
    name: String,
    index: u64,
}

impl ComponentKey {
    pub fn new(name: impl Into<String>, index: u64) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    /// Class name part of the key
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance number part of the key
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn is_root(&self) -> bool {
        self.index == 0
    }

    /// Registry key of a state path owned by this component.
    pub fn path(&self, path: &str) -> String {
        format!("{self}.{path}")
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.index)
    }
}

// =============================================================================
// STATE PAYLOAD
// =============================================================================

/// Payload held by a state cell.
///
/// `Data` is plain serializable data and is deep-copied on store.
/// `Shared` is an already-materialized reference: it is stored as-is and
/// never re-cloned. `Opaque` is a handle to something that cannot be
/// serialized (a callback, a host object); copying it fails and cells
/// fall back to storing the reference.
#[derive(Clone)]
pub enum StateValue {
    Data(Value),
    Shared(Rc<RefCell<Value>>),
    Opaque(Rc<dyn Any>),
}

/// Error produced when a payload cannot be copied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotCloneable;

impl StateValue {
    /// Wrap anything convertible to JSON.
    pub fn data(value: impl Into<Value>) -> Self {
        StateValue::Data(value.into())
    }

    /// Wrap a value as an already-materialized shared reference.
    pub fn shared(value: impl Into<Value>) -> Self {
        StateValue::Shared(Rc::new(RefCell::new(value.into())))
    }

    pub fn opaque<T: Any>(value: T) -> Self {
        StateValue::Opaque(Rc::new(value))
    }

    pub fn null() -> Self {
        StateValue::Data(Value::Null)
    }

    /// Copy the payload with value semantics.
    ///
    /// Shared references are returned as-is; opaque handles cannot be
    /// copied.
    pub fn try_clone_deep(&self) -> Result<StateValue, NotCloneable> {
        match self {
            StateValue::Data(v) => Ok(StateValue::Data(v.clone())),
            StateValue::Shared(rc) => Ok(StateValue::Shared(rc.clone())),
            StateValue::Opaque(_) => Err(NotCloneable),
        }
    }

    /// JSON view of the payload. Opaque handles render as `null`.
    pub fn to_json(&self) -> Value {
        match self {
            StateValue::Data(v) => v.clone(),
            StateValue::Shared(rc) => rc.borrow().clone(),
            StateValue::Opaque(_) => Value::Null,
        }
    }

    /// JavaScript-style truthiness, used by conditional components.
    pub fn is_truthy(&self) -> bool {
        match self {
            StateValue::Opaque(_) => true,
            other => json_truthy(&other.to_json()),
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, StateValue::Opaque(_))
    }

    /// True when both values point at the same storage (or are equal data).
    pub fn same_as(&self, other: &StateValue) -> bool {
        match (self, other) {
            (StateValue::Data(a), StateValue::Data(b)) => a == b,
            (StateValue::Shared(a), StateValue::Shared(b)) => Rc::ptr_eq(a, b),
            (StateValue::Opaque(a), StateValue::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn json_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl From<Value> for StateValue {
    fn from(value: Value) -> Self {
        StateValue::Data(value)
    }
}

macro_rules! state_value_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for StateValue {
                fn from(value: $t) -> Self {
                    StateValue::Data(Value::from(value))
                }
            }
        )*
    };
}

state_value_from!(bool, i32, i64, u32, u64, f64, String, &str);

impl fmt::Debug for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Data(v) => f.debug_tuple("Data").field(v).finish(),
            StateValue::Shared(rc) => f.debug_tuple("Shared").field(&*rc.borrow()).finish(),
            StateValue::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

// =============================================================================
// CHANGE RECORDS
// =============================================================================

/// Which notification path a cell dispatched on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Value,
    Reference,
}

/// One state-cell notification.
#[derive(Clone, Debug)]
pub struct StateChange {
    /// Full registry key (`Counter1.count`)
    pub path: String,
    pub new: StateValue,
    pub old: StateValue,
    pub kind: ChangeKind,
}

/// One attribute mutation, in the shape a mutation observer records it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeChange {
    pub name: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn component_key_formats_name_and_index() {
        let key = ComponentKey::new("Counter", 3);
        assert_eq!(key.to_string(), "Counter3");
        assert_eq!(key.path("count"), "Counter3.count");
        assert!(!key.is_root());
        assert!(ComponentKey::new("App", 0).is_root());
    }

    #[test]
    fn deep_clone_isolates_data() {
        let original = StateValue::data(json!({"items": [1, 2]}));
        let copy = original.try_clone_deep().unwrap();
        assert!(copy.same_as(&original));
        assert_eq!(copy.to_json(), json!({"items": [1, 2]}));
    }

    #[test]
    fn shared_values_are_not_recloned() {
        let shared = StateValue::shared(json!([1]));
        let copy = shared.try_clone_deep().unwrap();
        if let (StateValue::Shared(a), StateValue::Shared(b)) = (&shared, &copy) {
            assert!(Rc::ptr_eq(a, b));
        } else {
            panic!("expected shared values");
        }
    }

    #[test]
    fn opaque_values_cannot_be_cloned() {
        let handle = StateValue::opaque(|| 42);
        assert_eq!(handle.try_clone_deep().unwrap_err(), NotCloneable);
        assert!(handle.is_truthy());
        assert_eq!(handle.to_json(), Value::Null);
    }

    #[test]
    fn truthiness_follows_script_rules() {
        assert!(!StateValue::null().is_truthy());
        assert!(!StateValue::data(0).is_truthy());
        assert!(!StateValue::data("").is_truthy());
        assert!(!StateValue::data(false).is_truthy());
        assert!(StateValue::data(1).is_truthy());
        assert!(StateValue::data("no").is_truthy());
        assert!(StateValue::data(json!([])).is_truthy());
    }
}
