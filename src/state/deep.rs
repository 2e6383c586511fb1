// ============================================================================
// piglet - Nested State
// Explicit recursive wrapping of JSON objects into per-field cells
// ============================================================================
//
// `wrap_deep` walks an object once and creates one cell per nested field
// path (`user`, `user.name`, `user.address.city`), so components can bind
// to any depth. A deep set only notifies sub-cells whose sub-value
// actually changed. The shape is fixed when wrapped: fields added later
// live in their parent's value but get no cell of their own.
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::types::StateValue;
use crate::state::cell::Storage;
use crate::state::herd::{Herd, StateAccessor, StateOptions};

/// A cell plus one child per object field.
#[derive(Clone, Debug)]
pub struct DeepState {
    accessor: StateAccessor,
    fields: BTreeMap<String, DeepState>,
}

/// Create (or reuse) cells for `key` and every nested object field under it.
pub fn wrap_deep(herd: &Herd, key: &str, value: &Value) -> DeepState {
    let accessor = herd.state_at(key, &StateValue::Data(value.clone()), StateOptions::default());
    let fields = match value {
        Value::Object(map) => map
            .iter()
            .map(|(name, sub)| (name.clone(), wrap_deep(herd, &format!("{key}.{name}"), sub)))
            .collect(),
        _ => BTreeMap::new(),
    };
    DeepState { accessor, fields }
}

impl DeepState {
    pub fn key(&self) -> &str {
        self.accessor.key()
    }

    pub fn json(&self) -> Value {
        self.accessor.json()
    }

    pub fn accessor(&self) -> &StateAccessor {
        &self.accessor
    }

    pub fn field(&self, name: &str) -> Option<&DeepState> {
        self.fields.get(name)
    }

    /// Follow a dotted path (`address.city`) down the wrapped fields.
    pub fn at(&self, dotted: &str) -> Option<&DeepState> {
        dotted
            .split('.')
            .try_fold(self, |node, part| node.fields.get(part))
    }

    /// Store `value` here and push the changed parts down to field cells.
    ///
    /// Returns the number of cells that were written.
    pub fn set(&self, value: Value) -> usize {
        self.set_inner(value, true)
    }

    fn set_inner(&self, value: Value, force: bool) -> usize {
        if !force && self.accessor.json() == value {
            return 0;
        }
        let mut written = 0;
        for (name, field) in &self.fields {
            let sub = value.get(name).cloned().unwrap_or(Value::Null);
            written += field.set_inner(sub, false);
        }
        let storage = self.accessor.set(StateValue::Data(value));
        debug_assert_ne!(storage, Storage::ReferenceFallback);
        written + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::StateChange;
    use crate::state::observer::Observer;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(herd: &Herd, key: &str) -> Rc<RefCell<Vec<Value>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        herd.cell(key)
            .expect("cell exists")
            .add_observer(Observer::value(move |c: &StateChange| {
                s.borrow_mut().push(c.new.to_json())
            }));
        seen
    }

    #[test]
    fn wrapping_creates_a_cell_per_field_path() {
        let herd = Herd::new();
        let user = wrap_deep(
            &herd,
            "App0.user",
            &json!({"name": "ada", "address": {"city": "london"}}),
        );

        assert!(herd.contains("App0.user"));
        assert!(herd.contains("App0.user.name"));
        assert!(herd.contains("App0.user.address.city"));
        assert_eq!(user.at("address.city").unwrap().json(), json!("london"));
        assert!(user.at("address.zip").is_none());
    }

    #[test]
    fn deep_set_only_notifies_changed_fields() {
        let herd = Herd::new();
        let user = wrap_deep(&herd, "App0.user", &json!({"name": "ada", "age": 36}));
        let names = record(&herd, "App0.user.name");
        let ages = record(&herd, "App0.user.age");
        let whole = record(&herd, "App0.user");

        let written = user.set(json!({"name": "ada", "age": 37}));

        assert_eq!(written, 2);
        assert!(names.borrow().is_empty());
        assert_eq!(*ages.borrow(), vec![json!(37)]);
        assert_eq!(whole.borrow().len(), 1);
    }

    #[test]
    fn removed_fields_become_null() {
        let herd = Herd::new();
        let user = wrap_deep(&herd, "App0.user", &json!({"name": "ada"}));
        user.set(json!({}));
        assert_eq!(user.field("name").unwrap().json(), Value::Null);
    }
}
