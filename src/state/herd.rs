// ============================================================================
// piglet - Herd (observer registry)
// Maps logical paths to state cells and binds components to them
// ============================================================================
//
// Paths are `ownerKey.path` strings. A component may observe a path whose
// cell does not exist yet: the pair is parked as the single waiter for
// that path and bound as soon as the cell is created. Each
// (component, path) pair has at most one live binding; observing again
// replaces the previous binding.
// ============================================================================

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, trace};

use crate::core::types::{ComponentKey, StateChange, StateValue};
use crate::state::cell::{StateCell, Storage};
use crate::state::observer::Observer;

// =============================================================================
// SUBSCRIBER SEAM
// =============================================================================

/// The change-handling entry point of something that observes state
/// (in practice, a component).
pub trait StateSubscriber {
    fn subscriber_key(&self) -> ComponentKey;

    fn state_changed(&self, change: &StateChange);
}

/// Options for creating a state cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StateOptions {
    /// Reference semantics: observers get the reference-change callback
    pub as_ref: bool,
    /// Store the initial payload without copying it
    pub avoid_clone: bool,
}

impl StateOptions {
    pub fn by_reference() -> Self {
        Self {
            as_ref: true,
            avoid_clone: false,
        }
    }
}

/// Result of an `observe` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observation {
    /// An observer is attached to the cell
    Bound,
    /// No cell yet; the pair waits for the cell to be created
    Deferred,
}

// =============================================================================
// ACCESSOR
// =============================================================================

/// Explicit `value` accessor for one cell.
#[derive(Clone, Debug)]
pub struct StateAccessor {
    cell: Rc<StateCell>,
    created: Option<Storage>,
}

impl StateAccessor {
    /// Accessor over a private cell that no registry knows about.
    pub fn detached(key: &str, initial: &StateValue, options: StateOptions) -> Self {
        let (cell, storage) = StateCell::create(key, initial, options.as_ref, options.avoid_clone);
        Self {
            cell,
            created: Some(storage),
        }
    }

    pub fn get(&self) -> StateValue {
        self.cell.get()
    }

    /// JSON view of the current value
    pub fn json(&self) -> Value {
        self.cell.with(|v| v.to_json())
    }

    pub fn set(&self, value: impl Into<StateValue>) -> Storage {
        self.cell.set(&value.into())
    }

    /// Edit the JSON payload in place and store the result.
    pub fn update(&self, f: impl FnOnce(&mut Value)) -> Storage {
        let mut value = self.json();
        f(&mut value);
        self.cell.set(&StateValue::Data(value))
    }

    pub fn key(&self) -> &str {
        self.cell.key()
    }

    /// How the initial payload was stored, if this call created the cell.
    pub fn created(&self) -> Option<Storage> {
        self.created
    }

    pub fn cell(&self) -> &Rc<StateCell> {
        &self.cell
    }
}

// =============================================================================
// HERD
// =============================================================================

struct Binding {
    remover: Box<dyn FnOnce()>,
}

struct Waiter {
    subscriber: Weak<dyn StateSubscriber>,
    key: ComponentKey,
}

type BindingKey = (ComponentKey, String);

pub struct Herd {
    cells: RefCell<HashMap<String, Rc<StateCell>>>,
    bindings: RefCell<HashMap<BindingKey, Binding>>,
    waiters: RefCell<HashMap<String, Waiter>>,
}

impl Herd {
    pub fn new() -> Self {
        Self {
            cells: RefCell::new(HashMap::new()),
            bindings: RefCell::new(HashMap::new()),
            waiters: RefCell::new(HashMap::new()),
        }
    }

    // =========================================================================
    // STATE
    // =========================================================================

    /// Get or create the cell for `owner.path`.
    pub fn state(
        &self,
        owner: &ComponentKey,
        path: &str,
        initial: &StateValue,
        options: StateOptions,
    ) -> StateAccessor {
        self.state_at(&owner.path(path), initial, options)
    }

    /// Get or create the cell at a full registry key.
    ///
    /// Creating the cell resolves the waiter parked on that key, if any.
    pub fn state_at(&self, key: &str, initial: &StateValue, options: StateOptions) -> StateAccessor {
        if let Some(cell) = self.cell(key) {
            return StateAccessor {
                cell,
                created: None,
            };
        }

        let (cell, storage) = StateCell::create(key, initial, options.as_ref, options.avoid_clone);
        self.cells
            .borrow_mut()
            .insert(key.to_string(), cell.clone());
        trace!(key, ?storage, "state cell created");

        let waiter = self.waiters.borrow_mut().remove(key);
        if let Some(waiter) = waiter {
            match waiter.subscriber.upgrade() {
                Some(subscriber) => {
                    debug!(key, subscriber = %waiter.key, "resolving deferred binding");
                    self.observe(&subscriber, key);
                }
                None => trace!(key, "waiter dropped before its cell was created"),
            }
        }

        StateAccessor {
            cell,
            created: Some(storage),
        }
    }

    pub fn cell(&self, key: &str) -> Option<Rc<StateCell>> {
        self.cells.borrow().get(key).cloned()
    }

    /// Current value at a full registry key
    pub fn get(&self, key: &str) -> Option<StateValue> {
        self.cell(key).map(|c| c.get())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cells.borrow().contains_key(key)
    }

    /// Whether `owner` holds any cells
    pub fn owns_state(&self, owner: &ComponentKey) -> bool {
        let prefix = format!("{owner}.");
        self.cells.borrow().keys().any(|k| k.starts_with(&prefix))
    }

    /// JSON snapshot of every cell owned by `owner`, keyed by local path.
    pub fn snapshot_owner(&self, owner: &ComponentKey) -> BTreeMap<String, Value> {
        let prefix = format!("{owner}.");
        self.cells
            .borrow()
            .iter()
            .filter_map(|(key, cell)| {
                key.strip_prefix(&prefix)
                    .map(|local| (local.to_string(), cell.with(|v| v.to_json())))
            })
            .collect()
    }

    // =========================================================================
    // BINDINGS
    // =========================================================================

    /// Bind `subscriber` to the cell at `path`, replacing any previous
    /// binding of the same pair. Parks the pair as the waiter for `path`
    /// when no cell exists yet.
    pub fn observe(&self, subscriber: &Rc<dyn StateSubscriber>, path: &str) -> Observation {
        let key = subscriber.subscriber_key();
        self.unobserve(&key, path);

        let Some(cell) = self.cell(path) else {
            trace!(path, subscriber = %key, "no cell yet, parking waiter");
            self.waiters.borrow_mut().insert(
                path.to_string(),
                Waiter {
                    subscriber: Rc::downgrade(subscriber),
                    key,
                },
            );
            return Observation::Deferred;
        };

        let on_value = Rc::downgrade(subscriber);
        let on_reference = on_value.clone();
        let observer = Observer::both(
            move |change| {
                if let Some(s) = on_value.upgrade() {
                    s.state_changed(change);
                }
            },
            move |change| {
                if let Some(s) = on_reference.upgrade() {
                    s.state_changed(change);
                }
            },
        );
        cell.add_observer(observer.clone());

        let weak_cell = Rc::downgrade(&cell);
        let remover = Box::new(move || {
            if let Some(cell) = weak_cell.upgrade() {
                cell.remove_observer(&observer);
            }
        });

        trace!(path, subscriber = %key, "binding attached");
        self.bindings
            .borrow_mut()
            .insert((key, path.to_string()), Binding { remover });
        Observation::Bound
    }

    /// Tear down the binding of `(subscriber, path)`. Also forgets a parked
    /// waiter for the pair. Returns true if anything was removed.
    pub fn unobserve(&self, subscriber: &ComponentKey, path: &str) -> bool {
        let binding = self
            .bindings
            .borrow_mut()
            .remove(&(subscriber.clone(), path.to_string()));

        let waiter_removed = {
            let mut waiters = self.waiters.borrow_mut();
            match waiters.get(path) {
                Some(w) if &w.key == subscriber => waiters.remove(path).is_some(),
                _ => false,
            }
        };

        match binding {
            Some(binding) => {
                (binding.remover)();
                true
            }
            None => waiter_removed,
        }
    }

    pub fn is_bound(&self, subscriber: &ComponentKey, path: &str) -> bool {
        self.bindings
            .borrow()
            .contains_key(&(subscriber.clone(), path.to_string()))
    }

    /// Key of the subscriber parked on `path`
    pub fn waiter_for(&self, path: &str) -> Option<ComponentKey> {
        self.waiters.borrow().get(path).map(|w| w.key.clone())
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.borrow().len()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.borrow().len()
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Drop every cell, binding and waiter belonging to `owner`.
    pub fn drop_owner(&self, owner: &ComponentKey) {
        let prefix = format!("{owner}.");

        let dropped: Vec<Rc<StateCell>> = {
            let mut cells = self.cells.borrow_mut();
            let keys: Vec<String> = cells
                .keys()
                .filter(|k| k.starts_with(&prefix))
                .cloned()
                .collect();
            keys.iter().filter_map(|k| cells.remove(k)).collect()
        };
        for cell in &dropped {
            cell.clear_observers();
        }

        let removers: Vec<Binding> = {
            let mut bindings = self.bindings.borrow_mut();
            let keys: Vec<BindingKey> = bindings
                .keys()
                .filter(|(subscriber, _)| subscriber == owner)
                .cloned()
                .collect();
            keys.iter().filter_map(|k| bindings.remove(k)).collect()
        };
        for binding in removers {
            (binding.remover)();
        }

        self.waiters.borrow_mut().retain(|_, w| &w.key != owner);
        if !dropped.is_empty() {
            debug!(owner = %owner, cells = dropped.len(), "owner state dropped");
        }
    }

    /// Forget everything. Used between tests and on full reloads.
    pub fn reset(&self) {
        let bindings: Vec<Binding> = self.bindings.borrow_mut().drain().map(|(_, b)| b).collect();
        for binding in bindings {
            (binding.remover)();
        }
        self.cells.borrow_mut().clear();
        self.waiters.borrow_mut().clear();
    }
}

impl Default for Herd {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    struct Probe {
        key: ComponentKey,
        seen: RefCell<Vec<(String, Value)>>,
    }

    impl Probe {
        fn new(name: &str, index: u64) -> Rc<Self> {
            Rc::new(Self {
                key: ComponentKey::new(name, index),
                seen: RefCell::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.seen.borrow().len()
        }
    }

    impl StateSubscriber for Probe {
        fn subscriber_key(&self) -> ComponentKey {
            self.key.clone()
        }

        fn state_changed(&self, change: &StateChange) {
            self.seen
                .borrow_mut()
                .push((change.path.clone(), change.new.to_json()));
        }
    }

    fn as_subscriber(probe: &Rc<Probe>) -> Rc<dyn StateSubscriber> {
        probe.clone()
    }

    #[test]
    fn state_creates_once_and_returns_the_same_cell() {
        let herd = Herd::new();
        let owner = ComponentKey::new("App", 0);
        let a = herd.state(&owner, "count", &StateValue::data(1), StateOptions::default());
        let b = herd.state(&owner, "count", &StateValue::data(99), StateOptions::default());

        assert_eq!(a.created(), Some(Storage::Copied));
        assert_eq!(b.created(), None);
        assert!(Rc::ptr_eq(a.cell(), b.cell()));
        assert_eq!(b.json(), json!(1));
        assert_eq!(a.key(), "App0.count");
    }

    #[test]
    fn observe_forwards_changes_to_the_subscriber() {
        let herd = Herd::new();
        let owner = ComponentKey::new("App", 0);
        let count = herd.state(&owner, "count", &StateValue::data(0), StateOptions::default());
        let probe = Probe::new("Child", 1);

        assert_eq!(herd.observe(&as_subscriber(&probe), "App0.count"), Observation::Bound);
        count.set(StateValue::data(5));

        assert_eq!(*probe.seen.borrow(), vec![("App0.count".to_string(), json!(5))]);
    }

    #[test]
    fn observing_twice_keeps_a_single_binding() {
        let herd = Herd::new();
        let owner = ComponentKey::new("App", 0);
        let count = herd.state(&owner, "count", &StateValue::data(0), StateOptions::default());
        let probe = Probe::new("Child", 1);
        let sub = as_subscriber(&probe);

        herd.observe(&sub, "App0.count");
        herd.observe(&sub, "App0.count");

        assert_eq!(count.cell().observer_count(), 1);
        assert_eq!(herd.binding_count(), 1);
        count.set(StateValue::data(1));
        assert_eq!(probe.count(), 1);
    }

    #[test]
    fn deferred_waiter_binds_on_creation_and_gets_one_notification() {
        let herd = Herd::new();
        let probe = Probe::new("Child", 1);

        assert_eq!(herd.observe(&as_subscriber(&probe), "App0.x"), Observation::Deferred);
        assert_eq!(herd.waiter_for("App0.x"), Some(ComponentKey::new("Child", 1)));
        assert_eq!(probe.count(), 0);

        let owner = ComponentKey::new("App", 0);
        let x = herd.state(&owner, "x", &StateValue::null(), StateOptions::default());
        assert!(herd.waiter_for("App0.x").is_none());
        assert!(herd.is_bound(&probe.key, "App0.x"));
        assert_eq!(probe.count(), 0);

        x.set(StateValue::data("v"));
        assert_eq!(probe.count(), 1);
    }

    #[test]
    fn the_last_waiter_wins() {
        let herd = Herd::new();
        let first = Probe::new("A", 1);
        let second = Probe::new("B", 2);
        herd.observe(&as_subscriber(&first), "App0.x");
        herd.observe(&as_subscriber(&second), "App0.x");

        let x = herd.state_at("App0.x", &StateValue::null(), StateOptions::default());
        x.set(StateValue::data(1));

        assert_eq!(first.count(), 0);
        assert_eq!(second.count(), 1);
    }

    #[test]
    fn unobserve_runs_the_remover() {
        let herd = Herd::new();
        let x = herd.state_at("App0.x", &StateValue::null(), StateOptions::default());
        let probe = Probe::new("Child", 1);
        herd.observe(&as_subscriber(&probe), "App0.x");

        assert!(herd.unobserve(&probe.key, "App0.x"));
        assert!(!herd.unobserve(&probe.key, "App0.x"));
        assert_eq!(x.cell().observer_count(), 0);

        x.set(StateValue::data(2));
        assert_eq!(probe.count(), 0);
    }

    #[test]
    fn dropped_subscribers_are_not_called() {
        let herd = Herd::new();
        let x = herd.state_at("App0.x", &StateValue::null(), StateOptions::default());
        {
            let probe = Probe::new("Gone", 9);
            herd.observe(&as_subscriber(&probe), "App0.x");
        }
        x.set(StateValue::data(1));
    }

    #[test]
    fn drop_owner_reclaims_cells_and_bindings() {
        let herd = Herd::new();
        let owner = ComponentKey::new("Counter", 3);
        let count = herd.state(&owner, "count", &StateValue::data(0), StateOptions::default());
        herd.state(&owner, "label", &StateValue::data("n"), StateOptions::default());
        let probe = Probe::new("Counter", 3);
        herd.observe(&as_subscriber(&probe), "Counter3.count");
        herd.observe(&as_subscriber(&probe), "Other1.missing");

        herd.drop_owner(&owner);

        assert_eq!(herd.cell_count(), 0);
        assert_eq!(herd.binding_count(), 0);
        assert!(herd.waiter_for("Other1.missing").is_none());
        assert_eq!(count.cell().observer_count(), 0);
        assert!(!herd.owns_state(&owner));
    }

    #[test]
    fn snapshot_uses_local_paths() {
        let herd = Herd::new();
        let owner = ComponentKey::new("Form", 2);
        herd.state(&owner, "name", &StateValue::data("pig"), StateOptions::default());
        herd.state(&ComponentKey::new("Form", 20), "name", &StateValue::data("x"), StateOptions::default());

        let snapshot = herd.snapshot_owner(&owner);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["name"], json!("pig"));
    }

    #[test]
    fn reference_cells_notify_through_the_reference_path() {
        let herd = Herd::new();
        let list = herd.state_at("App0.list", &StateValue::shared(json!([])), StateOptions::by_reference());
        let probe = Probe::new("View", 4);
        herd.observe(&as_subscriber(&probe), "App0.list");

        list.set(StateValue::shared(json!([1])));
        assert_eq!(probe.count(), 1);
    }
}
