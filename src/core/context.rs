// ============================================================================
// piglet - Runtime Context
// The process-scoped services every component is constructed against
// ============================================================================
//
// One `Runtime` owns the document, the herd, the microtask scheduler, the
// tree tracker and the component registry. Components hold it weakly.
// A thread-local default instance serves code that has no handle of its
// own; `reset()` swaps in a fresh one for test isolation.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::component::{Component, ComponentDefinition, Registry};
use crate::core::types::{ComponentKey, NodeId};
use crate::dom::document::Document;
use crate::reactivity::scheduling::Scheduler;
use crate::state::herd::Herd;
use crate::tracker::TreeTracker;

// =============================================================================
// OPTIONS
// =============================================================================

/// Runtime switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeOptions {
    /// Maintain TreeTracker snapshots on every structural mutation
    pub track_tree: bool,
    /// Warn once per change when a component has no update callback
    pub log_unhandled: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            track_tree: true,
            log_unhandled: true,
        }
    }
}

// =============================================================================
// RUNTIME
// =============================================================================

pub struct RuntimeInner {
    options: RuntimeOptions,
    document: Document,
    herd: Herd,
    scheduler: Scheduler,
    tracker: TreeTracker,
    registry: Registry,
    components: RefCell<HashMap<NodeId, Rc<Component>>>,
    next_instance: Cell<u64>,
}

/// Shared handle to the runtime services.
#[derive(Clone)]
pub struct Runtime(Rc<RuntimeInner>);

/// Non-owning handle held by components.
#[derive(Clone, Default)]
pub struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
    pub fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(Runtime)
    }
}

impl Runtime {
    pub fn new(options: RuntimeOptions) -> Self {
        let registry = Registry::new();
        registry.define(crate::component::conditional::definition());

        Runtime(Rc::new(RuntimeInner {
            options,
            document: Document::new(),
            herd: Herd::new(),
            scheduler: Scheduler::new(),
            tracker: TreeTracker::new(),
            registry,
            components: RefCell::new(HashMap::new()),
            next_instance: Cell::new(1),
        }))
    }

    pub fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // =========================================================================
    // SERVICES
    // =========================================================================

    pub fn options(&self) -> RuntimeOptions {
        self.0.options
    }

    pub fn document(&self) -> &Document {
        &self.0.document
    }

    pub fn herd(&self) -> &Herd {
        &self.0.herd
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.0.scheduler
    }

    pub fn tracker(&self) -> &TreeTracker {
        &self.0.tracker
    }

    pub fn registry(&self) -> &Registry {
        &self.0.registry
    }

    /// Register a component definition under its tag.
    pub fn define(&self, definition: ComponentDefinition) -> Rc<ComponentDefinition> {
        self.0.registry.define(definition)
    }

    /// End the current synchronous turn: run every queued microtask,
    /// including ones queued while draining. Returns the number run.
    pub fn tick(&self) -> usize {
        self.0.scheduler.run_until_idle()
    }

    /// Allocate a key for a new instance. Root definitions always get 0.
    pub(crate) fn next_key(&self, name: &str, root: bool) -> ComponentKey {
        if root {
            return ComponentKey::new(name, 0);
        }
        let index = self.0.next_instance.get();
        self.0.next_instance.set(index + 1);
        ComponentKey::new(name, index)
    }

    // =========================================================================
    // COMPONENT LOOKUP
    // =========================================================================

    /// Live component attached to `element`
    pub fn component(&self, element: NodeId) -> Option<Rc<Component>> {
        self.0.components.borrow().get(&element).cloned()
    }

    /// Live components with the given tag, in construction order.
    pub fn components_by_tag(&self, tag: &str) -> Vec<Rc<Component>> {
        let mut found: Vec<Rc<Component>> = self
            .0
            .components
            .borrow()
            .values()
            .filter(|c| c.tag() == tag)
            .cloned()
            .collect();
        found.sort_by_key(|c| c.key().index());
        found
    }

    pub(crate) fn register_component(&self, element: NodeId, component: Rc<Component>) {
        self.0.components.borrow_mut().insert(element, component);
    }

    pub(crate) fn unregister_component(&self, element: NodeId) -> Option<Rc<Component>> {
        self.0.components.borrow_mut().remove(&element)
    }

    pub fn component_count(&self) -> usize {
        self.0.components.borrow().len()
    }

    /// Nearest component strictly above `node`, crossing shadow boundaries.
    pub fn parent_component(&self, node: NodeId) -> Option<Rc<Component>> {
        let mut current = self.document().composed_parent(node);
        while let Some(id) = current {
            if let Some(component) = self.component(id) {
                return Some(component);
            }
            current = self.document().composed_parent(id);
        }
        None
    }

    /// Component whose shadow tree contains `node`.
    pub fn owner_component(&self, node: NodeId) -> Option<Rc<Component>> {
        let doc = self.document();
        let mut current = doc.parent(node);
        while let Some(id) = current {
            if let Some(host) = doc.host(id) {
                if let Some(component) = self.component(host) {
                    return Some(component);
                }
                current = doc.composed_parent(host);
            } else {
                current = doc.parent(id);
            }
        }
        None
    }

    /// Nearest component at or above `node`.
    pub fn enclosing_component(&self, node: NodeId) -> Option<Rc<Component>> {
        self.component(node).or_else(|| self.parent_component(node))
    }

    /// Drop every service's state. Components already handed out keep
    /// working against their own (now detached) bookkeeping.
    pub fn clear(&self) {
        let components: Vec<Rc<Component>> =
            self.0.components.borrow_mut().drain().map(|(_, c)| c).collect();
        for component in components {
            component.disconnected();
        }
        self.0.scheduler.clear();
        self.0.herd.reset();
        self.0.tracker.reset();
        debug!("runtime cleared");
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeOptions::default())
    }
}

// =============================================================================
// THREAD-LOCAL DEFAULT
// =============================================================================

thread_local! {
    static RUNTIME: RefCell<Runtime> = RefCell::new(Runtime::default());
}

/// Handle to this thread's default runtime.
pub fn runtime() -> Runtime {
    RUNTIME.with(|rt| rt.borrow().clone())
}

/// Run `f` against this thread's default runtime.
pub fn with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> R {
    let rt = runtime();
    f(&rt)
}

/// Replace this thread's default runtime with a fresh one.
pub fn reset() {
    reset_with(RuntimeOptions::default());
}

pub fn reset_with(options: RuntimeOptions) {
    let old = RUNTIME.with(|rt| rt.replace(Runtime::new(options)));
    old.clear();
}

// =============================================================================
// TESTS
// =============================================================================
