// ============================================================================
// piglet - Component Lifecycle
// Connect, mount, batched update and unmount of one custom element
// ============================================================================
//
// States: constructed -> connected -> (mount-pending | mounted) -> unmounted.
//
// A component mounts once its content is injected and its parent component
// is mounted (or it has none). Otherwise it waits in the parent's waiter
// list and is mounted by the parent's propagation.
//
// Attribute mutations and state notifications are queued per kind. The
// first record of a turn schedules one deferred flush; later records join
// it. A flush applies the attribute batch and then the state batch.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::component::definition::ComponentDefinition;
use crate::component::reason::{Reason, ReasonName};
use crate::core::constants::{
    ATTRIBUTE_PREFIX, CONNECTED, CONSTRUCTED, CONTENT_INJECTED, FLUSH_SCHEDULED, HOST_ATTRIBUTE,
    MOUNTED, MOUNT_PENDING, PHASE_MASK, UNMOUNTED, UNSETTLED_SUFFIX,
};
use crate::core::context::{Runtime, WeakRuntime};
use crate::core::types::{AttributeChange, ComponentKey, NodeId, StateChange, StateValue};
use crate::reactivity::batching::PendingQueue;
use crate::state::deep::{wrap_deep, DeepState};
use crate::state::herd::{Herd, Observation, StateAccessor, StateOptions, StateSubscriber};

/// Mount, update and render callback.
pub type HookFn = Rc<dyn Fn(&Rc<Component>, &Reason)>;

#[derive(Clone, Default)]
struct Hooks {
    mount: Option<HookFn>,
    update: Option<HookFn>,
    render: Option<HookFn>,
    before_update: Vec<HookFn>,
    after_update: Vec<HookFn>,
}

/// Observable lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Constructed,
    Connected,
    MountPending,
    Mounted,
    Unmounted,
}

// =============================================================================
// COMPONENT
// =============================================================================

pub struct Component {
    key: ComponentKey,
    element: NodeId,
    definition: RefCell<Rc<ComponentDefinition>>,
    runtime: WeakRuntime,
    flags: Cell<u32>,
    attrs: RefCell<BTreeMap<String, String>>,

    parent: RefCell<Weak<Component>>,
    children: RefCell<Vec<Rc<Component>>>,
    mount_waiters: RefCell<Vec<Weak<Component>>>,

    pending_attributes: PendingQueue<AttributeChange>,
    pending_state: PendingQueue<StateChange>,
    hooks: RefCell<Hooks>,

    /// Observed registry keys, in registration order
    observed: RefCell<Vec<String>>,
    /// Keys observed through `observe` or `state`, not only by attributes
    pinned: RefCell<Vec<String>>,
    /// Reactive attribute name -> registry key it is bound to
    attribute_bindings: RefCell<BTreeMap<String, String>>,
    /// Component whose shadow tree contains this element
    owner: RefCell<Option<ComponentKey>>,
    /// Settled host-binding key
    host: RefCell<Option<String>>,

    self_weak: Weak<Component>,
}

impl Component {
    pub(crate) fn new(
        key: ComponentKey,
        element: NodeId,
        definition: Rc<ComponentDefinition>,
        runtime: WeakRuntime,
    ) -> Rc<Self> {
        Rc::new_cyclic(|self_weak| Self {
            key,
            element,
            definition: RefCell::new(definition),
            runtime,
            flags: Cell::new(CONSTRUCTED),
            attrs: RefCell::new(BTreeMap::new()),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            mount_waiters: RefCell::new(Vec::new()),
            pending_attributes: PendingQueue::new(),
            pending_state: PendingQueue::new(),
            hooks: RefCell::new(Hooks::default()),
            observed: RefCell::new(Vec::new()),
            pinned: RefCell::new(Vec::new()),
            attribute_bindings: RefCell::new(BTreeMap::new()),
            owner: RefCell::new(None),
            host: RefCell::new(None),
            self_weak: self_weak.clone(),
        })
    }

    // =========================================================================
    // FLAGS
    // =========================================================================

    fn has(&self, flag: u32) -> bool {
        self.flags.get() & flag != 0
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(self.flags.get() | flags);
    }

    fn clear_flags(&self, flags: u32) {
        self.flags.set(self.flags.get() & !flags);
    }

    fn set_phase(&self, phase: u32) {
        self.flags.set((self.flags.get() & !PHASE_MASK) | phase);
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.has(UNMOUNTED) {
            Lifecycle::Unmounted
        } else if self.has(MOUNTED) {
            Lifecycle::Mounted
        } else if self.has(MOUNT_PENDING) {
            Lifecycle::MountPending
        } else if self.has(CONNECTED) {
            Lifecycle::Connected
        } else {
            Lifecycle::Constructed
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.has(MOUNTED)
    }

    pub fn is_unmounted(&self) -> bool {
        self.has(UNMOUNTED)
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn key(&self) -> &ComponentKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        self.key.name()
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn tag(&self) -> String {
        self.definition.borrow().tag().to_string()
    }

    pub fn definition(&self) -> Rc<ComponentDefinition> {
        self.definition.borrow().clone()
    }

    pub fn runtime(&self) -> Option<Runtime> {
        self.runtime.upgrade()
    }

    pub fn parent(&self) -> Option<Rc<Component>> {
        self.parent.borrow().upgrade()
    }

    pub fn children(&self) -> Vec<Rc<Component>> {
        self.children.borrow().clone()
    }

    pub fn owner_key(&self) -> Option<ComponentKey> {
        self.owner.borrow().clone()
    }

    /// Key of the component a host-binding marker settled on.
    pub fn host_key(&self) -> Option<String> {
        self.host.borrow().clone()
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.attrs.borrow().get(name).cloned()
    }

    pub fn attrs(&self) -> BTreeMap<String, String> {
        self.attrs.borrow().clone()
    }

    /// Registry keys this component observes, in registration order.
    pub fn observed_paths(&self) -> Vec<String> {
        self.observed.borrow().clone()
    }

    /// Current value of the cell bound by `piglet.<name>`.
    pub fn bound(&self, name: &str) -> Option<StateValue> {
        let key = self
            .attribute_bindings
            .borrow()
            .get(&format!("{ATTRIBUTE_PREFIX}{name}"))
            .cloned()?;
        self.runtime()?.herd().get(&key)
    }

    /// Registry key behind `piglet.<name>`
    pub fn binding_key(&self, name: &str) -> Option<String> {
        self.attribute_bindings
            .borrow()
            .get(&format!("{ATTRIBUTE_PREFIX}{name}"))
            .cloned()
    }

    pub fn shadow_root(&self) -> Option<NodeId> {
        self.runtime()?.document().shadow_root(self.element)
    }

    /// Pending (attribute, state) records not yet flushed.
    pub fn pending(&self) -> (usize, usize) {
        (self.pending_attributes.len(), self.pending_state.len())
    }

    /// Owns no cells and observes nothing.
    pub fn is_stateless(&self) -> bool {
        if !self.observed.borrow().is_empty() {
            return false;
        }
        self.runtime()
            .is_none_or(|rt| !rt.herd().owns_state(&self.key))
    }

    // =========================================================================
    // SCRIPT API
    // =========================================================================

    /// Declare (or fetch) the cell at `<key>.<path>` and observe it.
    pub fn state(self: &Rc<Self>, path: &str, initial: impl Into<StateValue>) -> StateAccessor {
        self.state_with(path, initial, StateOptions::default())
    }

    pub fn state_with(
        self: &Rc<Self>,
        path: &str,
        initial: impl Into<StateValue>,
        options: StateOptions,
    ) -> StateAccessor {
        let initial = initial.into();
        let Some(rt) = self.runtime() else {
            return StateAccessor::detached(&self.key.path(path), &initial, options);
        };
        let accessor = rt.herd().state(&self.key, path, &initial, options);
        self.observe(accessor.key());
        accessor
    }

    /// Declare nested state: one cell per object field path. The
    /// component observes the top-level cell.
    pub fn state_deep(self: &Rc<Self>, path: &str, initial: &Value) -> DeepState {
        let key = self.key.path(path);
        let Some(rt) = self.runtime() else {
            return wrap_deep(&Herd::new(), &key, initial);
        };
        let deep = wrap_deep(rt.herd(), &key, initial);
        self.observe(&key);
        deep
    }

    /// Bind this component to the cell at a full registry key.
    pub fn observe(self: &Rc<Self>, path: &str) -> Observation {
        {
            let mut pinned = self.pinned.borrow_mut();
            if !pinned.iter().any(|p| p == path) {
                pinned.push(path.to_string());
            }
        }
        self.bind(path)
    }

    fn bind(self: &Rc<Self>, path: &str) -> Observation {
        let Some(rt) = self.runtime() else {
            return Observation::Deferred;
        };
        {
            let mut observed = self.observed.borrow_mut();
            if !observed.iter().any(|p| p == path) {
                observed.push(path.to_string());
            }
        }
        let subscriber: Rc<dyn StateSubscriber> = self.clone();
        rt.herd().observe(&subscriber, path)
    }

    pub fn unobserve(&self, path: &str) -> bool {
        self.pinned.borrow_mut().retain(|p| p != path);
        self.release(path)
    }

    /// Drop the herd binding for `path`.
    fn release(&self, path: &str) -> bool {
        self.observed.borrow_mut().retain(|p| p != path);
        self.runtime()
            .is_some_and(|rt| rt.herd().unobserve(&self.key, path))
    }

    /// Set an attribute on this component's element through the runtime.
    pub fn set_attribute(&self, name: &str, value: &str) -> bool {
        match self.runtime() {
            Some(rt) => rt.set_attribute(self.element, name, value).is_ok(),
            None => false,
        }
    }

    pub fn on_mount(&self, f: impl Fn(&Rc<Component>, &Reason) + 'static) {
        self.hooks.borrow_mut().mount = Some(Rc::new(f));
    }

    pub fn on_update(&self, f: impl Fn(&Rc<Component>, &Reason) + 'static) {
        self.hooks.borrow_mut().update = Some(Rc::new(f));
    }

    /// Visible-effect phase of an update, between the before and after hooks.
    pub fn on_render(&self, f: impl Fn(&Rc<Component>, &Reason) + 'static) {
        self.hooks.borrow_mut().render = Some(Rc::new(f));
    }

    pub fn before_update(&self, f: impl Fn(&Rc<Component>, &Reason) + 'static) {
        self.hooks.borrow_mut().before_update.push(Rc::new(f));
    }

    pub fn after_update(&self, f: impl Fn(&Rc<Component>, &Reason) + 'static) {
        self.hooks.borrow_mut().after_update.push(Rc::new(f));
    }

    // =========================================================================
    // CONNECT
    // =========================================================================

    pub(crate) fn connected(self: &Rc<Self>) {
        let Some(rt) = self.runtime() else { return };
        if self.has(CONNECTED | UNMOUNTED) {
            return;
        }
        self.set_flags(CONNECTED);
        debug!(component = %self.key, element = self.element, "connected");

        {
            let mut attrs = self.attrs.borrow_mut();
            for (name, value) in rt.document().attributes(self.element) {
                attrs.insert(name, value);
            }
        }

        if let Some(parent) = rt.parent_component(self.element) {
            *self.parent.borrow_mut() = Rc::downgrade(&parent);
            parent.children.borrow_mut().push(self.clone());
        }
        *self.owner.borrow_mut() = rt.owner_component(self.element).map(|c| c.key.clone());

        self.settle_host(&rt);
        self.bind_reactive_attributes();
        self.run_setup();
        self.inject_content(&rt);
        self.try_mount(Reason::connected());
    }

    /// Replace an unsettled host marker (`Name__unsettled`) with the key
    /// of the nearest ancestor component of that class.
    fn settle_host(&self, rt: &Runtime) {
        let Some(marker) = self.attr(HOST_ATTRIBUTE) else { return };
        let Some(class) = marker.strip_suffix(UNSETTLED_SUFFIX) else {
            *self.host.borrow_mut() = Some(marker);
            return;
        };

        let mut current = self.parent();
        while let Some(candidate) = current {
            if candidate.name() == class {
                let settled = candidate.key.to_string();
                // Written straight to the document: the marker never
                // reaches the update pipeline.
                let _ = rt.document().set_attribute(self.element, HOST_ATTRIBUTE, &settled);
                self.attrs
                    .borrow_mut()
                    .insert(HOST_ATTRIBUTE.to_string(), settled.clone());
                debug!(component = %self.key, host = %settled, "host binding settled");
                *self.host.borrow_mut() = Some(settled);
                return;
            }
            current = candidate.parent();
        }
        warn!(component = %self.key, class, "no ancestor matches the host marker");
    }

    fn bind_reactive_attributes(self: &Rc<Self>) {
        let reactive: Vec<(String, String)> = self
            .attrs
            .borrow()
            .iter()
            .filter(|(name, _)| name.starts_with(ATTRIBUTE_PREFIX))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        for (name, path) in reactive {
            self.bind_attribute(&name, Some(&path));
        }
    }

    /// (Re)bind `piglet.<name>` to `<owner>.<path>`; `None` only unbinds.
    fn bind_attribute(self: &Rc<Self>, name: &str, path: Option<&str>) {
        let previous = self.attribute_bindings.borrow_mut().remove(name);
        if let Some(previous) = previous {
            // The herd keeps one binding per key; other users keep it alive.
            let shared = self.attribute_bindings.borrow().values().any(|k| *k == previous)
                || self.pinned.borrow().contains(&previous);
            if !shared {
                self.release(&previous);
            }
        }
        let Some(path) = path else { return };

        let owner = self.owner_key();
        let Some(owner) = owner else {
            warn!(component = %self.key, attribute = name, "reactive attribute outside any component");
            return;
        };
        let key = owner.path(path);
        self.attribute_bindings
            .borrow_mut()
            .insert(name.to_string(), key.clone());
        let observation = self.bind(&key);
        trace!(component = %self.key, attribute = name, %key, ?observation, "attribute bound");
    }

    fn run_setup(self: &Rc<Self>) {
        let setup = self.definition.borrow().setup_fn();
        if let Some(setup) = setup {
            setup(self);
        }
    }

    fn inject_content(self: &Rc<Self>, rt: &Runtime) {
        let html = self.definition.borrow().html().to_string();
        match rt.document().attach_shadow(self.element) {
            Ok(shadow) => {
                if let Err(err) = rt.inject_html(shadow, &html) {
                    warn!(component = %self.key, %err, "content injection failed");
                }
            }
            Err(err) => warn!(component = %self.key, %err, "cannot attach shadow root"),
        }
        self.set_flags(CONTENT_INJECTED);
    }

    // =========================================================================
    // MOUNT
    // =========================================================================

    /// Mount now, or wait for the parent to mount first.
    pub(crate) fn try_mount(self: &Rc<Self>, reason: Reason) {
        if self.has(MOUNTED | UNMOUNTED) || !self.has(CONTENT_INJECTED) {
            return;
        }

        if let Some(parent) = self.parent() {
            if !parent.is_mounted() {
                let me = Rc::downgrade(self);
                {
                    let mut waiters = parent.mount_waiters.borrow_mut();
                    if !waiters.iter().any(|w| w.ptr_eq(&me)) {
                        waiters.push(me);
                    }
                }
                self.set_phase(MOUNT_PENDING);
                debug!(component = %self.key, parent = %parent.key, "mount pending on parent");
                return;
            }
        }

        self.set_phase(MOUNTED);
        debug!(component = %self.key, %reason, "mounted");

        let mount = self.hooks.borrow().mount.clone();
        if let Some(mount) = mount {
            mount(self, &reason);
        }

        let waiters = std::mem::take(&mut *self.mount_waiters.borrow_mut());
        for waiter in waiters {
            if let Some(child) = waiter.upgrade() {
                child.try_mount(Reason::caused(ReasonName::ParentMount, &reason));
            }
        }

        if !self.pending_attributes.is_empty() || !self.pending_state.is_empty() {
            self.schedule_flush();
        }
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    pub(crate) fn attribute_changed(self: &Rc<Self>, name: &str, old: Option<String>, new: Option<String>) {
        if name == HOST_ATTRIBUTE || self.definition.borrow().ignores(name) {
            return;
        }
        if self.has(UNMOUNTED) {
            return;
        }

        {
            let mut attrs = self.attrs.borrow_mut();
            match &new {
                Some(value) => attrs.insert(name.to_string(), value.clone()),
                None => attrs.remove(name),
            };
        }
        if name.starts_with(ATTRIBUTE_PREFIX) {
            self.bind_attribute(name, new.as_deref());
        }

        let opened = self.pending_attributes.push(AttributeChange {
            name: name.to_string(),
            old,
            new,
        });
        trace!(component = %self.key, attribute = name, opened, "attribute change queued");
        self.schedule_flush();
    }

    fn schedule_flush(self: &Rc<Self>) {
        if self.has(FLUSH_SCHEDULED) {
            return;
        }
        let Some(rt) = self.runtime() else { return };
        self.set_flags(FLUSH_SCHEDULED);
        let weak = Rc::downgrade(self);
        rt.scheduler().queue_microtask(move || {
            if let Some(component) = weak.upgrade() {
                component.flush();
            }
        });
    }

    /// Deferred flush: attribute batch first, then state batch.
    fn flush(self: &Rc<Self>) {
        self.clear_flags(FLUSH_SCHEDULED);
        if self.has(UNMOUNTED) {
            self.pending_attributes.clear();
            self.pending_state.clear();
            trace!(component = %self.key, "flush after unmount ignored");
            return;
        }
        if !self.is_mounted() {
            trace!(component = %self.key, "flush deferred until mount");
            return;
        }

        let attributes = self.pending_attributes.drain();
        if !attributes.is_empty() {
            self.apply_batch(Reason::attribute_change(attributes));
        }
        let state = self.pending_state.drain();
        if !state.is_empty() {
            self.apply_batch(Reason::state_change(state));
        }
    }

    fn apply_batch(self: &Rc<Self>, reason: Reason) {
        if self.has(UNMOUNTED) {
            return;
        }
        debug!(component = %self.key, %reason, changes = reason.len(), "update");

        let hooks = self.hooks.borrow().clone();
        match &hooks.update {
            Some(update) => update(self, &reason),
            None => self.log_unhandled(&reason),
        }

        self.propagate(&reason);

        for hook in &hooks.before_update {
            hook(self, &reason);
        }
        if let Some(render) = &hooks.render {
            render(self, &reason);
        }
        for hook in &hooks.after_update {
            hook(self, &reason);
        }
    }

    fn log_unhandled(&self, reason: &Reason) {
        if !self.runtime().is_some_and(|rt| rt.options().log_unhandled) {
            return;
        }
        for change in reason.attribute_changes() {
            warn!(component = %self.key, attribute = %change.name, "unhandled attribute change");
        }
        for change in reason.state_changes() {
            warn!(component = %self.key, path = %change.path, "unhandled state change");
        }
    }

    /// Carry an update down the tree: mount children that are still
    /// unmounted, re-run stateless children, and look through the others
    /// (which get their own notifications) to their descendants.
    fn propagate(self: &Rc<Self>, reason: &Reason) {
        for child in self.children() {
            if !child.is_mounted() {
                child.try_mount(Reason::caused(ReasonName::ParentMount, reason));
            } else if child.is_stateless() {
                child.apply_batch(Reason::caused(ReasonName::ParentUpdate, reason));
            } else {
                child.propagate(reason);
            }
        }
    }

    // =========================================================================
    // RELOAD
    // =========================================================================

    /// Re-inject content and re-run setup from the current definition,
    /// keeping state. Returns false when not mounted.
    pub fn reload(self: &Rc<Self>) -> bool {
        let Some(rt) = self.runtime() else { return false };
        if !self.is_mounted() {
            return false;
        }

        let tag = self.tag();
        if let Some(definition) = rt.registry().get(&tag) {
            *self.definition.borrow_mut() = definition;
        }
        if let Some(shadow) = rt.document().shadow_root(self.element) {
            for child in rt.document().children(shadow) {
                if let Err(err) = rt.remove_child(shadow, child) {
                    warn!(component = %self.key, %err, "stale content not removed");
                }
            }
        }

        *self.hooks.borrow_mut() = Hooks::default();
        // Back to connected so re-injected children wait for this mount.
        self.set_phase(0);
        self.run_setup();
        self.inject_content(&rt);

        debug!(component = %self.key, "reloaded");
        self.try_mount(Reason::reload());
        self.is_mounted()
    }

    // =========================================================================
    // UNMOUNT
    // =========================================================================

    pub(crate) fn disconnected(self: &Rc<Self>) {
        if self.has(UNMOUNTED) {
            return;
        }
        self.clear_flags(CONNECTED);
        self.set_phase(UNMOUNTED);

        *self.hooks.borrow_mut() = Hooks::default();
        self.children.borrow_mut().clear();
        self.mount_waiters.borrow_mut().clear();

        let observed = std::mem::take(&mut *self.observed.borrow_mut());
        self.pinned.borrow_mut().clear();
        self.attribute_bindings.borrow_mut().clear();
        if let Some(rt) = self.runtime() {
            for path in &observed {
                rt.herd().unobserve(&self.key, path);
            }
            rt.herd().drop_owner(&self.key);
        }
        self.pending_attributes.clear();
        self.pending_state.clear();

        if let Some(parent) = self.parent() {
            parent.children.borrow_mut().retain(|c| !Rc::ptr_eq(c, self));
            let me = Rc::downgrade(self);
            parent.mount_waiters.borrow_mut().retain(|w| !w.ptr_eq(&me));
        }
        debug!(component = %self.key, bindings = observed.len(), "unmounted");
    }
}

impl StateSubscriber for Component {
    fn subscriber_key(&self) -> ComponentKey {
        self.key.clone()
    }

    fn state_changed(&self, change: &StateChange) {
        if self.has(UNMOUNTED) {
            return;
        }
        let opened = self.pending_state.push(change.clone());
        trace!(component = %self.key, path = %change.path, opened, "state change queued");
        if let Some(this) = self.self_weak.upgrade() {
            this.schedule_flush();
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("key", &self.key.to_string())
            .field("element", &self.element)
            .field("lifecycle", &self.lifecycle())
            .field("children", &self.children.borrow().len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::definition::ComponentDefinition;
    use crate::core::context::{Runtime, RuntimeOptions};
    use crate::dom::document::DOCUMENT_NODE;
    use serde_json::json;
    use tracing_test::traced_test;

    type Log = Rc<RefCell<Vec<String>>>;

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn recording(name: &str, template: &str, log: &Log) -> ComponentDefinition {
        let log = log.clone();
        ComponentDefinition::new(name)
            .template(template)
            .setup(move |c| {
                let mounts = log.clone();
                c.on_mount(move |c, _| mounts.borrow_mut().push(format!("mount {}", c.name())));
                let updates = log.clone();
                c.on_update(move |c, r| {
                    updates
                        .borrow_mut()
                        .push(format!("update {} {}", c.name(), r.name()))
                });
            })
    }

    #[test]
    fn mounts_parent_before_shadow_children() {
        let rt = Runtime::default();
        let seen = log();
        rt.define(recording("Outer", "<inner-part></inner-part>", &seen).root());
        rt.define(recording("InnerPart", "<p>leaf</p>", &seen));

        let root = rt.mount("piglet-root").unwrap();

        assert_eq!(*seen.borrow(), vec!["mount Outer", "mount InnerPart"]);
        assert_eq!(root.key().to_string(), "Outer0");
        let child = &root.children()[0];
        assert_eq!(child.key().to_string(), "InnerPart1");
        assert_eq!(child.lifecycle(), Lifecycle::Mounted);
        assert!(Rc::ptr_eq(&child.parent().unwrap(), &root));
    }

    #[test]
    fn child_waits_for_a_pending_parent() {
        let rt = Runtime::default();
        let seen = log();
        rt.define(recording("Shell", "<middle-part></middle-part>", &seen).root());
        let states = log();
        let s = states.clone();
        rt.define(
            ComponentDefinition::new("MiddlePart")
                .template("<leaf-part></leaf-part>")
                .setup(move |c| {
                    let s = s.clone();
                    c.on_mount(move |c, _| {
                        let leaf = &c.children()[0];
                        s.borrow_mut().push(format!("{:?}", leaf.lifecycle()));
                    });
                }),
        );
        rt.define(recording("LeafPart", "", &seen));

        rt.mount("piglet-root").unwrap();

        // The leaf connected while its parent was pending, and mounted
        // only through the parent's propagation.
        assert_eq!(*states.borrow(), vec!["MountPending"]);
        assert_eq!(*seen.borrow(), vec!["mount Shell", "mount LeafPart"]);
    }

    #[test]
    fn attribute_changes_coalesce_into_one_flush() {
        let rt = Runtime::default();
        let batches: Rc<RefCell<Vec<Vec<AttributeChange>>>> = Rc::new(RefCell::new(Vec::new()));
        let b = batches.clone();
        rt.define(ComponentDefinition::new("Label").setup(move |c| {
            let b = b.clone();
            c.on_update(move |_, r| b.borrow_mut().push(r.attribute_changes().to_vec()));
        }));
        let label = rt.mount("label-component").unwrap();
        let el = label.element();

        rt.set_attribute(el, "a", "1").unwrap();
        rt.set_attribute(el, "b", "2").unwrap();
        rt.set_attribute(el, "a", "3").unwrap();
        assert!(batches.borrow().is_empty());
        assert_eq!(rt.scheduler().pending(), 1);

        rt.tick();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 1);
        let names: Vec<_> = batches[0].iter().map(|c| (c.name.as_str(), c.new.as_deref())).collect();
        assert_eq!(names, vec![("a", Some("1")), ("b", Some("2")), ("a", Some("3"))]);
        assert_eq!(batches[0][2].old.as_deref(), Some("1"));
        assert_eq!(label.attr("a").as_deref(), Some("3"));
    }

    #[test]
    fn attributes_flush_before_state_in_one_turn() {
        let rt = Runtime::default();
        let seen = log();
        let s = seen.clone();
        rt.define(ComponentDefinition::new("Both").setup(move |c| {
            c.state("n", 0);
            let s = s.clone();
            c.on_update(move |_, r| s.borrow_mut().push(r.name().to_string()));
        }));
        let c = rt.mount("both-component").unwrap();

        rt.herd().get("Both1.n").unwrap();
        c.state("n", 0).set(json!(1));
        rt.set_attribute(c.element(), "title", "t").unwrap();
        rt.tick();

        assert_eq!(*seen.borrow(), vec!["attributeChange", "stateChange"]);
    }

    #[test]
    fn state_changes_reach_the_owner_once_per_turn() {
        let rt = Runtime::default();
        let seen: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        rt.define(ComponentDefinition::new("Counter").setup(move |c| {
            c.state("count", 0);
            let s = s.clone();
            c.on_update(move |_, r| s.borrow_mut().push(r.state_changes().len()));
        }));
        let counter = rt.mount("counter-component").unwrap();

        let count = counter.state("count", 0);
        count.set(json!(1));
        count.set(json!(2));
        rt.tick();

        assert_eq!(*seen.borrow(), vec![2]);
        assert_eq!(count.json(), json!(2));
    }

    #[test]
    fn stateless_children_rerun_with_the_parent() {
        let rt = Runtime::default();
        let seen = log();
        let s = seen.clone();
        rt.define(
            ComponentDefinition::new("Board")
                .root()
                .template("<tile-view></tile-view>")
                .setup(move |c| {
                    c.state("score", 0);
                    let s = s.clone();
                    c.on_update(move |c, r| s.borrow_mut().push(format!("{} {}", c.name(), r)));
                }),
        );
        rt.define(recording("TileView", "", &seen));

        let board = rt.mount("piglet-root").unwrap();
        seen.borrow_mut().clear();
        board.state("score", 0).set(json!(10));
        rt.tick();

        assert_eq!(
            *seen.borrow(),
            vec!["Board stateChange", "update TileView parentUpdate"]
        );
    }

    #[test]
    fn before_render_after_hooks_run_in_order() {
        let rt = Runtime::default();
        let seen = log();
        let s = seen.clone();
        rt.define(ComponentDefinition::new("Hooked").setup(move |c| {
            for (label, slot) in [("before", 0), ("render", 1), ("after", 2), ("update", 3)] {
                let s = s.clone();
                let f = move |_: &Rc<Component>, _: &Reason| s.borrow_mut().push(label.to_string());
                match slot {
                    0 => c.before_update(f),
                    1 => c.on_render(f),
                    2 => c.after_update(f),
                    _ => c.on_update(f),
                }
            }
        }));
        let c = rt.mount("hooked-component").unwrap();
        c.set_attribute("x", "1");
        rt.tick();

        assert_eq!(*seen.borrow(), vec!["update", "before", "render", "after"]);
    }

    #[test]
    #[traced_test]
    fn changes_without_an_update_callback_are_logged() {
        let rt = Runtime::default();
        rt.define(ComponentDefinition::new("Quiet").setup(|c| {
            c.state("n", 0);
        }));
        let c = rt.mount("quiet-component").unwrap();
        c.set_attribute("x", "1");
        c.set_attribute("y", "2");
        c.state("n", 0).set(json!(1));
        rt.tick();

        assert!(logs_contain("unhandled attribute change"));
        assert!(logs_contain("unhandled state change"));
        logs_assert(|lines: &[&str]| {
            match lines.iter().filter(|line| line.contains("unhandled")).count() {
                3 => Ok(()),
                n => Err(format!("expected one warning per change, got {n}")),
            }
        });
    }

    #[test]
    fn unhandled_logging_can_be_disabled() {
        let rt = Runtime::new(RuntimeOptions {
            track_tree: false,
            log_unhandled: false,
        });
        rt.define(ComponentDefinition::new("Quiet"));
        let c = rt.mount("quiet-component").unwrap();
        c.set_attribute("x", "1");
        assert_eq!(rt.tick(), 1);
        assert_eq!(c.pending(), (0, 0));
    }

    #[test]
    fn unmount_tears_down_bindings_and_state() {
        let rt = Runtime::default();
        rt.define(ComponentDefinition::new("Gone").setup(|c| {
            c.state("v", 1);
            c.observe("Elsewhere9.missing");
            c.on_update(|_, _| panic!("update after unmount"));
        }));
        let c = rt.mount("gone-component").unwrap();
        let v = c.state("v", 1);
        v.set(json!(2));
        assert_eq!(rt.scheduler().pending(), 1);

        rt.remove_child(DOCUMENT_NODE, c.element()).unwrap();
        rt.tick();

        assert_eq!(c.lifecycle(), Lifecycle::Unmounted);
        assert!(c.observed_paths().is_empty());
        assert_eq!(rt.herd().cell_count(), 0);
        assert_eq!(rt.herd().binding_count(), 0);
        assert!(rt.herd().waiter_for("Elsewhere9.missing").is_none());
        assert!(rt.component(c.element()).is_none());
    }

    #[test]
    fn reactive_attributes_bind_to_the_owner() {
        let rt = Runtime::default();
        rt.define(
            ComponentDefinition::new("Form")
                .root()
                .template(r#"<name-field piglet.value="name"></name-field>"#)
                .setup(|c| {
                    c.state("name", "ada");
                }),
        );
        let seen = log();
        let s = seen.clone();
        rt.define(ComponentDefinition::new("NameField").setup(move |c| {
            let s = s.clone();
            c.on_update(move |c, _| {
                let value = c.bound("value").map(|v| v.to_json()).unwrap_or_default();
                s.borrow_mut().push(value.to_string());
            });
        }));

        let form = rt.mount("piglet-root").unwrap();
        let field = form.children()[0].clone();
        assert_eq!(field.binding_key("value").as_deref(), Some("Form0.name"));
        assert_eq!(field.bound("value").unwrap().to_json(), json!("ada"));

        form.state("name", "").set(json!("grace"));
        rt.tick();
        assert_eq!(*seen.borrow(), vec!["\"grace\""]);
    }

    #[test]
    fn changing_a_reactive_attribute_rebinds() {
        let rt = Runtime::default();
        rt.define(
            ComponentDefinition::new("Host")
                .root()
                .template(r#"<view-part piglet.item="a"></view-part>"#)
                .setup(|c| {
                    c.state("a", 1);
                    c.state("b", 2);
                }),
        );
        rt.define(ComponentDefinition::new("ViewPart").setup(|c| c.on_update(|_, _| {})));
        let host = rt.mount("piglet-root").unwrap();
        let view = host.children()[0].clone();

        rt.set_attribute(view.element(), "piglet.item", "b").unwrap();

        assert_eq!(view.binding_key("item").as_deref(), Some("Host0.b"));
        assert!(!rt.herd().is_bound(view.key(), "Host0.a"));
        assert!(rt.herd().is_bound(view.key(), "Host0.b"));
        assert_eq!(view.bound("item").unwrap().to_json(), json!(2));
    }

    #[test]
    fn rebinding_one_attribute_keeps_a_shared_binding() {
        let rt = Runtime::default();
        rt.define(
            ComponentDefinition::new("Host")
                .root()
                .template(r#"<view-part piglet.a="n" piglet.b="n"></view-part>"#)
                .setup(|c| {
                    c.state("n", 1);
                    c.state("m", 2);
                }),
        );
        let seen = log();
        let s = seen.clone();
        rt.define(ComponentDefinition::new("ViewPart").setup(move |c| {
            let s = s.clone();
            c.on_update(move |c, _| {
                let value = c.bound("b").map(|v| v.to_json()).unwrap_or_default();
                s.borrow_mut().push(value.to_string());
            });
        }));
        let host = rt.mount("piglet-root").unwrap();
        let view = host.children()[0].clone();

        rt.set_attribute(view.element(), "piglet.a", "m").unwrap();
        rt.tick();
        seen.borrow_mut().clear();

        assert_eq!(view.binding_key("b").as_deref(), Some("Host0.n"));
        assert!(rt.herd().is_bound(view.key(), "Host0.n"));
        assert!(rt.herd().is_bound(view.key(), "Host0.m"));

        host.state("n", 0).set(json!(5));
        rt.tick();
        assert_eq!(*seen.borrow(), vec!["5"]);

        // once the last user moves away, the binding goes
        rt.set_attribute(view.element(), "piglet.b", "m").unwrap();
        assert!(!rt.herd().is_bound(view.key(), "Host0.n"));
    }

    #[test]
    fn explicit_observation_survives_attribute_rebinding() {
        let rt = Runtime::default();
        rt.define(
            ComponentDefinition::new("Host")
                .root()
                .template(r#"<view-part piglet.item="a"></view-part>"#)
                .setup(|c| {
                    c.state("a", 1);
                    c.state("b", 2);
                }),
        );
        rt.define(ComponentDefinition::new("ViewPart").setup(|c| {
            c.observe("Host0.a");
            c.on_update(|_, _| {});
        }));
        let host = rt.mount("piglet-root").unwrap();
        let view = host.children()[0].clone();

        rt.set_attribute(view.element(), "piglet.item", "b").unwrap();

        assert!(rt.herd().is_bound(view.key(), "Host0.a"));
        assert!(rt.herd().is_bound(view.key(), "Host0.b"));
    }

    #[test]
    fn reload_remounts_new_children_after_the_parent() {
        let rt = Runtime::default();
        let seen = log();
        let s = seen.clone();
        rt.define(
            ComponentDefinition::new("Frame")
                .root()
                .template("<pane-part></pane-part>")
                .setup(move |c| {
                    let s = s.clone();
                    c.on_mount(move |c, r| s.borrow_mut().push(format!("{} {}", c.key(), r)));
                }),
        );
        let s = seen.clone();
        rt.define(ComponentDefinition::new("PanePart").setup(move |c| {
            let s = s.clone();
            c.on_mount(move |c, r| s.borrow_mut().push(format!("{} {}", c.key(), r)));
        }));
        let frame = rt.mount("piglet-root").unwrap();
        assert_eq!(*seen.borrow(), vec!["Frame0 connected", "PanePart1 parentMount <- connected"]);
        seen.borrow_mut().clear();

        assert!(frame.reload());

        assert_eq!(*seen.borrow(), vec!["Frame0 reload", "PanePart2 parentMount <- reload"]);
        assert_eq!(frame.lifecycle(), Lifecycle::Mounted);
        assert_eq!(frame.children()[0].lifecycle(), Lifecycle::Mounted);
    }

    #[test]
    fn undefined_custom_elements_stay_inert() {
        let rt = Runtime::default();
        rt.define(
            ComponentDefinition::new("Page")
                .root()
                .template("<missing-widget><span>x</span></missing-widget>"),
        );
        let page = rt.mount("piglet-root").unwrap();
        assert!(page.is_mounted());
        assert!(page.children().is_empty());
        assert_eq!(rt.component_count(), 1);
    }
}
