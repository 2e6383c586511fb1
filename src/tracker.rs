// ============================================================================
// piglet - Tree Tracker
// Keyed snapshots of the live component tree for devtools consumers
// ============================================================================
//
// Every custom element gets a numeric id on first visit (the root gets 0).
// A structural mutation re-walks the nearest component's subtree and then
// each ancestor up to the root, so every enclosing snapshot stays current.
// Walks are full, never incremental.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use crate::component::Component;
use crate::core::context::Runtime;
use crate::core::types::{ComponentKey, NodeId};

/// One component in a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub tag: String,
    pub component_name: String,
    pub component_id: u64,
    pub key: String,
    pub state: BTreeMap<String, Value>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of components in this subtree, itself included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }

    pub fn find(&self, key: &str) -> Option<&TreeNode> {
        if self.key == key {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(key))
    }
}

pub struct TreeTracker {
    ids: RefCell<HashMap<NodeId, u64>>,
    next_id: Cell<u64>,
    snapshots: RefCell<BTreeMap<String, TreeNode>>,
    walks: Cell<u64>,
}

impl TreeTracker {
    pub fn new() -> Self {
        Self {
            ids: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
            snapshots: RefCell::new(BTreeMap::new()),
            walks: Cell::new(0),
        }
    }

    fn id_for(&self, element: NodeId, key: &ComponentKey) -> u64 {
        if key.is_root() {
            return 0;
        }
        *self.ids.borrow_mut().entry(element).or_insert_with(|| {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            id
        })
    }

    /// Full walk of `component`'s subtree, shadow trees included.
    pub fn walk(&self, rt: &Runtime, component: &Rc<Component>) -> TreeNode {
        self.walks.set(self.walks.get() + 1);
        self.walk_component(rt, component)
    }

    fn walk_component(&self, rt: &Runtime, component: &Rc<Component>) -> TreeNode {
        let element = component.element();
        let component_id = self.id_for(element, component.key());
        let mut children = Vec::new();
        self.collect(rt, element, &mut children);
        TreeNode {
            tag: component.tag(),
            component_name: component.name().to_string(),
            component_id,
            key: component.key().to_string(),
            state: rt.herd().snapshot_owner(component.key()),
            children,
        }
    }

    /// Nearest components below `node`.
    fn collect(&self, rt: &Runtime, node: NodeId, out: &mut Vec<TreeNode>) {
        let doc = rt.document();
        let below = doc.shadow_root(node).into_iter().chain(doc.children(node));
        for child in below {
            match rt.component(child) {
                Some(component) => out.push(self.walk_component(rt, &component)),
                None => self.collect(rt, child, out),
            }
        }
    }

    /// Re-walk `component` and store its snapshot.
    pub fn refresh(&self, rt: &Runtime, component: &Rc<Component>) -> TreeNode {
        let node = self.walk(rt, component);
        self.snapshots
            .borrow_mut()
            .insert(node.key.clone(), node.clone());
        node
    }

    /// A subtree changed below `component`: refresh it, then every
    /// ancestor through encapsulation boundaries.
    pub fn structure_changed(&self, rt: &Runtime, component: &Rc<Component>) {
        let mut current = Some(component.clone());
        let mut depth = 0;
        while let Some(c) = current {
            self.refresh(rt, &c);
            depth += 1;
            current = c.parent();
        }
        trace!(component = %component.key(), depth, "tree re-walked");
    }

    pub fn snapshot(&self, key: &str) -> Option<TreeNode> {
        self.snapshots.borrow().get(key).cloned()
    }

    /// Every stored snapshot keyed by component key.
    pub fn keyed(&self) -> BTreeMap<String, TreeNode> {
        self.snapshots.borrow().clone()
    }

    /// JSON document of one snapshot.
    pub fn to_json(&self, key: &str) -> Option<Value> {
        self.snapshot(key)
            .and_then(|node| serde_json::to_value(node).ok())
    }

    pub fn walk_count(&self) -> u64 {
        self.walks.get()
    }

    /// Drop the snapshot and id of a removed component. Ids are never
    /// handed out again.
    pub fn forget(&self, element: NodeId, key: &ComponentKey) {
        self.ids.borrow_mut().remove(&element);
        self.snapshots.borrow_mut().remove(&key.to_string());
    }

    /// Elements currently holding a tracker id (the root excluded)
    pub fn id_count(&self) -> usize {
        self.ids.borrow().len()
    }

    pub fn reset(&self) {
        self.ids.borrow_mut().clear();
        self.next_id.set(1);
        self.snapshots.borrow_mut().clear();
        self.walks.set(0);
    }
}

impl Default for TreeTracker {
    fn default() -> Self {
        Self::new()
    }
}
