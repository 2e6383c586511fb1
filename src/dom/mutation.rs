// ============================================================================
// piglet - Lifecycle-aware DOM Operations
// Tree and attribute mutations that connect, disconnect and notify components
// ============================================================================
//
// Inserting a subtree into the connected tree upgrades every element whose
// tag has a definition, in shadow-including tree order, so parents always
// connect before their children. Removing a subtree disconnects its
// components in the same order.
// ============================================================================

use std::rc::Rc;

use tracing::{trace, warn};

use crate::component::Component;
use crate::core::context::Runtime;
use crate::core::types::NodeId;
use crate::dom::document::DOCUMENT_NODE;
use crate::dom::fragment::parse_fragment;
use crate::error::{RuntimeError, RuntimeResult};

impl Runtime {
    // =========================================================================
    // CREATION
    // =========================================================================

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.document().create_element(tag)
    }

    pub fn create_text(&self, text: &str) -> NodeId {
        self.document().create_text(text)
    }

    /// Create the element for `tag`, append it to the document and return
    /// its component.
    pub fn mount(&self, tag: &str) -> RuntimeResult<Rc<Component>> {
        let element = self.create_element(tag);
        self.append_child(DOCUMENT_NODE, element)?;
        self.component(element)
            .ok_or_else(|| RuntimeError::UnknownComponent(tag.to_string()))
    }

    // =========================================================================
    // TREE
    // =========================================================================

    /// Append `child` to `parent`. A connected child is disconnected from
    /// its old position first; a child that ends up connected has its
    /// subtree upgraded.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> RuntimeResult<()> {
        if let Some(old_parent) = self.document().parent(child) {
            self.remove_child(old_parent, child)?;
        }
        self.document().append_child(parent, child)?;
        if self.document().is_connected(child) {
            self.connect_subtree(child);
            self.structure_changed(parent);
        }
        Ok(())
    }

    /// Detach `child`, disconnecting every component in its subtree.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> RuntimeResult<()> {
        let connected = self.document().is_connected(child);
        let subtree = if connected {
            self.document().shadow_including_preorder(child)
        } else {
            Vec::new()
        };
        self.document().remove_child(parent, child)?;

        for id in subtree {
            let removed = self.unregister_component(id);
            if let Some(component) = removed {
                component.disconnected();
                self.tracker().forget(component.element(), component.key());
            }
        }
        if connected {
            self.structure_changed(parent);
        }
        Ok(())
    }

    /// Replace the children of `node` with a single text node, unmounting
    /// any components among the removed children.
    pub fn set_text(&self, node: NodeId, text: &str) -> RuntimeResult<()> {
        for child in self.document().children(node) {
            self.remove_child(node, child)?;
        }
        let text = self.create_text(text);
        self.append_child(node, text)
    }

    /// Parse `html` and append the resulting nodes to `parent`.
    pub fn inject_html(&self, parent: NodeId, html: &str) -> RuntimeResult<Vec<NodeId>> {
        let nodes = parse_fragment(self.document(), html);
        for &node in &nodes {
            self.append_child(parent, node)?;
        }
        Ok(nodes)
    }

    // =========================================================================
    // ATTRIBUTES
    // =========================================================================

    pub fn set_attribute(&self, element: NodeId, name: &str, value: &str) -> RuntimeResult<()> {
        let old = self.document().set_attribute(element, name, value)?;
        if let Some(component) = self.component(element) {
            component.attribute_changed(name, old, Some(value.to_string()));
        }
        Ok(())
    }

    pub fn remove_attribute(&self, element: NodeId, name: &str) -> RuntimeResult<()> {
        let old = self.document().remove_attribute(element, name)?;
        if old.is_none() {
            return Ok(());
        }
        if let Some(component) = self.component(element) {
            component.attribute_changed(name, old, None);
        }
        Ok(())
    }

    // =========================================================================
    // UPGRADES
    // =========================================================================

    fn connect_subtree(&self, root: NodeId) {
        for id in self.document().shadow_including_preorder(root) {
            if !self.document().is_element(id) || self.component(id).is_some() {
                continue;
            }
            // A component connected earlier in this loop may have moved
            // or removed later nodes.
            if !self.document().is_connected(id) {
                continue;
            }
            if let Some(component) = self.upgrade(id) {
                component.connected();
            }
        }
    }

    /// Construct the component for `element` if its tag is defined.
    fn upgrade(&self, element: NodeId) -> Option<Rc<Component>> {
        let tag = self.document().tag(element)?;
        let Some(definition) = self.registry().get(&tag) else {
            if tag.contains('-') {
                warn!(tag = %tag, "no component module registered, leaving element inert");
            }
            return None;
        };

        let key = self.next_key(definition.name(), definition.is_root());
        trace!(%key, tag = %tag, element, "constructing component");
        let component = Component::new(key, element, definition, self.downgrade());
        self.register_component(element, component.clone());
        Some(component)
    }

    fn structure_changed(&self, node: NodeId) {
        if !self.options().track_tree {
            return;
        }
        if let Some(component) = self.enclosing_component(node) {
            self.tracker().structure_changed(self, &component);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
