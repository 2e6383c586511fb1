// ============================================================================
// piglet - Document
// Arena-backed node tree with encapsulated (shadow) sub-trees
// ============================================================================
//
// Nodes are addressed by a stable `NodeId` index and never reused. The
// document is a plain data structure: it knows nothing about components.
// Lifecycle consequences of mutations are dispatched by the runtime.
// ============================================================================

use std::cell::RefCell;

use crate::core::types::NodeId;
use crate::error::{RuntimeError, RuntimeResult};

/// Id of the document node, the root every connected node leads to.
pub const DOCUMENT_NODE: NodeId = 0;

/// Elements that never have children or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

// =============================================================================
// NODE
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(String),
    Text(String),
    Comment(String),
    ShadowRoot,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    /// Shadow root attached to this element
    pub shadow_root: Option<NodeId>,
    /// Host element of this shadow root
    pub host: Option<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attributes: Vec::new(),
            children: Vec::new(),
            parent: None,
            shadow_root: None,
            host: None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }
}

// =============================================================================
// DOCUMENT
// =============================================================================

pub struct Document {
    nodes: RefCell<Vec<Node>>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(vec![Node::new(NodeKind::Document)]),
        }
    }

    fn push(&self, node: Node) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(node);
        nodes.len() - 1
    }

    fn check(&self, id: NodeId) -> RuntimeResult<()> {
        if id < self.nodes.borrow().len() {
            Ok(())
        } else {
            Err(RuntimeError::UnknownNode(id))
        }
    }

    fn check_element(&self, id: NodeId) -> RuntimeResult<()> {
        self.check(id)?;
        match self.nodes.borrow()[id].kind {
            NodeKind::Element(_) => Ok(()),
            _ => Err(RuntimeError::NotAnElement(id)),
        }
    }

    // =========================================================================
    // CREATION
    // =========================================================================

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.push(Node::new(NodeKind::Element(tag.to_ascii_lowercase())))
    }

    pub fn create_text(&self, text: &str) -> NodeId {
        self.push(Node::new(NodeKind::Text(text.to_string())))
    }

    pub fn create_comment(&self, text: &str) -> NodeId {
        self.push(Node::new(NodeKind::Comment(text.to_string())))
    }

    /// Attach (or return the existing) shadow root of an element.
    pub fn attach_shadow(&self, host: NodeId) -> RuntimeResult<NodeId> {
        self.check_element(host)?;
        if let Some(existing) = self.nodes.borrow()[host].shadow_root {
            return Ok(existing);
        }
        let mut root = Node::new(NodeKind::ShadowRoot);
        root.host = Some(host);
        let id = self.push(root);
        self.nodes.borrow_mut()[host].shadow_root = Some(id);
        Ok(id)
    }

    // =========================================================================
    // TREE MUTATION
    // =========================================================================

    /// Move `child` to the end of `parent`'s children.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> RuntimeResult<()> {
        self.check(parent)?;
        self.check(child)?;
        self.detach(child);
        let mut nodes = self.nodes.borrow_mut();
        nodes[parent].children.push(child);
        nodes[child].parent = Some(parent);
        Ok(())
    }

    /// Detach `child` from `parent`. Errors if it is not a child of `parent`.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> RuntimeResult<()> {
        self.check(parent)?;
        self.check(child)?;
        if self.nodes.borrow()[child].parent != Some(parent) {
            return Err(RuntimeError::UnknownNode(child));
        }
        self.detach(child);
        Ok(())
    }

    fn detach(&self, child: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(old) = nodes[child].parent.take() {
            nodes[old].children.retain(|&c| c != child);
        }
    }

    /// Replace the text of a text or comment node.
    pub fn set_text(&self, id: NodeId, text: &str) -> RuntimeResult<()> {
        self.check(id)?;
        match &mut self.nodes.borrow_mut()[id].kind {
            NodeKind::Text(t) | NodeKind::Comment(t) => {
                *t = text.to_string();
                Ok(())
            }
            _ => Err(RuntimeError::NotAnElement(id)),
        }
    }

    // =========================================================================
    // ATTRIBUTES
    // =========================================================================

    /// Set an attribute, returning the previous value.
    pub fn set_attribute(&self, id: NodeId, name: &str, value: &str) -> RuntimeResult<Option<String>> {
        self.check_element(id)?;
        let mut nodes = self.nodes.borrow_mut();
        let attrs = &mut nodes[id].attributes;
        match attrs.iter().position(|(n, _)| n == name) {
            Some(i) => Ok(Some(std::mem::replace(&mut attrs[i].1, value.to_string()))),
            None => {
                attrs.push((name.to_string(), value.to_string()));
                Ok(None)
            }
        }
    }

    /// Remove an attribute, returning its value if it was present.
    pub fn remove_attribute(&self, id: NodeId, name: &str) -> RuntimeResult<Option<String>> {
        self.check_element(id)?;
        let mut nodes = self.nodes.borrow_mut();
        let attrs = &mut nodes[id].attributes;
        Ok(attrs
            .iter()
            .position(|(n, _)| n == name)
            .map(|i| attrs.remove(i).1))
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        let nodes = self.nodes.borrow();
        nodes
            .get(id)?
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    /// Declared attributes in declaration order
    pub fn attributes(&self, id: NodeId) -> Vec<(String, String)> {
        self.nodes
            .borrow()
            .get(id)
            .map(|n| n.attributes.clone())
            .unwrap_or_default()
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.nodes.borrow().get(id).cloned()
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.borrow().get(id).map(|n| n.kind.clone())
    }

    pub fn tag(&self, id: NodeId) -> Option<String> {
        self.nodes.borrow().get(id)?.tag().map(str::to_string)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element(_)))
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(id)?.parent
    }

    pub fn shadow_root(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(id)?.shadow_root
    }

    pub fn host(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(id)?.host
    }

    /// Parent, or the host element when `id` is a shadow root.
    pub fn composed_parent(&self, id: NodeId) -> Option<NodeId> {
        let nodes = self.nodes.borrow();
        let node = nodes.get(id)?;
        node.parent.or(node.host)
    }

    /// Whether the node leads to the document through parents and hosts.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == DOCUMENT_NODE {
                return true;
            }
            current = self.composed_parent(node);
        }
        false
    }

    /// `id` and all of its descendants in shadow-including tree order:
    /// a node, then its shadow tree, then its children.
    pub fn shadow_including_preorder(&self, id: NodeId) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = nodes.get(current) else {
                continue;
            };
            out.push(current);
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
            if let Some(shadow) = node.shadow_root {
                stack.push(shadow);
            }
        }
        out
    }

    /// Concatenated text of all descendant text nodes (shadow trees excluded).
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(t)) => out.push_str(&t),
            Some(NodeKind::Comment(_)) | None => {}
            Some(_) => {
                for child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Serialize a node's light-DOM markup.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    /// Serialize a node's children.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match &node.kind {
            NodeKind::Text(t) => out.push_str(&escape_text(t)),
            NodeKind::Comment(t) => {
                out.push_str("<!--");
                out.push_str(t);
                out.push_str("-->");
            }
            NodeKind::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in &node.attributes {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&value.replace('"', "&quot;"));
                        out.push('"');
                    }
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for &child in &node.children {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeKind::Document | NodeKind::ShadowRoot => {
                for &child in &node.children {
                    self.write_html(child, out);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// =============================================================================
// TESTS
// =============================================================================
