//! Arena DOM shared by host elements, renderers, and listeners.
//!
//! Nodes live in a single arena addressed by [`NodeId`]. The [`Dom`] handle is
//! cheap to clone; every operation borrows the arena only for its own duration,
//! so listeners and components may call back into the DOM freely.

pub mod event;
pub mod markup;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::rc::Rc;

pub use event::{CustomEvent, Listener};
pub use markup::{parse_fragment, MarkupError};

/// Node identifier (index into the arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The document node every connected node descends from.
    pub const DOCUMENT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Element names that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug)]
enum NodeData {
    Document,
    Element {
        tag: String,
        /// Attributes in insertion order
        attrs: Vec<(String, String)>,
    },
    Text(String),
    /// Released slot waiting on the free list
    Vacant,
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
    /// Survives the release of an ancestor
    pinned: bool,
}

#[derive(Default)]
struct Tree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    listeners: HashMap<(NodeId, String), Vec<Listener>>,
}

impl Tree {
    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            parent: None,
            children: Vec::new(),
            data,
            pinned: false,
        };
        match self.free.pop() {
            Some(id) => {
                *self.node_mut(id) = node;
                id
            }
            None => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(node);
                id
            }
        }
    }

    /// Free a detached subtree. Pinned descendants are cut loose instead.
    fn release(&mut self, root: NodeId) -> usize {
        let node = self.node(root);
        if root == NodeId::DOCUMENT
            || node.parent.is_some()
            || node.pinned
            || matches!(node.data, NodeData::Vacant)
        {
            return 0;
        }

        let mut freed = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.node_mut(id);
            let children = std::mem::take(&mut node.children);
            node.data = NodeData::Vacant;
            node.parent = None;
            freed.insert(id);

            for child in children {
                if self.node(child).pinned {
                    self.node_mut(child).parent = None;
                } else {
                    stack.push(child);
                }
            }
        }

        self.listeners.retain(|(node, _), _| !freed.contains(node));
        self.free.extend(freed.iter().copied());
        freed.len()
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|&c| c != id);
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.node(node).parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }
}

/// Shared handle to a document tree.
#[derive(Clone)]
pub struct Dom {
    tree: Rc<RefCell<Tree>>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dom")
            .field("nodes", &self.node_count())
            .finish()
    }
}

impl Dom {
    /// Create an empty document.
    pub fn new() -> Self {
        let mut tree = Tree::default();
        tree.push(NodeData::Document);
        Self {
            tree: Rc::new(RefCell::new(tree)),
        }
    }

    /// The document node.
    pub fn document(&self) -> NodeId {
        NodeId::DOCUMENT
    }

    /// Whether two handles point at the same document.
    pub fn same_document(&self, other: &Dom) -> bool {
        Rc::ptr_eq(&self.tree, &other.tree)
    }

    /// Number of live nodes, the document included.
    pub fn node_count(&self) -> usize {
        let tree = self.tree.borrow();
        tree.nodes.len() - tree.free.len()
    }

    /// Free a detached subtree so its ids can be reused, and drop the
    /// listeners registered on it. Returns the number of nodes freed.
    ///
    /// Connected, pinned, and already released nodes are left alone. A pinned
    /// node inside the subtree is detached with its own subtree intact. Ids
    /// into a released subtree must not be used afterwards.
    pub fn release(&self, node: NodeId) -> usize {
        let freed = self.tree.borrow_mut().release(node);
        if freed > 0 {
            tracing::trace!(?node, freed, "Released subtree");
        }
        freed
    }

    /// Keep `node` and its subtree alive when an ancestor is released.
    pub fn pin(&self, node: NodeId) {
        self.tree.borrow_mut().node_mut(node).pinned = true;
    }

    /// Create a detached element. Tag names are stored lowercase.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.tree.borrow_mut().push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: &str) -> NodeId {
        self.tree.borrow_mut().push(NodeData::Text(text.to_string()))
    }

    /// Append `child` as the last child of `parent`, moving it out of its
    /// current parent first. Appending an ancestor into its own subtree is
    /// ignored.
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        let mut tree = self.tree.borrow_mut();
        if tree.is_ancestor_or_self(child, parent) {
            tracing::debug!(?parent, ?child, "Refusing to append a node into its own subtree");
            return;
        }
        tree.detach(child);
        tree.node_mut(child).parent = Some(parent);
        tree.node_mut(parent).children.push(child);
    }

    /// Replace `old` with `new` at the same position in `old`'s parent.
    /// Returns false when `old` is detached.
    pub fn replace_with(&self, old: NodeId, new: NodeId) -> bool {
        let mut tree = self.tree.borrow_mut();
        let Some(parent) = tree.node(old).parent else {
            return false;
        };
        if old == new || tree.is_ancestor_or_self(new, parent) {
            return false;
        }
        tree.detach(new);
        let Some(pos) = tree.node(parent).children.iter().position(|&c| c == old) else {
            return false;
        };
        tree.node_mut(parent).children[pos] = new;
        tree.node_mut(new).parent = Some(parent);
        tree.node_mut(old).parent = None;
        true
    }

    /// Remove `child` from `parent`. Returns false if it was not a child.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> bool {
        let mut tree = self.tree.borrow_mut();
        if tree.node(child).parent != Some(parent) {
            return false;
        }
        tree.detach(child);
        true
    }

    /// Detach a node from its parent, if any.
    pub fn detach(&self, node: NodeId) {
        self.tree.borrow_mut().detach(node);
    }

    /// Detach every child of `node`, returning them in order.
    pub fn clear_children(&self, node: NodeId) -> Vec<NodeId> {
        let mut tree = self.tree.borrow_mut();
        let children = std::mem::take(&mut tree.node_mut(node).children);
        for &child in &children {
            tree.node_mut(child).parent = None;
        }
        children
    }

    /// Direct children of `node`.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree.borrow().node(node).children.clone()
    }

    /// Parent of `node`.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.borrow().node(node).parent
    }

    /// Whether the node descends from the document node.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.tree.borrow().is_ancestor_or_self(NodeId::DOCUMENT, node)
    }

    /// All descendants of `root` (inclusive) in document order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let tree = self.tree.borrow();
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(tree.node(id).children.iter().rev());
        }
        out
    }

    /// Check if the node is an element.
    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.tree.borrow().node(node).data, NodeData::Element { .. })
    }

    /// Check if the node is a text node.
    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(self.tree.borrow().node(node).data, NodeData::Text(_))
    }

    /// Text node consisting only of whitespace (or empty).
    pub fn is_whitespace_text(&self, node: NodeId) -> bool {
        match &self.tree.borrow().node(node).data {
            NodeData::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Lowercase tag name of an element.
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        match &self.tree.borrow().node(node).data {
            NodeData::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    /// Content of a text node.
    pub fn text(&self, node: NodeId) -> Option<String> {
        match &self.tree.borrow().node(node).data {
            NodeData::Text(text) => Some(text.clone()),
            _ => None,
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeId) -> String {
        self.descendants(node)
            .into_iter()
            .filter_map(|id| self.text(id))
            .collect()
    }

    /// Read a native attribute.
    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        match &self.tree.borrow().node(node).data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.clone()),
            _ => None,
        }
    }

    /// Write a native attribute, keeping the position of an existing one.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        if let NodeData::Element { attrs, .. } = &mut self.tree.borrow_mut().node_mut(node).data {
            match attrs.iter_mut().find(|(key, _)| *key == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => attrs.push((name, value.to_string())),
            }
        }
    }

    /// Check for a native attribute.
    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.get_attribute(node, name).is_some()
    }

    /// Remove a native attribute, returning its previous value.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        match &mut self.tree.borrow_mut().node_mut(node).data {
            NodeData::Element { attrs, .. } => {
                let pos = attrs.iter().position(|(key, _)| *key == name)?;
                Some(attrs.remove(pos).1)
            }
            _ => None,
        }
    }

    /// Native attributes in document order.
    pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        match &self.tree.borrow().node(node).data {
            NodeData::Element { attrs, .. } => attrs.clone(),
            _ => Vec::new(),
        }
    }

    /// Register a native listener. A listener already registered for the same
    /// node and event is not added twice.
    pub fn add_event_listener(&self, node: NodeId, kind: &str, listener: Listener) {
        let mut tree = self.tree.borrow_mut();
        let list = tree.listeners.entry((node, kind.to_string())).or_default();
        if !list.iter().any(|l| l.ptr_eq(&listener)) {
            list.push(listener);
        }
    }

    /// Unregister a native listener.
    pub fn remove_event_listener(&self, node: NodeId, kind: &str, listener: &Listener) {
        let mut tree = self.tree.borrow_mut();
        if let Some(list) = tree.listeners.get_mut(&(node, kind.to_string())) {
            if let Some(pos) = list.iter().position(|l| l.ptr_eq(listener)) {
                list.remove(pos);
            }
        }
    }

    /// Dispatch an event at `target`, bubbling through ancestors when the
    /// event bubbles. Returns false if a listener cancelled it.
    pub fn dispatch_event(&self, target: NodeId, event: &CustomEvent) -> bool {
        let path = {
            let tree = self.tree.borrow();
            let mut path = vec![target];
            if event.bubbles() {
                let mut current = tree.node(target).parent;
                while let Some(id) = current {
                    path.push(id);
                    current = tree.node(id).parent;
                }
            }
            path
        };

        event.set_target(target);
        for node in path {
            let listeners = self
                .tree
                .borrow()
                .listeners
                .get(&(node, event.kind().to_string()))
                .cloned()
                .unwrap_or_default();

            event.set_current_target(Some(node));
            for listener in listeners {
                listener.call(event);
            }
            if event.propagation_stopped() {
                break;
            }
        }
        event.set_current_target(None);

        !event.default_prevented()
    }

    /// Serialize a node and its subtree.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    /// Serialize the children of a node.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        enum Shape {
            Empty,
            Document,
            Element(String, Vec<(String, String)>),
            Text(String),
        }

        let shape = match &self.tree.borrow().node(node).data {
            NodeData::Document => Shape::Document,
            NodeData::Element { tag, attrs } => Shape::Element(tag.clone(), attrs.clone()),
            NodeData::Text(text) => Shape::Text(text.clone()),
            NodeData::Vacant => Shape::Empty,
        };

        match shape {
            Shape::Empty => {}
            Shape::Document => {
                for child in self.children(node) {
                    self.write_html(child, out);
                }
            }
            Shape::Text(text) => out.push_str(&escape_text(&text)),
            Shape::Element(tag, attrs) => {
                out.push('<');
                out.push_str(&tag);
                for (name, value) in attrs {
                    let _ = write!(out, r#" {}="{}""#, name, escape_attr(&value));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for child in self.children(node) {
                    self.write_html(child, out);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}
