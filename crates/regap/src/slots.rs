//! Slot distribution.
//!
//! Classifies the host's direct children into named slots and hands each
//! non-empty slot to the component as a [`SlotProxy`] prop. The component
//! mounts the proxy wherever the slot content belongs; after the render the
//! slot's nodes are moved into the proxy's placeholder node.
//!
//! Classification runs once per mutation epoch (`invalidate` starts a new
//! one). Moving nodes runs once per slot after its sequence changes.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::{Dom, NodeId};
use crate::value::Props;

/// Name and prop of the implicit default slot.
pub const CHILDREN: &str = "children";

/// Legacy alias for the default slot.
const CONTENT_ALIAS: &str = "content";

/// Tag of the placeholder node a proxy mounts.
pub const PLACEHOLDER_TAG: &str = "regap-children";

/// Declaration of one named slot.
#[derive(Debug, Clone)]
pub struct SlotOption {
    /// Component prop receiving the slot placeholder
    pub prop: String,
}

impl SlotOption {
    pub fn new(prop: &str) -> Self {
        Self {
            prop: prop.to_string(),
        }
    }
}

/// Placeholder component for one slot.
///
/// The placeholder node is created on the first `mount` and returned as-is on
/// every later call, so re-rendering the component never touches the slot
/// content inside it.
#[derive(Clone)]
pub struct SlotProxy {
    inner: Rc<ProxyInner>,
}

struct ProxyInner {
    prop: String,
    node: Cell<Option<NodeId>>,
}

impl SlotProxy {
    fn new(prop: &str) -> Self {
        Self {
            inner: Rc::new(ProxyInner {
                prop: prop.to_string(),
                node: Cell::new(None),
            }),
        }
    }

    /// Prop this proxy was handed out as.
    pub fn prop(&self) -> &str {
        &self.inner.prop
    }

    /// The placeholder node to insert into the component's tree.
    ///
    /// The node is pinned, so releasing a discarded component root keeps it
    /// and the slot content inside it.
    pub fn mount(&self, dom: &Dom) -> NodeId {
        if let Some(node) = self.inner.node.get() {
            return node;
        }
        let node = dom.create_element(PLACEHOLDER_TAG);
        // Outlives the component roots it is mounted into
        dom.pin(node);
        self.inner.node.set(Some(node));
        node
    }

    /// Placeholder node, if the component has mounted it.
    pub fn node(&self) -> Option<NodeId> {
        self.inner.node.get()
    }

    pub fn ptr_eq(&self, other: &SlotProxy) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SlotProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotProxy")
            .field("prop", &self.inner.prop)
            .field("node", &self.inner.node.get())
            .finish()
    }
}

#[derive(Debug)]
struct Slot {
    prop: String,
    nodes: Vec<NodeId>,
    proxy: Option<SlotProxy>,
    /// Nodes have been moved into the proxy since the sequence last changed
    placed: bool,
}

impl Slot {
    fn new(prop: &str) -> Self {
        Self {
            prop: prop.to_string(),
            nodes: Vec::new(),
            proxy: None,
            placed: false,
        }
    }

    fn push(&mut self, dom: &Dom, node: NodeId) {
        if self.nodes.contains(&node) {
            return;
        }
        // Skip whitespace until the slot has real content
        if self.nodes.is_empty() && dom.is_whitespace_text(node) {
            return;
        }
        self.nodes.push(node);
        self.placed = false;
    }

    fn strip_trailing_whitespace(&mut self, dom: &Dom) {
        while self.nodes.last().is_some_and(|&n| dom.is_whitespace_text(n)) {
            self.nodes.pop();
            self.placed = false;
        }
    }
}

fn normalize(slot: &str) -> &str {
    if slot == CONTENT_ALIAS {
        CHILDREN
    } else {
        slot
    }
}

/// Per-instance slot state.
#[derive(Debug)]
pub struct SlotDistributor {
    slots: BTreeMap<String, Slot>,
    fresh: bool,
}

impl Default for SlotDistributor {
    fn default() -> Self {
        Self::new(&BTreeMap::new())
    }
}

impl SlotDistributor {
    /// Instantiate the declared slots plus the default `children` slot.
    pub fn new(options: &BTreeMap<String, SlotOption>) -> Self {
        let mut slots: BTreeMap<String, Slot> = options
            .iter()
            .map(|(name, option)| (normalize(name).to_string(), Slot::new(&option.prop)))
            .collect();
        slots.insert(CHILDREN.to_string(), Slot::new(CHILDREN));

        Self {
            slots,
            fresh: false,
        }
    }

    /// Start a new mutation epoch; the next `distribute` reclassifies.
    pub fn invalidate(&mut self) {
        self.fresh = false;
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn is_declared(&self, slot: &str) -> bool {
        self.slots.contains_key(normalize(slot))
    }

    /// Nodes distributed to a slot, in order.
    pub fn nodes(&self, slot: &str) -> &[NodeId] {
        self.slots
            .get(normalize(slot))
            .map(|s| s.nodes.as_slice())
            .unwrap_or(&[])
    }

    /// Slot names with their distributed nodes.
    pub fn assignments(&self) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.slots
            .iter()
            .map(|(name, slot)| (name.as_str(), slot.nodes.as_slice()))
    }

    /// Drop a node from every slot. Returns true if it was assigned anywhere.
    pub fn forget(&mut self, node: NodeId) -> bool {
        let mut found = false;
        for slot in self.slots.values_mut() {
            let before = slot.nodes.len();
            slot.nodes.retain(|&n| n != node);
            if slot.nodes.len() != before {
                slot.placed = false;
                found = true;
            }
        }
        found
    }

    /// Classify the host's children (once per epoch) and build slot props.
    ///
    /// Empty slots produce no prop.
    pub fn distribute(&mut self, dom: &Dom, host: NodeId, framework_root: Option<NodeId>) -> Props {
        if !self.fresh {
            self.classify(dom, host, framework_root);
            self.fresh = true;
        }

        let mut props = Props::new();
        for slot in self.slots.values_mut() {
            if slot.nodes.is_empty() {
                continue;
            }
            let prop = slot.prop.clone();
            let proxy = slot.proxy.get_or_insert_with(|| SlotProxy::new(&prop));
            props.insert(prop, proxy.clone());
        }
        props
    }

    fn classify(&mut self, dom: &Dom, host: NodeId, framework_root: Option<NodeId>) {
        for child in dom.children(host) {
            if Some(child) == framework_root {
                continue;
            }

            if dom.is_element(child) {
                // Slot as attribute: `<div slot="name"> ... </div>`
                if let Some(name) = dom.get_attribute(child, "slot").filter(|n| !n.is_empty()) {
                    if let Some(slot) = self.slots.get_mut(normalize(&name)) {
                        tracing::trace!(slot = %name, ?child, "Assigned node to slot");
                        slot.push(dom, child);
                        continue;
                    }
                } else if dom.tag_name(child).as_deref() == Some("slot") {
                    // Slot as tag: `<slot name="name"> ... </slot>`
                    let name = dom.get_attribute(child, "name").unwrap_or_default();
                    match self.slots.get_mut(normalize(&name)) {
                        Some(slot) => {
                            for grandchild in dom.children(child) {
                                slot.push(dom, grandchild);
                            }
                        }
                        None => tracing::debug!(slot = %name, "Dropping content for undeclared slot"),
                    }
                    continue;
                }
            }

            if let Some(slot) = self.slots.get_mut(CHILDREN) {
                slot.push(dom, child);
            }
        }

        for slot in self.slots.values_mut() {
            slot.strip_trailing_whitespace(dom);
        }

        tracing::debug!(
            slots = self.slots.values().filter(|s| !s.nodes.is_empty()).count(),
            "Distributed host children"
        );
    }

    /// Move each changed slot's nodes into its mounted placeholder.
    pub fn place(&mut self, dom: &Dom) {
        for slot in self.slots.values_mut() {
            if slot.placed || slot.nodes.is_empty() {
                continue;
            }
            let Some(target) = slot.proxy.as_ref().and_then(SlotProxy::node) else {
                continue;
            };

            dom.clear_children(target);
            for &node in &slot.nodes {
                dom.append_child(target, node);
            }
            slot.placed = true;
        }
    }
}
