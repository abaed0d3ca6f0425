//! Structured events and listener handles.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::dom::NodeId;
use crate::value::PropValue;

/// A structured DOM event carrying an ordered detail payload.
pub struct CustomEvent {
    kind: String,
    detail: Vec<PropValue>,
    bubbles: bool,
    cancelable: bool,
    target: Cell<Option<NodeId>>,
    current_target: Cell<Option<NodeId>>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl CustomEvent {
    /// Create an event that neither bubbles nor can be cancelled.
    pub fn new(kind: &str, detail: Vec<PropValue>) -> Self {
        Self {
            kind: kind.to_string(),
            detail,
            bubbles: false,
            cancelable: false,
            target: Cell::new(None),
            current_target: Cell::new(None),
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }
    }

    /// Set whether the event bubbles through ancestors.
    pub fn bubbling(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    /// Set whether `prevent_default` has an effect.
    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Arguments the event was raised with, in call order.
    pub fn detail(&self) -> &[PropValue] {
        &self.detail
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    /// Node the event was dispatched at.
    pub fn target(&self) -> Option<NodeId> {
        self.target.get()
    }

    /// Node whose listeners are currently running.
    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target.get()
    }

    /// Prevent default action
    pub fn prevent_default(&self) {
        if self.cancelable {
            self.default_prevented.set(true);
        }
    }

    /// Check if default was prevented
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Stop propagation
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub(crate) fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    pub(crate) fn set_target(&self, target: NodeId) {
        self.target.set(Some(target));
    }

    pub(crate) fn set_current_target(&self, node: Option<NodeId>) {
        self.current_target.set(node);
    }
}

impl fmt::Debug for CustomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEvent")
            .field("kind", &self.kind)
            .field("detail", &self.detail)
            .field("bubbles", &self.bubbles)
            .field("cancelable", &self.cancelable)
            .field("default_prevented", &self.default_prevented.get())
            .finish()
    }
}

/// An event listener. Identity is the shared function pointer, so a clone of
/// a listener is the same listener.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&CustomEvent)>);

impl Listener {
    pub fn new(f: impl Fn(&CustomEvent) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &CustomEvent) {
        (self.0)(event)
    }

    /// Check if both handles refer to the same listener.
    pub fn ptr_eq(&self, other: &Listener) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}
