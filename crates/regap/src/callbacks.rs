//! Event/callback reflection.
//!
//! Every declared event gets a dispatcher callback that is handed to the
//! component as a prop. Calling it raises a bubbling, cancelable
//! [`CustomEvent`] on the host and then runs the listeners registered on the
//! host for that event, in registration order.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::dom::{CustomEvent, Dom, Listener, NodeId};
use crate::value::{Callback, Props};

/// Declaration of one reflected event.
#[derive(Debug, Clone)]
pub struct CallbackOption {
    /// Component prop receiving the dispatcher
    pub prop: String,
}

impl CallbackOption {
    pub fn new(prop: &str) -> Self {
        Self {
            prop: prop.to_string(),
        }
    }
}

#[derive(Debug)]
struct EventSpec {
    prop: String,
    listeners: Rc<RefCell<Vec<Listener>>>,
    dispatcher: Callback,
}

/// Per-instance event state.
#[derive(Debug, Default)]
pub struct CallbackReflector {
    events: BTreeMap<String, EventSpec>,
}

impl CallbackReflector {
    /// Instantiate the declared events for the host at `node`.
    pub fn new(options: &BTreeMap<String, CallbackOption>, dom: &Dom, node: NodeId) -> Self {
        let events = options
            .iter()
            .map(|(event, option)| {
                let listeners: Rc<RefCell<Vec<Listener>>> = Rc::default();
                let dispatcher = dispatcher(dom.clone(), node, event.clone(), listeners.clone());
                (
                    event.clone(),
                    EventSpec {
                        prop: option.prop.clone(),
                        listeners,
                        dispatcher,
                    },
                )
            })
            .collect();

        Self { events }
    }

    pub fn is_declared(&self, event: &str) -> bool {
        self.events.contains_key(event)
    }

    /// `addEventListener`: declared events keep their own ordered, deduplicated
    /// listener list; anything else is a native listener.
    pub fn add_event_listener(&self, dom: &Dom, node: NodeId, event: &str, listener: Listener) {
        let Some(spec) = self.events.get(event) else {
            dom.add_event_listener(node, event, listener);
            return;
        };

        let mut listeners = spec.listeners.borrow_mut();
        if !listeners.iter().any(|l| l.ptr_eq(&listener)) {
            listeners.push(listener);
        }
    }

    /// `removeEventListener`: removes the first matching listener.
    pub fn remove_event_listener(&self, dom: &Dom, node: NodeId, event: &str, listener: &Listener) {
        let Some(spec) = self.events.get(event) else {
            dom.remove_event_listener(node, event, listener);
            return;
        };

        let mut listeners = spec.listeners.borrow_mut();
        if let Some(pos) = listeners.iter().position(|l| l.ptr_eq(listener)) {
            listeners.remove(pos);
        }
    }

    /// The dispatcher for a declared event.
    pub fn dispatcher(&self, event: &str) -> Option<&Callback> {
        self.events.get(event).map(|spec| &spec.dispatcher)
    }

    /// Number of listeners registered for a declared event.
    pub fn listener_count(&self, event: &str) -> usize {
        self.events
            .get(event)
            .map_or(0, |spec| spec.listeners.borrow().len())
    }

    /// One dispatcher prop per declared event.
    pub fn props(&self) -> Props {
        let mut props = Props::new();
        for spec in self.events.values() {
            props.insert(spec.prop.clone(), spec.dispatcher.clone());
        }
        props
    }
}

fn dispatcher(
    dom: Dom,
    node: NodeId,
    event: String,
    listeners: Rc<RefCell<Vec<Listener>>>,
) -> Callback {
    Callback::new(move |args| {
        let custom = CustomEvent::new(&event, args.to_vec())
            .bubbling(true)
            .cancelable(true);
        tracing::trace!(event = %event, args = args.len(), "Dispatching component callback");
        dom.dispatch_event(node, &custom);

        // Snapshot so listeners may add or remove listeners while running
        let current = listeners.borrow().clone();
        for listener in current {
            listener.call(&custom);
        }
    })
}
