//! The component framework boundary.
//!
//! A host element never builds component DOM itself. It hands a
//! [`ComponentCtor`], the computed [`Props`], and its own node (the container)
//! to a [`Renderer`], which mounts or updates the component and reports the
//! live instance and its root node.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::dom::{Dom, NodeId};
use crate::error::RenderError;
use crate::value::{PropValue, Props};

/// A component instance.
pub trait Component {
    /// Build the component's DOM for `props` and return its root node.
    ///
    /// Slot props are [`SlotProxy`](crate::slots::SlotProxy) values; insert
    /// `proxy.mount(dom)` where the slot content belongs.
    fn render(&mut self, props: &Props, dom: &Dom) -> Result<NodeId, RenderError>;

    /// Invoke a public method. Returns `None` if the component has no such
    /// method.
    fn call(&mut self, method: &str, args: &[PropValue]) -> Option<PropValue> {
        let _ = (method, args);
        None
    }
}

/// Shared handle to a live component instance.
pub type Instance = Rc<RefCell<dyn Component>>;

/// Constructor for a component type.
#[derive(Clone)]
pub struct ComponentCtor {
    name: Rc<str>,
    factory: Rc<dyn Fn() -> Instance>,
}

impl ComponentCtor {
    pub fn new<C, F>(name: &str, factory: F) -> Self
    where
        C: Component + 'static,
        F: Fn() -> C + 'static,
    {
        Self {
            name: Rc::from(name),
            factory: Rc::new(move || -> Instance { Rc::new(RefCell::new(factory())) }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a fresh instance.
    pub fn instantiate(&self) -> Instance {
        (self.factory)()
    }

    /// Check if both constructors are the same component type.
    pub fn same(&self, other: &ComponentCtor) -> bool {
        Rc::ptr_eq(&self.factory, &other.factory)
    }
}

impl fmt::Debug for ComponentCtor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentCtor({})", self.name)
    }
}

/// Result of a render: the live instance and the root node it produced.
#[derive(Clone)]
pub struct Mounted {
    pub instance: Instance,
    pub root: NodeId,
}

impl fmt::Debug for Mounted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mounted").field("root", &self.root).finish()
    }
}

/// Mounts components into container nodes.
pub trait Renderer {
    /// Mount `ctor` into `container` with `props`, or update what is mounted.
    fn render(
        &mut self,
        dom: &Dom,
        ctor: &ComponentCtor,
        props: Props,
        container: NodeId,
    ) -> Result<Mounted, RenderError>;
}

/// Builds one renderer per host element.
pub type RendererFactory = Rc<dyn Fn() -> Box<dyn Renderer>>;

/// Default renderer: one retained instance per container.
///
/// The instance is reused while the constructor stays the same. The first
/// mount replaces whatever the container held; later renders swap only the
/// component's root node and release the one it replaced. Components must not
/// hold on to nodes of a root they have replaced, except pinned ones such as
/// slot placeholders.
#[derive(Default)]
pub struct DomRenderer {
    current: Option<(ComponentCtor, Mounted)>,
}

impl DomRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for DomRenderer {
    fn render(
        &mut self,
        dom: &Dom,
        ctor: &ComponentCtor,
        props: Props,
        container: NodeId,
    ) -> Result<Mounted, RenderError> {
        let reuse = self
            .current
            .as_ref()
            .filter(|(current, _)| current.same(ctor))
            .map(|(_, mounted)| mounted.instance.clone());

        let instance = match reuse {
            Some(instance) => instance,
            None => {
                tracing::debug!(component = ctor.name(), "Instantiating component");
                ctor.instantiate()
            }
        };

        let root = match instance.try_borrow_mut() {
            Ok(mut component) => component.render(&props, dom)?,
            Err(_) => return Err(RenderError::Busy(ctor.name().to_string())),
        };

        match self.current.as_ref().map(|(_, mounted)| mounted.root) {
            Some(old_root) if old_root == root => {}
            Some(old_root) if dom.parent(old_root) == Some(container) => {
                dom.replace_with(old_root, root);
                dom.release(old_root);
            }
            Some(old_root) => {
                dom.append_child(container, root);
                dom.release(old_root);
            }
            None => {
                dom.clear_children(container);
                dom.append_child(container, root);
            }
        }

        let mounted = Mounted { instance, root };
        self.current = Some((ctor.clone(), mounted.clone()));
        Ok(mounted)
    }
}
