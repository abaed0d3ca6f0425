//! Element registration.
//!
//! A [`Registry`] maps custom element tags to [`ElementDefinition`]s and
//! creates [`HostElement`]s for them. It is an ordinary value owned by the
//! application; nothing is registered globally.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::attrs::AttrOption;
use crate::callbacks::CallbackOption;
use crate::dom::{Dom, NodeId};
use crate::element::{DefaultLifecycle, Hooks, HostElement, Lifecycle};
use crate::error::{RegisterError, RenderError};
use crate::framework::{ComponentCtor, DomRenderer, Renderer, RendererFactory};
use crate::methods::MethodOption;
use crate::slots::SlotOption;

/// Hyphenated names that HTML reserves.
const RESERVED_NAMES: &[&str] = &[
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// Configuration of one element type.
#[derive(Clone)]
pub struct ElementOptions {
    /// Reflected attributes by DOM name
    pub attrs: BTreeMap<String, AttrOption>,

    /// Reflected events by event name
    pub callbacks: BTreeMap<String, CallbackOption>,

    /// Named slots by `slot` attribute value
    pub slots: BTreeMap<String, SlotOption>,

    /// Exposed methods by host method name
    pub methods: BTreeMap<String, MethodOption>,

    pub hooks: Hooks,

    /// Steps run between the hooks
    pub lifecycle: Rc<dyn Lifecycle>,
}

impl Default for ElementOptions {
    fn default() -> Self {
        Self {
            attrs: BTreeMap::new(),
            callbacks: BTreeMap::new(),
            slots: BTreeMap::new(),
            methods: BTreeMap::new(),
            hooks: Hooks::default(),
            lifecycle: Rc::new(DefaultLifecycle),
        }
    }
}

impl fmt::Debug for ElementOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementOptions")
            .field("attrs", &self.attrs.keys().collect::<Vec<_>>())
            .field("callbacks", &self.callbacks)
            .field("slots", &self.slots)
            .field("methods", &self.methods)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl ElementOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &str, option: AttrOption) -> Self {
        self.attrs.insert(name.to_ascii_lowercase(), option);
        self
    }

    pub fn callback(mut self, event: &str, option: CallbackOption) -> Self {
        self.callbacks.insert(event.to_string(), option);
        self
    }

    pub fn slot(mut self, name: &str, option: SlotOption) -> Self {
        self.slots.insert(name.to_string(), option);
        self
    }

    pub fn method(mut self, name: &str, option: MethodOption) -> Self {
        self.methods.insert(name.to_string(), option);
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the default lifecycle steps.
    pub fn lifecycle(mut self, lifecycle: impl Lifecycle + 'static) -> Self {
        self.lifecycle = Rc::new(lifecycle);
        self
    }
}

/// A registered element type.
#[derive(Debug)]
pub struct ElementDefinition {
    pub tag: String,

    /// `None` only when registration checks are compiled out
    pub component: Option<ComponentCtor>,

    pub options: ElementOptions,
}

/// Element definitions by tag.
pub struct Registry {
    definitions: BTreeMap<String, Rc<ElementDefinition>>,
    renderer: RendererFactory,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("tags", &self.definitions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Create an empty registry rendering with [`DomRenderer`].
    pub fn new() -> Self {
        Self::with_renderer(|| Box::new(DomRenderer::new()) as Box<dyn Renderer>)
    }

    /// Create an empty registry whose hosts render with renderers from `factory`.
    pub fn with_renderer(factory: impl Fn() -> Box<dyn Renderer> + 'static) -> Self {
        Self {
            definitions: BTreeMap::new(),
            renderer: Rc::new(factory),
        }
    }

    /// Check a custom element name: it must start with a lowercase letter,
    /// contain a hyphen, and not be reserved.
    pub fn is_valid_name(name: &str) -> bool {
        name.contains('-')
            && name.starts_with(|c: char| c.is_ascii_lowercase())
            && !RESERVED_NAMES.contains(&name)
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
    }

    /// Register an element type.
    ///
    /// Debug builds reject a missing tag, an invalid tag, or a missing
    /// component. Registering a tag twice is always an error.
    pub fn register(
        &mut self,
        tag: &str,
        component: impl Into<Option<ComponentCtor>>,
        options: ElementOptions,
    ) -> Result<Rc<ElementDefinition>, RegisterError> {
        let component = component.into();

        if cfg!(debug_assertions) {
            if tag.is_empty() {
                return Err(RegisterError::MissingTagName);
            }
            if component.is_none() {
                return Err(RegisterError::MissingComponent(tag.to_string()));
            }
            if !Self::is_valid_name(tag) {
                return Err(RegisterError::InvalidTagName(tag.to_string()));
            }
        }

        let tag = tag.to_ascii_lowercase();
        if self.definitions.contains_key(&tag) {
            return Err(RegisterError::AlreadyDefined(tag));
        }

        tracing::debug!(
            tag = %tag,
            component = component.as_ref().map(ComponentCtor::name),
            attrs = options.attrs.len(),
            callbacks = options.callbacks.len(),
            slots = options.slots.len(),
            methods = options.methods.len(),
            "Registered element"
        );

        let definition = Rc::new(ElementDefinition {
            tag: tag.clone(),
            component,
            options,
        });
        self.definitions.insert(tag, definition.clone());
        Ok(definition)
    }

    pub fn get(&self, tag: &str) -> Option<&Rc<ElementDefinition>> {
        self.definitions.get(&tag.to_ascii_lowercase())
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Create a detached element of a registered type and run `created`.
    pub fn create_element(&self, dom: &Dom, tag: &str) -> Option<HostElement> {
        let definition = self.get(tag)?.clone();
        let node = dom.create_element(&definition.tag);
        Some(self.host(dom, node, definition))
    }

    /// Wrap an existing element node of a registered type and run `created`.
    pub fn upgrade_node(&self, dom: &Dom, node: NodeId) -> Option<HostElement> {
        let tag = dom.tag_name(node)?;
        let definition = self.get(&tag)?.clone();
        Some(self.host(dom, node, definition))
    }

    /// Upgrade every registered element under `root` (inclusive), in document
    /// order, then attach those connected to the document.
    pub fn upgrade(&self, dom: &Dom, root: NodeId) -> Result<Vec<HostElement>, RenderError> {
        let mut hosts: Vec<HostElement> = dom
            .descendants(root)
            .into_iter()
            .filter_map(|node| self.upgrade_node(dom, node))
            .collect();

        for host in &mut hosts {
            if dom.is_connected(host.node()) {
                host.attached()?;
            }
        }

        tracing::debug!(count = hosts.len(), "Upgraded elements");
        Ok(hosts)
    }

    fn host(&self, dom: &Dom, node: NodeId, definition: Rc<ElementDefinition>) -> HostElement {
        let mut host = HostElement::new(dom, node, definition, (self.renderer)());
        host.created();
        host
    }
}
