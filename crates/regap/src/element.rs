//! Element lifecycle controller.
//!
//! A [`HostElement`] composes the attribute, callback, method, and slot
//! reflectors for one custom element node and drives renders through the
//! element's [`Renderer`]:
//!
//! ```text
//! uncreated -> created -> attached <-> attribute changed -> detached
//! ```
//!
//! Each transition runs the user's before/after [`Hooks`] around the
//! [`Lifecycle`] step, which can be overridden per element type.

use std::fmt;
use std::rc::Rc;

use crate::attrs::AttrReflector;
use crate::callbacks::CallbackReflector;
use crate::dom::{Dom, Listener, NodeId};
use crate::error::{MethodError, RenderError};
use crate::framework::{Instance, Mounted, Renderer};
use crate::methods::{ForwardedMethod, MethodForwarder};
use crate::registry::ElementDefinition;
use crate::slots::SlotDistributor;
use crate::value::{Callback, PropValue};

/// Where a host element is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uncreated,
    Created,
    Attached,
    Detached,
}

/// A native attribute mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    pub name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

pub type Hook = Rc<dyn Fn(&HostElement)>;
pub type AttributeHook = Rc<dyn Fn(&HostElement, &AttributeChange)>;

/// User hooks run around each lifecycle step.
#[derive(Clone, Default)]
pub struct Hooks {
    pub before_created: Option<Hook>,
    pub after_created: Option<Hook>,
    pub before_attached: Option<Hook>,
    pub after_attached: Option<Hook>,
    pub before_attribute_changed: Option<AttributeHook>,
    pub after_attribute_changed: Option<AttributeHook>,
    pub before_detached: Option<Hook>,
    pub after_detached: Option<Hook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<&str> = [
            ("before_created", self.before_created.is_some()),
            ("after_created", self.after_created.is_some()),
            ("before_attached", self.before_attached.is_some()),
            ("after_attached", self.after_attached.is_some()),
            ("before_attribute_changed", self.before_attribute_changed.is_some()),
            ("after_attribute_changed", self.after_attribute_changed.is_some()),
            ("before_detached", self.before_detached.is_some()),
            ("after_detached", self.after_detached.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect();

        f.debug_tuple("Hooks").field(&set).finish()
    }
}

/// The steps between the hooks. Override to replace the default behavior of
/// an element type; call the `HostElement` methods to keep parts of it.
pub trait Lifecycle {
    fn created(&self, host: &mut HostElement) {
        host.initialize();
    }

    fn attached(&self, host: &mut HostElement) -> Result<(), RenderError> {
        host.render()
    }

    fn attribute_changed(
        &self,
        host: &mut HostElement,
        change: &AttributeChange,
    ) -> Result<(), RenderError> {
        let _ = change;
        host.render()
    }

    fn detached(&self, host: &mut HostElement) {
        let _ = host;
    }
}

/// Lifecycle with every step left at its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLifecycle;

impl Lifecycle for DefaultLifecycle {}

/// A custom element instance hosting one component.
pub struct HostElement {
    dom: Dom,
    node: NodeId,
    definition: Rc<ElementDefinition>,
    renderer: Box<dyn Renderer>,
    attrs: AttrReflector,
    callbacks: CallbackReflector,
    methods: MethodForwarder,
    slots: SlotDistributor,
    mounted: Option<Mounted>,
    state: LifecycleState,
    regap: bool,
}

impl fmt::Debug for HostElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostElement")
            .field("tag", &self.definition.tag)
            .field("node", &self.node)
            .field("state", &self.state)
            .field("mounted", &self.mounted)
            .finish()
    }
}

impl HostElement {
    /// Wrap an element node. Nothing is initialized until [`created`](Self::created).
    pub fn new(
        dom: &Dom,
        node: NodeId,
        definition: Rc<ElementDefinition>,
        renderer: Box<dyn Renderer>,
    ) -> Self {
        Self {
            dom: dom.clone(),
            node,
            definition,
            renderer,
            attrs: AttrReflector::default(),
            callbacks: CallbackReflector::default(),
            methods: MethodForwarder::default(),
            slots: SlotDistributor::default(),
            mounted: None,
            state: LifecycleState::Uncreated,
            regap: false,
        }
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn tag(&self) -> &str {
        &self.definition.tag
    }

    pub fn definition(&self) -> &Rc<ElementDefinition> {
        &self.definition
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// True once the element has been initialized by this crate.
    pub fn is_regap(&self) -> bool {
        self.regap
    }

    fn lifecycle(&self) -> Rc<dyn Lifecycle> {
        self.definition.options.lifecycle.clone()
    }

    fn hooks(&self) -> Hooks {
        self.definition.options.hooks.clone()
    }

    // Lifecycle transitions

    pub fn created(&mut self) {
        if self.state != LifecycleState::Uncreated {
            tracing::debug!(tag = self.tag(), state = ?self.state, "Ignoring repeated created");
            return;
        }

        let hooks = self.hooks();
        if let Some(hook) = &hooks.before_created {
            hook(self);
        }
        self.lifecycle().created(self);
        self.state = LifecycleState::Created;
        tracing::debug!(tag = self.tag(), node = ?self.node, "Element created");
        if let Some(hook) = &hooks.after_created {
            hook(self);
        }
    }

    pub fn attached(&mut self) -> Result<(), RenderError> {
        if self.state != LifecycleState::Created {
            tracing::debug!(tag = self.tag(), state = ?self.state, "Ignoring attached");
            return Ok(());
        }

        let hooks = self.hooks();
        if let Some(hook) = &hooks.before_attached {
            hook(self);
        }
        self.state = LifecycleState::Attached;
        tracing::debug!(tag = self.tag(), node = ?self.node, "Element attached");
        self.lifecycle().attached(self)?;
        if let Some(hook) = &hooks.after_attached {
            hook(self);
        }
        Ok(())
    }

    /// Run the attribute-changed step. Only attached elements react.
    pub fn attribute_changed(&mut self, change: &AttributeChange) -> Result<(), RenderError> {
        if self.state != LifecycleState::Attached {
            return Ok(());
        }

        let hooks = self.hooks();
        if let Some(hook) = &hooks.before_attribute_changed {
            hook(self, change);
        }
        tracing::debug!(tag = self.tag(), attribute = %change.name, "Attribute changed");
        self.lifecycle().attribute_changed(self, change)?;
        if let Some(hook) = &hooks.after_attribute_changed {
            hook(self, change);
        }
        Ok(())
    }

    /// Detach the element. This is terminal.
    pub fn detached(&mut self) {
        if self.state == LifecycleState::Detached {
            return;
        }

        let hooks = self.hooks();
        if let Some(hook) = &hooks.before_detached {
            hook(self);
        }
        self.lifecycle().detached(self);
        self.state = LifecycleState::Detached;
        tracing::debug!(tag = self.tag(), node = ?self.node, "Element detached");
        if let Some(hook) = &hooks.after_detached {
            hook(self);
        }
    }

    // Default lifecycle steps

    /// Instantiate the reflectors from the element definition and copy inline
    /// attributes into their typed properties.
    pub fn initialize(&mut self) {
        let options = &self.definition.options;

        self.attrs = AttrReflector::new(&options.attrs);
        self.attrs.bootstrap(&self.dom, self.node);
        self.callbacks = CallbackReflector::new(&options.callbacks, &self.dom, self.node);
        self.methods = MethodForwarder::new(&options.methods);
        self.slots = SlotDistributor::new(&options.slots);
        self.regap = true;
    }

    /// Compute props and render the component into the host node.
    pub fn render(&mut self) -> Result<(), RenderError> {
        let Some(ctor) = self.definition.component.clone() else {
            tracing::warn!(tag = self.tag(), "No component to render");
            return Ok(());
        };

        let mut props = self.attrs.props();
        props.extend(self.callbacks.props());
        let root = self.mounted.as_ref().map(|mounted| mounted.root);
        props.extend(self.slots.distribute(&self.dom, self.node, root));

        tracing::debug!(tag = self.tag(), component = ctor.name(), props = props.len(), "Rendering");
        let mounted = self.renderer.render(&self.dom, &ctor, props, self.node)?;

        let changed = self
            .mounted
            .as_ref()
            .map_or(true, |old| !Rc::ptr_eq(&old.instance, &mounted.instance));
        if changed {
            self.methods.bind(Some(mounted.instance.clone()));
        }
        self.mounted = Some(mounted);

        self.slots.place(&self.dom);
        Ok(())
    }

    // Attributes

    pub fn set_attribute(&mut self, name: &str, value: &str) -> Result<(), RenderError> {
        let old_value = self.dom.get_attribute(self.node, name);
        self.attrs.set_attribute(&self.dom, self.node, name, value);
        self.notify_attribute(name, old_value)
    }

    pub fn get_attribute(&self, name: &str) -> Option<PropValue> {
        self.attrs.get_attribute(&self.dom, self.node, name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attrs.has_attribute(&self.dom, self.node, name)
    }

    pub fn remove_attribute(&mut self, name: &str) -> Result<(), RenderError> {
        let old_value = self.dom.get_attribute(self.node, name);
        self.attrs.remove_attribute(&self.dom, self.node, name);
        self.notify_attribute(name, old_value)
    }

    /// Typed property of a declared attribute.
    pub fn property(&self, name: &str) -> Option<&PropValue> {
        self.attrs.property(name)
    }

    /// Write a typed property. Returns `Ok(false)` for undeclared names.
    pub fn set_property(&mut self, name: &str, value: impl Into<PropValue>) -> Result<bool, RenderError> {
        let old_value = self.dom.get_attribute(self.node, name);
        if !self.attrs.set_property(&self.dom, self.node, name, &value.into()) {
            return Ok(false);
        }
        self.notify_attribute(name, old_value)?;
        Ok(true)
    }

    /// Declared attributes with their typed values.
    pub fn attributes(&self) -> Vec<(String, Option<PropValue>)> {
        self.attrs.values()
    }

    fn notify_attribute(&mut self, name: &str, old_value: Option<String>) -> Result<(), RenderError> {
        let change = AttributeChange {
            name: name.to_ascii_lowercase(),
            old_value,
            new_value: self.dom.get_attribute(self.node, name),
        };
        self.attribute_changed(&change)
    }

    // Events

    pub fn add_event_listener(&self, event: &str, listener: Listener) {
        self.callbacks
            .add_event_listener(&self.dom, self.node, event, listener);
    }

    pub fn remove_event_listener(&self, event: &str, listener: &Listener) {
        self.callbacks
            .remove_event_listener(&self.dom, self.node, event, listener);
    }

    /// Dispatcher handed to the component for a declared event.
    pub fn dispatcher(&self, event: &str) -> Option<Callback> {
        self.callbacks.dispatcher(event).cloned()
    }

    // Methods

    pub fn call_method(&self, name: &str, args: &[PropValue]) -> Result<Option<PropValue>, MethodError> {
        self.methods.call(name, args)
    }

    /// Handle to an exposed method that follows re-renders.
    pub fn method(&self, name: &str) -> Option<ForwardedMethod> {
        self.methods.method(name)
    }

    // Children

    /// Append a child to the host and redistribute slots.
    pub fn append_child(&mut self, child: NodeId) -> Result<(), RenderError> {
        self.dom.append_child(self.node, child);
        self.children_changed()
    }

    /// Remove a host child or slotted node. Returns `Ok(false)` if `child`
    /// belongs to neither.
    pub fn remove_child(&mut self, child: NodeId) -> Result<bool, RenderError> {
        let assigned = self.slots.forget(child);
        if !assigned && self.dom.parent(child) != Some(self.node) {
            return Ok(false);
        }
        self.dom.detach(child);
        self.children_changed()?;
        Ok(true)
    }

    fn children_changed(&mut self) -> Result<(), RenderError> {
        self.slots.invalidate();
        if self.state == LifecycleState::Attached {
            self.render()?;
        }
        Ok(())
    }

    /// Nodes distributed to a slot by the last classification.
    pub fn slot_nodes(&self, slot: &str) -> &[NodeId] {
        self.slots.nodes(slot)
    }

    /// Slot names with their distributed nodes.
    pub fn slot_assignments(&self) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.slots.assignments()
    }

    // Rendered component

    /// The live component instance.
    pub fn component(&self) -> Option<Instance> {
        self.mounted.as_ref().map(|mounted| mounted.instance.clone())
    }

    /// Root node of the rendered component.
    pub fn root(&self) -> Option<NodeId> {
        self.mounted.as_ref().map(|mounted| mounted.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::AttrOption;
    use crate::callbacks::CallbackOption;
    use crate::dom::{parse_fragment, CustomEvent};
    use crate::framework::{Component, ComponentCtor};
    use crate::methods::MethodOption;
    use crate::registry::{ElementOptions, Registry};
    use crate::slots::SlotOption;
    use crate::value::Props;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    /// Renders `<div data-title="..">` with each slot's placeholder inside,
    /// and counts renders.
    struct Panel {
        renders: i64,
        on_close: Option<Callback>,
    }

    impl Component for Panel {
        fn render(&mut self, props: &Props, dom: &Dom) -> Result<NodeId, RenderError> {
            self.renders += 1;
            self.on_close = props.callback("onClose").cloned();

            let root = dom.create_element("div");
            if let Some(title) = props.get("title").and_then(PropValue::as_str) {
                dom.set_attribute(root, "data-title", title);
            }
            for name in ["header", "children"] {
                if let Some(proxy) = props.slot(name) {
                    dom.append_child(root, proxy.mount(dom));
                }
            }
            Ok(root)
        }

        fn call(&mut self, method: &str, args: &[PropValue]) -> Option<PropValue> {
            match method {
                "renderCount" => Some(PropValue::from(self.renders)),
                "close" => {
                    self.on_close.as_ref()?.call(args);
                    Some(PropValue::from(true))
                }
                _ => None,
            }
        }
    }

    fn panel() -> ComponentCtor {
        ComponentCtor::new("Panel", || Panel {
            renders: 0,
            on_close: None,
        })
    }

    fn options() -> ElementOptions {
        ElementOptions::new()
            .attr("title", AttrOption::string("title"))
            .callback("close", CallbackOption::new("onClose"))
            .slot("header", SlotOption::new("header"))
            .method("renders", MethodOption::new("renderCount"))
            .method("close", MethodOption::new("close"))
    }

    fn mount(registry: &Registry, markup: &str) -> (Dom, HostElement) {
        let dom = Dom::new();
        parse_fragment(&dom, dom.document(), markup).unwrap();
        let mut hosts = registry.upgrade(&dom, dom.document()).unwrap();
        (dom, hosts.remove(0))
    }

    fn registry_with(options: ElementOptions) -> Registry {
        let mut registry = Registry::new();
        registry.register("x-panel", panel(), options).unwrap();
        registry
    }

    #[test]
    fn first_render_distributes_slots() {
        let registry = registry_with(options());
        let (dom, host) = mount(
            &registry,
            r#"<x-panel title="Hi"><b slot="header">H</b> body </x-panel>"#,
        );

        assert!(host.is_regap());
        assert_eq!(host.state(), LifecycleState::Attached);
        assert_eq!(
            dom.inner_html(host.node()),
            concat!(
                r#"<div data-title="Hi"><regap-children><b slot="header">H</b></regap-children>"#,
                "<regap-children> body </regap-children></div>"
            )
        );
    }

    #[test]
    fn hooks_run_in_lifecycle_order() {
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();
        let hook = |name: &'static str| -> Option<Hook> {
            let log = log.clone();
            Some(Rc::new(move |_: &HostElement| log.borrow_mut().push(name)))
        };
        let mut opts = options();
        opts.hooks = Hooks {
            before_created: hook("before-created"),
            after_created: hook("after-created"),
            before_attached: hook("before-attached"),
            after_attached: hook("after-attached"),
            before_detached: hook("before-detached"),
            after_detached: hook("after-detached"),
            ..Hooks::default()
        };
        let registry = registry_with(opts);

        let (_dom, mut host) = mount(&registry, "<x-panel></x-panel>");
        host.detached();

        assert_eq!(
            *log.borrow(),
            vec![
                "before-created",
                "after-created",
                "before-attached",
                "after-attached",
                "before-detached",
                "after-detached"
            ]
        );
    }

    #[test]
    fn attribute_change_rerenders_with_hooks() {
        // (hook, change, render count seen by the hook)
        let log: Rc<RefCell<Vec<(&'static str, AttributeChange, Option<PropValue>)>>> = Rc::default();
        let hook = |name: &'static str| -> Option<AttributeHook> {
            let log = log.clone();
            Some(Rc::new(move |host: &HostElement, change: &AttributeChange| {
                let renders = host.call_method("renders", &[]).unwrap();
                log.borrow_mut().push((name, change.clone(), renders));
            }))
        };
        let mut opts = options();
        opts.hooks.before_attribute_changed = hook("before");
        opts.hooks.after_attribute_changed = hook("after");
        let registry = registry_with(opts);
        let (dom, mut host) = mount(&registry, r#"<x-panel title="a"></x-panel>"#);

        host.set_attribute("TITLE", "b").unwrap();

        let change = AttributeChange {
            name: "title".to_string(),
            old_value: Some("a".to_string()),
            new_value: Some("b".to_string()),
        };
        assert_eq!(
            *log.borrow(),
            vec![
                ("before", change.clone(), Some(PropValue::from(1i64))),
                ("after", change, Some(PropValue::from(2i64))),
            ]
        );
        assert_eq!(dom.inner_html(host.node()), r#"<div data-title="b"></div>"#);
        assert_eq!(
            host.call_method("renders", &[]).unwrap(),
            Some(PropValue::from(2i64))
        );
    }

    #[test]
    fn listener_calling_back_into_a_running_method_gets_busy() {
        let registry = registry_with(options());
        let (_dom, host) = mount(&registry, "<x-panel></x-panel>");
        let renders = host.method("renders").unwrap();
        let inner: Rc<RefCell<Vec<Result<Option<PropValue>, MethodError>>>> = Rc::default();

        let results = inner.clone();
        host.add_event_listener(
            "close",
            Listener::new(move |_: &CustomEvent| results.borrow_mut().push(renders.call(&[]))),
        );

        assert_eq!(host.call_method("close", &[]), Ok(Some(PropValue::from(true))));
        assert_eq!(
            *inner.borrow(),
            vec![Err(MethodError::Busy("renders".to_string()))]
        );
        // The instance is usable again once the outer call returns
        assert_eq!(host.call_method("renders", &[]), Ok(Some(PropValue::from(1i64))));
    }

    #[test]
    fn attribute_changes_before_attach_do_not_render() {
        let registry = registry_with(options());
        let dom = Dom::new();
        let mut host = registry.create_element(&dom, "x-panel").unwrap();

        host.set_attribute("title", "early").unwrap();

        assert_eq!(host.root(), None);
        assert_eq!(host.property("title"), Some(&PropValue::from("early")));
    }

    #[test]
    fn methods_warn_until_rendered_then_forward() {
        let registry = registry_with(options());
        let dom = Dom::new();
        let mut host = registry.create_element(&dom, "x-panel").unwrap();
        let handle = host.method("renders").unwrap();

        assert_eq!(handle.call(&[]), Ok(None));

        dom.append_child(dom.document(), host.node());
        host.attached().unwrap();
        assert_eq!(handle.call(&[]), Ok(Some(PropValue::from(1i64))));
    }

    #[test]
    fn component_callbacks_reach_host_listeners() {
        let registry = registry_with(options());
        let (dom, host) = mount(&registry, "<x-panel></x-panel>");
        let received: Rc<RefCell<Vec<Vec<PropValue>>>> = Rc::default();
        let bubbled = Rc::new(RefCell::new(0));

        let sink = received.clone();
        host.add_event_listener(
            "close",
            Listener::new(move |event: &CustomEvent| sink.borrow_mut().push(event.detail().to_vec())),
        );
        let count = bubbled.clone();
        dom.add_event_listener(
            dom.document(),
            "close",
            Listener::new(move |_| *count.borrow_mut() += 1),
        );

        host.call_method("close", &[PropValue::from("reason")]).unwrap();

        assert_eq!(*received.borrow(), vec![vec![PropValue::from("reason")]]);
        assert_eq!(*bubbled.borrow(), 1);
    }

    #[test]
    fn appended_children_join_the_default_slot() {
        let registry = registry_with(options());
        let (dom, mut host) = mount(&registry, "<x-panel>first</x-panel>");

        let extra = dom.create_element("i");
        host.append_child(extra).unwrap();

        assert_eq!(host.slot_nodes("children").len(), 2);
        assert_eq!(
            dom.inner_html(host.node()),
            "<div><regap-children>first<i></i></regap-children></div>"
        );
    }

    #[test]
    fn removed_children_leave_their_slot() {
        let registry = registry_with(options());
        let (dom, mut host) = mount(&registry, r#"<x-panel><b slot="header">H</b></x-panel>"#);
        let header = host.slot_nodes("header")[0];

        assert!(host.remove_child(header).unwrap());

        assert!(host.slot_nodes("header").is_empty());
        assert_eq!(dom.parent(header), None);
        assert!(!host.remove_child(header).unwrap());
    }

    #[test]
    fn detached_is_terminal() {
        let registry = registry_with(options());
        let (_dom, mut host) = mount(&registry, "<x-panel></x-panel>");

        host.detached();
        host.attached().unwrap();

        assert_eq!(host.state(), LifecycleState::Detached);
    }

    #[test]
    fn custom_lifecycle_replaces_default_steps() {
        struct Static;

        impl Lifecycle for Static {
            fn attached(&self, host: &mut HostElement) -> Result<(), RenderError> {
                let text = host.dom().create_text("static");
                host.dom().append_child(host.node(), text);
                Ok(())
            }
        }

        let registry = registry_with(options().lifecycle(Static));
        let (dom, host) = mount(&registry, "<x-panel></x-panel>");

        assert!(host.is_regap());
        assert!(host.component().is_none());
        assert_eq!(dom.inner_html(host.node()), "static");
    }
}
