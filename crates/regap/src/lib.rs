//! Host UI framework components inside custom elements.
//!
//! A custom element registered through a [`Registry`] reflects its attributes,
//! events, public methods, and child content into the props of a framework
//! [`Component`], and re-renders that component as the element changes.
//!
//! ```
//! use regap::{parse_fragment, AttrOption, Dom, ElementOptions, Registry, TemplateComponent};
//!
//! let mut registry = Registry::new();
//! let card = TemplateComponent::ctor("Card", "<b>{{ title }}</b>").unwrap();
//! registry
//!     .register("x-card", card, ElementOptions::new().attr("title", AttrOption::string("title")))
//!     .unwrap();
//!
//! let dom = Dom::new();
//! parse_fragment(&dom, dom.document(), r#"<x-card title="Hi"></x-card>"#).unwrap();
//! registry.upgrade(&dom, dom.document()).unwrap();
//!
//! assert_eq!(dom.inner_html(dom.document()), r#"<x-card title="Hi"><b>Hi</b></x-card>"#);
//! ```

pub mod attrs;
pub mod callbacks;
pub mod dom;
pub mod element;
pub mod error;
pub mod framework;
pub mod manifest;
pub mod methods;
pub mod registry;
pub mod slots;
pub mod template;
pub mod types;
pub mod value;

pub use attrs::{AttrOption, AttrReflector};
pub use callbacks::{CallbackOption, CallbackReflector};
pub use dom::{parse_fragment, CustomEvent, Dom, Listener, MarkupError, NodeId};
pub use element::{
    AttributeChange, AttributeHook, DefaultLifecycle, Hook, Hooks, HostElement, Lifecycle,
    LifecycleState,
};
pub use error::{MethodError, RegisterError, RenderError};
pub use framework::{Component, ComponentCtor, DomRenderer, Instance, Mounted, Renderer};
pub use manifest::{Bindings, Manifest, ManifestError};
pub use methods::{ForwardedMethod, MethodForwarder, MethodOption};
pub use registry::{ElementDefinition, ElementOptions, Registry};
pub use slots::{SlotDistributor, SlotOption, SlotProxy};
pub use template::TemplateComponent;
pub use types::{handler_table, AttrKind, AttrType, HandlerTable};
pub use value::{Callback, PropValue, Props};
