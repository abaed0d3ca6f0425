//! Declarative element definitions.
//!
//! A manifest is a TOML file listing `[[element]]` definitions and, optionally,
//! `[[component]]` templates for them to render:
//!
//! ```toml
//! [[element]]
//! tag = "x-card"
//! component = "Card"
//!
//! [element.attrs.title]
//! type = "string"
//!
//! [element.slots.header]
//! prop = "header"
//!
//! [[component]]
//! name = "Card"
//! template = "<div><h2>{{ title }}</h2><regap-outlet></regap-outlet></div>"
//! ```
//!
//! Props, slot props, and method targets default to the key they are declared
//! under.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use walkdir::WalkDir;

use crate::attrs::AttrOption;
use crate::callbacks::CallbackOption;
use crate::error::{RegisterError, RenderError};
use crate::framework::ComponentCtor;
use crate::methods::MethodOption;
use crate::registry::{ElementOptions, Registry};
use crate::slots::SlotOption;
use crate::template::TemplateComponent;
use crate::types::{handler_table, AttrKind, HandlerTable};
use crate::value::Callback;

/// Parsed manifest.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "element")]
    pub elements: Vec<ElementEntry>,

    #[serde(default, rename = "component")]
    pub components: Vec<ComponentEntry>,
}

/// One `[[element]]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ElementEntry {
    pub tag: String,

    /// Name of a bound or template component
    pub component: String,

    #[serde(default)]
    pub attrs: BTreeMap<String, AttrEntry>,

    #[serde(default)]
    pub callbacks: BTreeMap<String, CallbackEntry>,

    #[serde(default)]
    pub slots: BTreeMap<String, SlotEntry>,

    #[serde(default)]
    pub methods: BTreeMap<String, MethodEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AttrEntry {
    #[serde(default)]
    pub prop: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: AttrKind,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CallbackEntry {
    #[serde(default)]
    pub prop: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SlotEntry {
    #[serde(default)]
    pub prop: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MethodEntry {
    #[serde(default)]
    pub target: Option<String>,
}

/// One `[[component]]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComponentEntry {
    pub name: String,
    pub template: String,
}

/// Rust-side values a manifest refers to by name.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    /// Component constructors by name
    pub components: BTreeMap<String, ComponentCtor>,

    /// Callbacks that `function` attributes resolve to
    pub handlers: HandlerTable,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a component under its own name.
    pub fn component(mut self, ctor: ComponentCtor) -> Self {
        self.components.insert(ctor.name().to_string(), ctor);
        self
    }

    /// Bind the handlers `function` attributes may name.
    pub fn handlers(mut self, callbacks: impl IntoIterator<Item = Callback>) -> Self {
        self.handlers = handler_table(callbacks);
        self
    }
}

/// Errors that can occur when loading or applying a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Element <{tag}> uses unknown component '{component}'")]
    UnknownComponent { tag: String, component: String },

    #[error("Component '{component}' failed to compile: {source}")]
    Template {
        component: String,
        #[source]
        source: RenderError,
    },

    #[error(transparent)]
    Register(#[from] RegisterError),
}

impl Manifest {
    /// Parse manifest text.
    pub fn parse(source: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let source = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let manifest = Self::parse(&source)?;
        tracing::debug!(
            path = %path.display(),
            elements = manifest.elements.len(),
            components = manifest.components.len(),
            "Loaded manifest"
        );
        Ok(manifest)
    }

    /// Load and merge every `*.toml` manifest under `dir`, in path order.
    pub fn scan(dir: &Path) -> Result<Self, ManifestError> {
        if !dir.is_dir() {
            return Err(ManifestError::DirectoryNotFound(dir.display().to_string()));
        }

        let mut merged = Self::default();
        for entry in WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            merged.merge(Self::load(path)?);
        }

        tracing::info!(
            elements = merged.elements.len(),
            components = merged.components.len(),
            "Scanned {}",
            dir.display()
        );
        Ok(merged)
    }

    /// Append another manifest's entries.
    pub fn merge(&mut self, other: Manifest) {
        self.elements.extend(other.elements);
        self.components.extend(other.components);
    }

    /// Compile the template components.
    pub fn template_components(&self) -> Result<BTreeMap<String, ComponentCtor>, ManifestError> {
        self.components
            .iter()
            .map(|entry| {
                let ctor = TemplateComponent::ctor(&entry.name, &entry.template).map_err(|source| {
                    ManifestError::Template {
                        component: entry.name.clone(),
                        source,
                    }
                })?;
                Ok((entry.name.clone(), ctor))
            })
            .collect()
    }

    /// Register every element. Bound components take precedence over
    /// template components of the same name. Returns the number registered.
    pub fn register_into(&self, registry: &mut Registry, bindings: &Bindings) -> Result<usize, ManifestError> {
        let templates = self.template_components()?;

        for entry in &self.elements {
            let component = bindings
                .components
                .get(&entry.component)
                .or_else(|| templates.get(&entry.component))
                .cloned()
                .ok_or_else(|| ManifestError::UnknownComponent {
                    tag: entry.tag.clone(),
                    component: entry.component.clone(),
                })?;

            registry.register(&entry.tag, component, entry.options(&bindings.handlers))?;
        }

        Ok(self.elements.len())
    }
}

impl ElementEntry {
    /// Element options for this entry.
    pub fn options(&self, handlers: &HandlerTable) -> ElementOptions {
        let mut options = ElementOptions::new();

        for (name, attr) in &self.attrs {
            let prop = attr.prop.as_deref().unwrap_or(name);
            options = options.attr(
                name,
                AttrOption {
                    prop: prop.to_string(),
                    kind: attr.kind.to_type(handlers),
                },
            );
        }
        for (event, callback) in &self.callbacks {
            let prop = callback.prop.as_deref().unwrap_or(event);
            options = options.callback(event, CallbackOption::new(prop));
        }
        for (name, slot) in &self.slots {
            let prop = slot.prop.as_deref().unwrap_or(name);
            options = options.slot(name, SlotOption::new(prop));
        }
        for (name, method) in &self.methods {
            let target = method.target.as_deref().unwrap_or(name);
            options = options.method(name, MethodOption::new(target));
        }

        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_fragment, Dom};
    use crate::value::PropValue;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    const CARD: &str = r#"
[[element]]
tag = "x-card"
component = "Card"

[element.attrs.title]

[element.attrs.count]
prop = "total"
type = "number"

[element.callbacks.select]
prop = "onSelect"

[element.slots.header]

[element.methods.reset]
target = "clear"

[[component]]
name = "Card"
template = '<div class="card"><h2>{{ title }} ({{ total }})</h2><regap-outlet prop="header"></regap-outlet><regap-outlet></regap-outlet></div>'
"#;

    #[test]
    fn parses_entries_with_defaults() {
        let manifest = Manifest::parse(CARD).unwrap();
        let element = &manifest.elements[0];

        assert_eq!(element.tag, "x-card");
        assert_eq!(element.attrs["title"], AttrEntry::default());
        assert_eq!(element.attrs["count"].kind, AttrKind::Number);
        assert_eq!(element.callbacks["select"].prop.as_deref(), Some("onSelect"));
        assert_eq!(element.slots["header"].prop, None);
        assert_eq!(element.methods["reset"].target.as_deref(), Some("clear"));
        assert_eq!(manifest.components[0].name, "Card");
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            Manifest::parse("[[element]]\ntag = "),
            Err(ManifestError::Parse(_))
        ));
    }

    #[test]
    fn registers_template_components() {
        let manifest = Manifest::parse(CARD).unwrap();
        let mut registry = Registry::new();

        let count = manifest.register_into(&mut registry, &Bindings::new()).unwrap();

        assert_eq!(count, 1);
        let dom = Dom::new();
        parse_fragment(
            &dom,
            dom.document(),
            r#"<x-card title="Deck" count="3"><em slot="header">new</em>body</x-card>"#,
        )
        .unwrap();
        let hosts = registry.upgrade(&dom, dom.document()).unwrap();

        assert_eq!(hosts[0].property("count"), Some(&PropValue::from(3i64)));
        assert_eq!(
            dom.inner_html(hosts[0].node()),
            concat!(
                r#"<div class="card"><h2>Deck (3)</h2>"#,
                r#"<regap-children><em slot="header">new</em></regap-children>"#,
                "<regap-children>body</regap-children></div>"
            )
        );
    }

    #[test]
    fn unknown_components_are_reported() {
        let manifest = Manifest::parse("[[element]]\ntag = \"x-a\"\ncomponent = \"Missing\"\n").unwrap();

        let err = manifest
            .register_into(&mut Registry::new(), &Bindings::new())
            .unwrap_err();

        assert!(matches!(err, ManifestError::UnknownComponent { .. }));
        assert_eq!(err.to_string(), "Element <x-a> uses unknown component 'Missing'");
    }

    #[test]
    fn function_attributes_resolve_bound_handlers() {
        let picked = Rc::new(RefCell::new(0));
        let counter = picked.clone();
        let bindings = Bindings::new().handlers([Callback::named("pick", move |_| {
            *counter.borrow_mut() += 1;
        })]);
        let manifest = Manifest::parse(
            r#"
[[element]]
tag = "x-list"
component = "List"
[element.attrs.on-pick]
prop = "onPick"
type = "function"

[[component]]
name = "List"
template = "<ul></ul>"
"#,
        )
        .unwrap();
        let mut registry = Registry::new();
        manifest.register_into(&mut registry, &bindings).unwrap();
        let dom = Dom::new();

        let mut host = registry.create_element(&dom, "x-list").unwrap();
        host.set_attribute("on-pick", "pick").unwrap();
        host.property("on-pick")
            .and_then(PropValue::as_callback)
            .unwrap()
            .call(&[]);

        assert_eq!(*picked.borrow(), 1);
    }

    #[test]
    fn scan_merges_nested_manifests() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.toml"), CARD).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested/b.toml"),
            "[[element]]\ntag = \"x-b\"\ncomponent = \"Card\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let manifest = Manifest::scan(dir.path()).unwrap();

        let tags: Vec<&str> = manifest.elements.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["x-card", "x-b"]);
        assert_eq!(manifest.components.len(), 1);
    }

    #[test]
    fn scan_requires_a_directory() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            Manifest::scan(&dir.path().join("missing")),
            Err(ManifestError::DirectoryNotFound(_))
        ));
    }
}
