//! Attribute reflection.
//!
//! Declared attributes get a typed property on the host. Writes through the
//! property (or through `set_attribute` on a declared name) are parsed, stored,
//! and written back to the DOM in stringified form, so the stored value and the
//! visible attribute never diverge. Undeclared names go straight to the DOM.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::dom::{Dom, NodeId};
use crate::types::{
    ArrayType, AttrType, BooleanType, NumberType, ObjectType, StringType,
};
use crate::value::{PropValue, Props};

/// Declaration of one reflected attribute.
#[derive(Debug, Clone)]
pub struct AttrOption {
    /// Component prop receiving the typed value
    pub prop: String,

    /// Coercer between attribute text and typed value
    pub kind: Rc<dyn AttrType>,
}

impl AttrOption {
    pub fn new(prop: &str, kind: impl AttrType + 'static) -> Self {
        Self {
            prop: prop.to_string(),
            kind: Rc::new(kind),
        }
    }

    pub fn string(prop: &str) -> Self {
        Self::new(prop, StringType)
    }

    pub fn number(prop: &str) -> Self {
        Self::new(prop, NumberType)
    }

    pub fn boolean(prop: &str) -> Self {
        Self::new(prop, BooleanType)
    }

    pub fn array(prop: &str) -> Self {
        Self::new(prop, ArrayType)
    }

    pub fn object(prop: &str) -> Self {
        Self::new(prop, ObjectType)
    }
}

#[derive(Debug, Clone)]
struct AttrSpec {
    prop: String,
    kind: Rc<dyn AttrType>,
    /// `None` means the attribute is absent
    value: Option<PropValue>,
}

/// Per-instance reflected attribute state, keyed by lowercase DOM name.
#[derive(Debug, Clone, Default)]
pub struct AttrReflector {
    specs: BTreeMap<String, AttrSpec>,
}

impl AttrReflector {
    /// Instantiate the declared attributes for one host.
    pub fn new(options: &BTreeMap<String, AttrOption>) -> Self {
        let specs = options
            .iter()
            .map(|(name, option)| {
                (
                    name.to_ascii_lowercase(),
                    AttrSpec {
                        prop: option.prop.clone(),
                        kind: option.kind.clone(),
                        value: None,
                    },
                )
            })
            .collect();

        Self { specs }
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.specs.contains_key(&name.to_ascii_lowercase())
    }

    /// Declared attribute names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Copy every declared attribute present in the markup into its typed
    /// property, in document attribute order.
    pub fn bootstrap(&mut self, dom: &Dom, node: NodeId) {
        for (name, value) in dom.attributes(node) {
            if self.is_declared(&name) {
                self.set_property(dom, node, &name, &PropValue::from(value));
            }
        }
    }

    /// Typed property read.
    pub fn property(&self, name: &str) -> Option<&PropValue> {
        self.specs
            .get(&name.to_ascii_lowercase())
            .and_then(|spec| spec.value.as_ref())
    }

    /// Typed property write: parse, store, and reflect the stringified value
    /// to the DOM. Returns false for undeclared names.
    pub fn set_property(&mut self, dom: &Dom, node: NodeId, name: &str, value: &PropValue) -> bool {
        let name = name.to_ascii_lowercase();
        let Some(spec) = self.specs.get_mut(&name) else {
            return false;
        };

        let parsed = spec.kind.parse(value, &name);
        let text = spec.kind.stringify(&parsed, &name);
        spec.value = Some(parsed);
        dom.set_attribute(node, &name, &text);
        true
    }

    /// `setAttribute`: declared names go through the typed property.
    pub fn set_attribute(&mut self, dom: &Dom, node: NodeId, name: &str, value: &str) {
        if !self.set_property(dom, node, name, &PropValue::from(value)) {
            dom.set_attribute(node, name, value);
        }
    }

    /// `getAttribute`: declared names return the typed value.
    pub fn get_attribute(&self, dom: &Dom, node: NodeId, name: &str) -> Option<PropValue> {
        if self.is_declared(name) {
            return self.property(name).cloned();
        }
        dom.get_attribute(node, name).map(PropValue::from)
    }

    /// `hasAttribute`: declared names are present while a value is stored.
    pub fn has_attribute(&self, dom: &Dom, node: NodeId, name: &str) -> bool {
        if self.is_declared(name) {
            return self.property(name).is_some();
        }
        dom.has_attribute(node, name)
    }

    /// `removeAttribute`: clears the stored value, then removes the DOM
    /// attribute in every case.
    pub fn remove_attribute(&mut self, dom: &Dom, node: NodeId, name: &str) {
        if let Some(spec) = self.specs.get_mut(&name.to_ascii_lowercase()) {
            spec.value = None;
        }
        dom.remove_attribute(node, name);
    }

    /// Props for every attribute that currently has a value.
    pub fn props(&self) -> Props {
        let mut props = Props::new();
        for spec in self.specs.values() {
            if let Some(value) = &spec.value {
                props.insert(spec.prop.clone(), value.clone());
            }
        }
        props
    }

    /// Declared attributes with their current typed values.
    pub fn values(&self) -> Vec<(String, Option<PropValue>)> {
        self.specs
            .iter()
            .map(|(name, spec)| (name.clone(), spec.value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_fragment;
    use serde_json::json;

    fn options() -> BTreeMap<String, AttrOption> {
        BTreeMap::from([
            ("test-attr".to_string(), AttrOption::string("testAttr")),
            ("Count".to_string(), AttrOption::number("count")),
            ("items".to_string(), AttrOption::array("items")),
        ])
    }

    fn host(markup: &str) -> (Dom, NodeId, AttrReflector) {
        let dom = Dom::new();
        let node = parse_fragment(&dom, dom.document(), markup).unwrap()[0];
        let mut attrs = AttrReflector::new(&options());
        attrs.bootstrap(&dom, node);
        (dom, node, attrs)
    }

    #[test]
    fn reflects_inline_attributes_to_properties() {
        let (_, _, attrs) = host(r#"<x-el test-attr="value" count="7"></x-el>"#);

        assert_eq!(attrs.property("test-attr"), Some(&PropValue::from("value")));
        assert_eq!(attrs.property("count"), Some(&PropValue::from(7i64)));
        assert_eq!(attrs.property("items"), None);
    }

    #[test]
    fn property_write_syncs_dom_attribute() {
        let (dom, node, mut attrs) = host("<x-el></x-el>");

        attrs.set_property(&dom, node, "items", &PropValue::from(json!([1, 2])));

        assert_eq!(dom.get_attribute(node, "items"), Some("[1,2]".to_string()));
        assert_eq!(attrs.property("items"), Some(&PropValue::from(json!([1, 2]))));
    }

    #[test]
    fn set_attribute_on_declared_name_goes_through_parse() {
        let (dom, node, mut attrs) = host("<x-el></x-el>");

        attrs.set_attribute(&dom, node, "COUNT", "12");

        assert_eq!(
            attrs.get_attribute(&dom, node, "count"),
            Some(PropValue::from(12i64))
        );
        assert_eq!(dom.get_attribute(node, "count"), Some("12".to_string()));
    }

    #[test]
    fn declared_get_returns_none_when_unset() {
        let (dom, node, attrs) = host(r#"<x-el test-attr="a"></x-el>"#);

        assert_eq!(attrs.get_attribute(&dom, node, "items"), None);
        assert!(!attrs.has_attribute(&dom, node, "items"));
        assert!(attrs.has_attribute(&dom, node, "test-attr"));
    }

    #[test]
    fn remove_clears_property_and_dom() {
        let (dom, node, mut attrs) = host(r#"<x-el test-attr="a"></x-el>"#);

        attrs.remove_attribute(&dom, node, "test-attr");

        assert_eq!(attrs.property("test-attr"), None);
        assert!(!attrs.has_attribute(&dom, node, "test-attr"));
        assert!(!dom.has_attribute(node, "test-attr"));
    }

    #[test]
    fn undeclared_attributes_pass_through() {
        let (dom, node, mut attrs) = host(r#"<x-el other="1"></x-el>"#);

        assert!(attrs.has_attribute(&dom, node, "other"));
        attrs.set_attribute(&dom, node, "data-free", "v");
        assert_eq!(attrs.get_attribute(&dom, node, "data-free"), Some(PropValue::from("v")));
        attrs.remove_attribute(&dom, node, "data-free");
        assert!(!attrs.has_attribute(&dom, node, "data-free"));
        assert_eq!(attrs.get_attribute(&dom, node, "missing"), None);
    }

    #[test]
    fn props_use_prop_names_and_skip_unset() {
        let (_, _, attrs) = host(r#"<x-el test-attr="a"></x-el>"#);
        let props = attrs.props();

        assert_eq!(props.len(), 1);
        assert_eq!(props.get("testAttr"), Some(&PropValue::from("a")));
    }
}
