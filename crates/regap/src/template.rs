//! Template-backed components.
//!
//! A [`TemplateComponent`] renders a minijinja template with the data props as
//! context. Each `<regap-outlet prop="name">` element in the output is replaced
//! by the slot placeholder for that prop, or removed when the slot is empty.

use std::rc::Rc;

use minijinja::{AutoEscape, Environment};

use crate::dom::{parse_fragment, Dom, NodeId};
use crate::error::RenderError;
use crate::framework::{Component, ComponentCtor};
use crate::slots::CHILDREN;
use crate::value::Props;

/// Tag marking where slot content goes.
pub const OUTLET_TAG: &str = "regap-outlet";

/// Component whose view is a template.
pub struct TemplateComponent {
    name: String,
    env: Rc<Environment<'static>>,
}

impl TemplateComponent {
    /// Compile `source` and return a constructor for components rendering it.
    pub fn ctor(name: &str, source: &str) -> Result<ComponentCtor, RenderError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_template_owned(name.to_string(), source.to_string())?;

        let env = Rc::new(env);
        let name_owned = name.to_string();
        Ok(ComponentCtor::new(name, move || TemplateComponent {
            name: name_owned.clone(),
            env: env.clone(),
        }))
    }

    fn replace_outlets(&self, props: &Props, dom: &Dom, root: NodeId) {
        for node in dom.descendants(root) {
            if node == root || dom.tag_name(node).as_deref() != Some(OUTLET_TAG) {
                continue;
            }

            let prop = dom
                .get_attribute(node, "prop")
                .unwrap_or_else(|| CHILDREN.to_string());
            match props.slot(&prop) {
                Some(proxy) => {
                    dom.replace_with(node, proxy.mount(dom));
                }
                None => dom.detach(node),
            }
            dom.release(node);
        }
    }

    /// The single element the template produced. Whitespace around it is
    /// ignored; any other top-level node is an error.
    fn single_root(&self, dom: &Dom, scratch: NodeId) -> Result<NodeId, RenderError> {
        let (elements, others): (Vec<NodeId>, Vec<NodeId>) = dom
            .children(scratch)
            .into_iter()
            .filter(|&node| !dom.is_whitespace_text(node))
            .partition(|&node| dom.is_element(node));

        match elements.as_slice() {
            [] => Err(RenderError::EmptyTemplate(self.name.clone())),
            [root] if others.is_empty() => Ok(*root),
            _ => Err(RenderError::MultipleRoots(self.name.clone())),
        }
    }
}

impl Component for TemplateComponent {
    fn render(&mut self, props: &Props, dom: &Dom) -> Result<NodeId, RenderError> {
        let html = self.env.get_template(&self.name)?.render(props.data())?;

        let scratch = dom.create_element("template");
        let root = parse_fragment(dom, scratch, &html)
            .map_err(RenderError::from)
            .and_then(|_| self.single_root(dom, scratch));
        if let Ok(root) = root {
            dom.detach(root);
        }
        dom.release(scratch);
        let root = root?;

        self.replace_outlets(props, dom, root);
        Ok(root)
    }
}
