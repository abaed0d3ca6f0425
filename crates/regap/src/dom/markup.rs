//! Markup fragment parser.
//!
//! Parses host markup such as `<x-card title="Hi"><div slot="header">A</div>text</x-card>`
//! with html5ever and copies the result into the arena. Parsing follows the
//! HTML5 fragment algorithm in a `<body>` context, so implied end tags,
//! character references, and stray closing tags are handled the way a browser
//! handles them. Comments are dropped.

use html5ever::tendril::TendrilSink;
use html5ever::{local_name, ns, parse_fragment as parse_html, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::dom::{Dom, NodeId};

/// Errors that can occur when parsing markup.
#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    #[error("Failed to read markup: {0}")]
    Read(#[from] std::io::Error),
}

/// Parse `source` and append the resulting nodes to `parent`.
///
/// Returns the top-level nodes that were appended.
pub fn parse_fragment(dom: &Dom, parent: NodeId, source: &str) -> Result<Vec<NodeId>, MarkupError> {
    let context = QualName::new(None, ns!(html), local_name!("body"));
    let parsed = parse_html(RcDom::default(), ParseOpts::default(), context, Vec::new(), false)
        .from_utf8()
        .read_from(&mut source.as_bytes())?;

    // Fragment nodes hang off the synthetic <html> root
    let Some(root) = parsed.document.children.borrow().first().cloned() else {
        return Ok(Vec::new());
    };

    let top_level: Vec<NodeId> = root
        .children
        .borrow()
        .iter()
        .filter_map(|child| convert_node(dom, child, parent))
        .collect();
    tracing::trace!("Parsed {} top-level nodes", top_level.len());

    Ok(top_level)
}

/// Copy an RcDom node and its subtree under `parent`.
fn convert_node(dom: &Dom, handle: &Handle, parent: NodeId) -> Option<NodeId> {
    let node = match &handle.data {
        RcNodeData::Text { contents } => dom.create_text(&contents.borrow()),
        RcNodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let element = dom.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                dom.set_attribute(element, &attr.name.local, &attr.value);
            }

            // <template> keeps its children in a separate fragment
            let contents = template_contents
                .borrow()
                .clone()
                .unwrap_or_else(|| handle.clone());
            for child in contents.children.borrow().iter() {
                convert_node(dom, child, element);
            }
            element
        }
        RcNodeData::Document
        | RcNodeData::Doctype { .. }
        | RcNodeData::Comment { .. }
        | RcNodeData::ProcessingInstruction { .. } => return None,
    };

    dom.append_child(parent, node);
    Some(node)
}
