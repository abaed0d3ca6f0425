//! Error types.

use crate::dom::MarkupError;

/// Errors that can occur when registering an element.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegisterError {
    #[error("Please provide tag name")]
    MissingTagName,

    #[error("Invalid custom element name: {0}")]
    InvalidTagName(String),

    #[error("Please provide a component constructor for <{0}>")]
    MissingComponent(String),

    #[error("Element already defined: {0}")]
    AlreadyDefined(String),
}

/// Errors that can occur when calling an exposed method.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MethodError {
    #[error("Method not exposed: {0}")]
    NotExposed(String),

    #[error("Method '{method}' forwards to '{target}', which the component does not implement")]
    UnknownTarget { method: String, target: String },

    #[error("Method '{0}' called while the component is busy")]
    Busy(String),
}

/// Errors that can occur while rendering a component.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),

    #[error("Template for {0} produced no root element")]
    EmptyTemplate(String),

    #[error("Template for {0} produced more than one root node")]
    MultipleRoots(String),

    #[error("Component {0} is already rendering")]
    Busy(String),
}
