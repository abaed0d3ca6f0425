//! Attribute value coercers.
//!
//! Each coercer converts between the raw attribute text in the DOM and the
//! typed value stored on the host. Parsing never fails: unparseable input
//! falls back to a per-type default.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;

use crate::value::{Callback, PropValue};

/// A parse/stringify pair for one attribute shape.
pub trait AttrType: fmt::Debug {
    /// Convert a raw or already-typed value into the stored typed value.
    fn parse(&self, value: &PropValue, name: &str) -> PropValue;

    /// Convert a typed value into attribute text.
    fn stringify(&self, value: &PropValue, name: &str) -> String;
}

/// Named coercer, used by manifests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrKind {
    #[default]
    String,
    Number,
    Boolean,
    Array,
    Object,
    Function,
}

impl AttrKind {
    /// Build the coercer for this kind. Function attributes resolve against
    /// `handlers`.
    pub fn to_type(self, handlers: &HandlerTable) -> Rc<dyn AttrType> {
        match self {
            AttrKind::String => Rc::new(StringType),
            AttrKind::Number => Rc::new(NumberType),
            AttrKind::Boolean => Rc::new(BooleanType),
            AttrKind::Array => Rc::new(ArrayType),
            AttrKind::Object => Rc::new(ObjectType),
            AttrKind::Function => Rc::new(FunctionType::new(handlers.clone())),
        }
    }
}

/// JSON text for anything that is not a plain string.
fn json_text(value: &PropValue) -> String {
    match value {
        PropValue::Data(Value::String(s)) => s.clone(),
        PropValue::Data(other) => other.to_string(),
        PropValue::Callback(callback) => callback.name().unwrap_or_default().to_string(),
        PropValue::Slot(_) => String::new(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl AttrType for StringType {
    fn parse(&self, value: &PropValue, _name: &str) -> PropValue {
        PropValue::from(json_text(value))
    }

    fn stringify(&self, value: &PropValue, _name: &str) -> String {
        json_text(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NumberType;

impl AttrType for NumberType {
    fn parse(&self, value: &PropValue, name: &str) -> PropValue {
        match value {
            PropValue::Data(Value::Number(n)) => PropValue::Data(Value::Number(n.clone())),
            PropValue::Data(Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => number_value(n),
                _ => {
                    tracing::debug!(attr = name, raw = %s, "Unparseable number attribute");
                    PropValue::Data(Value::Null)
                }
            },
            _ => PropValue::Data(Value::Null),
        }
    }

    fn stringify(&self, value: &PropValue, _name: &str) -> String {
        json_text(value)
    }
}

/// Integral values stay integers so "3" reflects back as "3", not "3.0".
fn number_value(n: f64) -> PropValue {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        PropValue::from(n as i64)
    } else {
        PropValue::from(n)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanType;

impl AttrType for BooleanType {
    fn parse(&self, value: &PropValue, name: &str) -> PropValue {
        match value {
            PropValue::Data(Value::Bool(b)) => PropValue::from(*b),
            PropValue::Data(Value::String(s)) => PropValue::from(s == "true" || s.is_empty() || s == name),
            _ => PropValue::from(false),
        }
    }

    fn stringify(&self, value: &PropValue, _name: &str) -> String {
        json_text(value)
    }
}

/// Parse JSON5 text, accepting values that already have the wanted shape.
///
/// JSON5 lets attributes use single quotes and bare keys, as in
/// `items="['a', 'b']"` or `options="{size: 2}"`.
fn parse_json(value: &PropValue, name: &str, accept: fn(&Value) -> bool) -> PropValue {
    match value {
        PropValue::Data(Value::String(s)) => match json5::from_str::<Value>(s) {
            Ok(parsed) if accept(&parsed) => PropValue::Data(parsed),
            Ok(_) | Err(_) => {
                tracing::debug!(attr = name, raw = %s, "Unparseable JSON attribute");
                PropValue::Data(Value::Null)
            }
        },
        PropValue::Data(data) if accept(data) => PropValue::Data(data.clone()),
        _ => PropValue::Data(Value::Null),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayType;

impl AttrType for ArrayType {
    fn parse(&self, value: &PropValue, name: &str) -> PropValue {
        parse_json(value, name, Value::is_array)
    }

    fn stringify(&self, value: &PropValue, _name: &str) -> String {
        value.as_data().map(Value::to_string).unwrap_or_else(|| "null".to_string())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectType;

impl AttrType for ObjectType {
    fn parse(&self, value: &PropValue, name: &str) -> PropValue {
        parse_json(value, name, Value::is_object)
    }

    fn stringify(&self, value: &PropValue, _name: &str) -> String {
        value.as_data().map(Value::to_string).unwrap_or_else(|| "null".to_string())
    }
}

/// Callbacks that function attributes may reference by name.
pub type HandlerTable = Rc<BTreeMap<String, Callback>>;

/// Build a handler table from named callbacks. Unnamed callbacks are skipped.
pub fn handler_table(callbacks: impl IntoIterator<Item = Callback>) -> HandlerTable {
    Rc::new(
        callbacks
            .into_iter()
            .filter_map(|cb| cb.name().map(|name| (name.to_string(), cb.clone())))
            .collect(),
    )
}

/// Resolves attribute text such as `on-pick="logPick"` to a registered callback.
#[derive(Debug, Clone, Default)]
pub struct FunctionType {
    handlers: HandlerTable,
}

impl FunctionType {
    pub fn new(handlers: HandlerTable) -> Self {
        Self { handlers }
    }
}

impl AttrType for FunctionType {
    fn parse(&self, value: &PropValue, name: &str) -> PropValue {
        match value {
            PropValue::Callback(callback) => PropValue::Callback(callback.clone()),
            PropValue::Data(Value::String(s)) => match self.handlers.get(s.trim()) {
                Some(callback) => PropValue::Callback(callback.clone()),
                None => {
                    tracing::debug!(attr = name, handler = %s, "Unknown handler for function attribute");
                    PropValue::Data(Value::Null)
                }
            },
            _ => PropValue::Data(Value::Null),
        }
    }

    fn stringify(&self, value: &PropValue, _name: &str) -> String {
        match value {
            PropValue::Callback(callback) => callback.name().unwrap_or_default().to_string(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(s: &str) -> PropValue {
        PropValue::from(s)
    }

    #[test]
    fn string_passes_text_through() {
        assert_eq!(StringType.parse(&raw("hello"), "a"), raw("hello"));
        assert_eq!(StringType.parse(&PropValue::from(5i64), "a"), raw("5"));
        assert_eq!(StringType.stringify(&raw("x"), "a"), "x");
    }

    #[test]
    fn number_parses_and_falls_back_to_null() {
        assert_eq!(NumberType.parse(&raw(" 42 "), "n"), PropValue::from(42i64));
        assert_eq!(NumberType.parse(&raw("1.5"), "n"), PropValue::from(1.5));
        assert!(NumberType.parse(&raw("abc"), "n").is_null());
        assert!(NumberType.parse(&raw("inf"), "n").is_null());
        assert_eq!(NumberType.stringify(&PropValue::from(42i64), "n"), "42");
    }

    #[test]
    fn boolean_follows_presence_rules() {
        assert_eq!(BooleanType.parse(&raw(""), "disabled"), PropValue::from(true));
        assert_eq!(BooleanType.parse(&raw("true"), "disabled"), PropValue::from(true));
        assert_eq!(BooleanType.parse(&raw("disabled"), "disabled"), PropValue::from(true));
        assert_eq!(BooleanType.parse(&raw("no"), "disabled"), PropValue::from(false));
        assert_eq!(BooleanType.parse(&PropValue::from(true), "disabled"), PropValue::from(true));
        assert_eq!(BooleanType.stringify(&PropValue::from(false), "disabled"), "false");
    }

    #[test]
    fn array_and_object_parse_json() {
        assert_eq!(ArrayType.parse(&raw("[1, 2]"), "a"), PropValue::from(json!([1, 2])));
        assert!(ArrayType.parse(&raw("{\"a\": 1}"), "a").is_null());
        assert!(ArrayType.parse(&raw("[oops"), "a").is_null());
        assert_eq!(ObjectType.parse(&raw(r#"{"a": 1}"#), "o"), PropValue::from(json!({"a": 1})));
        assert_eq!(ObjectType.stringify(&PropValue::from(json!({"a": 1})), "o"), r#"{"a":1}"#);
    }

    #[test]
    fn array_and_object_accept_json5() {
        assert_eq!(
            ArrayType.parse(&raw("['a', 'b']"), "a"),
            PropValue::from(json!(["a", "b"]))
        );
        assert_eq!(
            ObjectType.parse(&raw("{a: 1, b: 'two', c: [true,],}"), "o"),
            PropValue::from(json!({"a": 1, "b": "two", "c": [true]}))
        );
        assert!(ObjectType.parse(&raw("{a: }"), "o").is_null());
    }

    #[test]
    fn function_resolves_named_handlers() {
        let pick = Callback::named("logPick", |_| {});
        let function = FunctionType::new(handler_table([pick.clone()]));

        let parsed = function.parse(&raw("logPick"), "on-pick");
        assert_eq!(parsed, PropValue::from(pick));
        assert_eq!(function.stringify(&parsed, "on-pick"), "logPick");
        assert!(function.parse(&raw("missing"), "on-pick").is_null());
    }

    #[test]
    fn kind_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: AttrKind,
        }
        let parsed: Wrapper = toml::from_str("kind = \"boolean\"").unwrap();
        assert_eq!(parsed.kind, AttrKind::Boolean);
    }
}
