//! Values that flow from a host element into component props.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::slots::SlotProxy;

/// A single prop value handed to a component.
#[derive(Clone)]
pub enum PropValue {
    /// Plain data (strings, numbers, booleans, arrays, objects, null)
    Data(Value),
    /// A callable prop
    Callback(Callback),
    /// Placeholder for distributed slot content
    Slot(SlotProxy),
}

impl PropValue {
    /// Get the underlying data if this is a data value.
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            PropValue::Data(value) => Some(value),
            _ => None,
        }
    }

    /// Get as string if it's a string value.
    pub fn as_str(&self) -> Option<&str> {
        self.as_data().and_then(Value::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_data().and_then(Value::as_bool)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_data().and_then(Value::as_f64)
    }

    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            PropValue::Callback(callback) => Some(callback),
            _ => None,
        }
    }

    pub fn as_slot(&self) -> Option<&SlotProxy> {
        match self {
            PropValue::Slot(slot) => Some(slot),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropValue::Data(Value::Null))
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Data(value) => write!(f, "Data({})", value),
            PropValue::Callback(callback) => fmt::Debug::fmt(callback, f),
            PropValue::Slot(slot) => fmt::Debug::fmt(slot, f),
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Data(a), PropValue::Data(b)) => a == b,
            (PropValue::Callback(a), PropValue::Callback(b)) => a.ptr_eq(b),
            (PropValue::Slot(a), PropValue::Slot(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<Value> for PropValue {
    fn from(value: Value) -> Self {
        PropValue::Data(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Data(Value::String(value.to_string()))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Data(Value::String(value))
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Data(Value::Bool(value))
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Data(Value::from(value))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Data(serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number))
    }
}

impl From<Callback> for PropValue {
    fn from(value: Callback) -> Self {
        PropValue::Callback(value)
    }
}

impl From<SlotProxy> for PropValue {
    fn from(value: SlotProxy) -> Self {
        PropValue::Slot(value)
    }
}

/// A callable prop. Clones share identity.
#[derive(Clone)]
pub struct Callback {
    name: Option<Rc<str>>,
    func: Rc<dyn Fn(&[PropValue])>,
}

impl Callback {
    pub fn new(f: impl Fn(&[PropValue]) + 'static) -> Self {
        Self {
            name: None,
            func: Rc::new(f),
        }
    }

    /// Create a callback that can be referenced by name from markup.
    pub fn named(name: &str, f: impl Fn(&[PropValue]) + 'static) -> Self {
        Self {
            name: Some(Rc::from(name)),
            func: Rc::new(f),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn call(&self, args: &[PropValue]) {
        (self.func)(args)
    }

    /// Check if both handles refer to the same function.
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Callback({})", name),
            None => write!(f, "Callback({:p})", Rc::as_ptr(&self.func) as *const ()),
        }
    }
}

/// Props passed to a component render, keyed by prop name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props(BTreeMap<String, PropValue>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Merge `other` into this set; later values win.
    pub fn extend(&mut self, other: Props) {
        self.0.extend(other.0);
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn callback(&self, name: &str) -> Option<&Callback> {
        self.get(name).and_then(PropValue::as_callback)
    }

    pub fn slot(&self, name: &str) -> Option<&SlotProxy> {
        self.get(name).and_then(PropValue::as_slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The data props as a JSON object, skipping callbacks and slots.
    pub fn data(&self) -> serde_json::Map<String, Value> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_data().map(|d| (k.clone(), d.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn callback_identity_survives_clone() {
        let a = Callback::new(|_| {});
        let b = a.clone();
        let c = Callback::new(|_| {});

        assert_eq!(PropValue::from(a.clone()), PropValue::from(b));
        assert_ne!(PropValue::from(a), PropValue::from(c));
    }

    #[test]
    fn non_finite_numbers_become_null() {
        assert!(PropValue::from(f64::NAN).is_null());
        assert_eq!(PropValue::from(1.5).as_f64(), Some(1.5));
    }

    #[test]
    fn data_skips_callbacks() {
        let mut props = Props::new();
        props.insert("title", "Hello");
        props.insert("count", 3i64);
        props.insert("onSelect", Callback::new(|_| {}));

        let data = props.data();
        assert_eq!(data.len(), 2);
        assert_eq!(data.get("title"), Some(&json!("Hello")));
        assert!(props.callback("onSelect").is_some());
    }
}
