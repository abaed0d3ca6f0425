//! Public method forwarding.
//!
//! Exposed methods always resolve the component instance at call time through
//! a cell shared with the host, so a [`ForwardedMethod`] obtained before a
//! re-render keeps working against whichever instance is current.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::MethodError;
use crate::framework::Instance;
use crate::value::PropValue;

/// Declaration of one exposed method.
#[derive(Debug, Clone)]
pub struct MethodOption {
    /// Method name on the component instance
    pub target: String,
}

impl MethodOption {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
        }
    }
}

type TargetCell = Rc<RefCell<Option<Instance>>>;

/// Per-instance forwarding table.
#[derive(Default)]
pub struct MethodForwarder {
    methods: BTreeMap<String, String>,
    target: TargetCell,
}

impl std::fmt::Debug for MethodForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodForwarder")
            .field("methods", &self.methods)
            .field("bound", &self.target.borrow().is_some())
            .finish()
    }
}

impl MethodForwarder {
    /// Build the forwarding table with no target bound yet.
    pub fn new(options: &BTreeMap<String, MethodOption>) -> Self {
        Self {
            methods: options
                .iter()
                .map(|(name, option)| (name.clone(), option.target.clone()))
                .collect(),
            target: Rc::default(),
        }
    }

    /// Point every forwarding method at `target`.
    pub fn bind(&self, target: Option<Instance>) {
        *self.target.borrow_mut() = target;
    }

    pub fn is_bound(&self) -> bool {
        self.target.borrow().is_some()
    }

    pub fn is_exposed(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Exposed method names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Handle to an exposed method.
    pub fn method(&self, name: &str) -> Option<ForwardedMethod> {
        let target_name = self.methods.get(name)?;
        Some(ForwardedMethod {
            name: name.to_string(),
            target_name: target_name.clone(),
            target: self.target.clone(),
        })
    }

    /// Call an exposed method.
    pub fn call(&self, name: &str, args: &[PropValue]) -> Result<Option<PropValue>, MethodError> {
        self.method(name)
            .ok_or_else(|| MethodError::NotExposed(name.to_string()))?
            .call(args)
    }
}

/// A forwarding method bound to a host, not to a particular instance.
#[derive(Clone)]
pub struct ForwardedMethod {
    name: String,
    target_name: String,
    target: TargetCell,
}

impl std::fmt::Debug for ForwardedMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardedMethod")
            .field("name", &self.name)
            .field("target_name", &self.target_name)
            .finish()
    }
}

impl ForwardedMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call through to the current instance.
    ///
    /// Before the component has rendered this is a no-op returning `Ok(None)`;
    /// debug builds log a warning. A call made while the instance is already
    /// running (for example from a listener its own method triggered) fails
    /// with [`MethodError::Busy`].
    pub fn call(&self, args: &[PropValue]) -> Result<Option<PropValue>, MethodError> {
        let instance = self.target.borrow().clone();
        let Some(instance) = instance else {
            if cfg!(debug_assertions) {
                tracing::warn!(
                    "You can't call method '{}' if component not in DOM.",
                    self.name
                );
            }
            return Ok(None);
        };

        let Ok(mut component) = instance.try_borrow_mut() else {
            tracing::warn!("Method '{}' called while the component is busy", self.name);
            return Err(MethodError::Busy(self.name.clone()));
        };
        let result = component.call(&self.target_name, args);
        drop(component);

        match result {
            Some(value) => Ok(Some(value)),
            None => Err(MethodError::UnknownTarget {
                method: self.name.clone(),
                target: self.target_name.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Dom, NodeId};
    use crate::framework::Component;
    use crate::value::Props;

    struct Counter {
        count: i64,
    }

    impl Component for Counter {
        fn render(&mut self, _props: &Props, dom: &Dom) -> Result<NodeId, crate::error::RenderError> {
            Ok(dom.create_element("div"))
        }

        fn call(&mut self, method: &str, args: &[PropValue]) -> Option<PropValue> {
            match method {
                "add" => {
                    self.count += args.iter().filter_map(|a| a.as_f64()).sum::<f64>() as i64;
                    Some(PropValue::from(self.count))
                }
                _ => None,
            }
        }
    }

    fn instance(count: i64) -> Instance {
        Rc::new(RefCell::new(Counter { count }))
    }

    fn forwarder() -> MethodForwarder {
        MethodForwarder::new(&BTreeMap::from([
            ("increment".to_string(), MethodOption::new("add")),
            ("broken".to_string(), MethodOption::new("missing")),
        ]))
    }

    #[test]
    fn unbound_call_returns_none() {
        let methods = forwarder();
        assert_eq!(methods.call("increment", &[PropValue::from(1i64)]), Ok(None));
    }

    #[test]
    fn call_into_a_running_instance_is_refused() {
        let methods = forwarder();
        let target = instance(1);
        methods.bind(Some(target.clone()));

        let _running = target.borrow_mut();

        assert_eq!(
            methods.call("increment", &[PropValue::from(1i64)]),
            Err(MethodError::Busy("increment".to_string()))
        );
    }

    #[test]
    fn bound_call_delegates_to_instance() {
        let methods = forwarder();
        methods.bind(Some(instance(10)));

        assert_eq!(
            methods.call("increment", &[PropValue::from(5i64)]),
            Ok(Some(PropValue::from(15i64)))
        );
    }

    #[test]
    fn handles_follow_rebinding() {
        let methods = forwarder();
        let handle = methods.method("increment").unwrap();

        methods.bind(Some(instance(0)));
        assert_eq!(handle.call(&[PropValue::from(1i64)]), Ok(Some(PropValue::from(1i64))));

        methods.bind(Some(instance(100)));
        assert_eq!(handle.call(&[PropValue::from(1i64)]), Ok(Some(PropValue::from(101i64))));
    }

    #[test]
    fn reports_unexposed_and_unknown_targets() {
        let methods = forwarder();
        methods.bind(Some(instance(0)));

        assert_eq!(
            methods.call("nope", &[]),
            Err(MethodError::NotExposed("nope".to_string()))
        );
        assert!(matches!(
            methods.call("broken", &[]),
            Err(MethodError::UnknownTarget { .. })
        ));
    }
}
