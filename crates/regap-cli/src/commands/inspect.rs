//! Inspect command.

use std::path::Path;

use anyhow::Result;
use regap::{Dom, HostElement, PropValue};
use serde_json::{json, Map, Value};

use super::{load_document, load_registry};

/// Describe every upgraded element in `input`.
pub fn inspect(manifest: &Path, input: &Path) -> Result<Value> {
    let registry = load_registry(manifest)?;
    let (dom, hosts) = load_document(&registry, input)?;

    Ok(Value::Array(
        hosts.iter().map(|host| describe(&dom, host)).collect(),
    ))
}

/// Run the inspect command.
pub fn run(manifest: &Path, input: &Path) -> Result<()> {
    let report = inspect(manifest, input)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn describe(dom: &Dom, host: &HostElement) -> Value {
    let attrs: Map<String, Value> = host
        .attributes()
        .into_iter()
        .filter_map(|(name, value)| Some((name, value.as_ref().map(to_json)?)))
        .collect();

    let slots: Map<String, Value> = host
        .slot_assignments()
        .filter(|(_, nodes)| !nodes.is_empty())
        .map(|(name, nodes)| {
            let html = nodes.iter().map(|&node| Value::from(dom.outer_html(node)));
            (name.to_string(), Value::Array(html.collect()))
        })
        .collect();

    json!({
        "tag": host.tag(),
        "state": format!("{:?}", host.state()).to_lowercase(),
        "attrs": attrs,
        "slots": slots,
    })
}

fn to_json(value: &PropValue) -> Value {
    match value {
        PropValue::Data(data) => data.clone(),
        PropValue::Callback(callback) => Value::from(callback.name().unwrap_or("<callback>")),
        PropValue::Slot(proxy) => Value::from(format!("<slot {}>", proxy.prop())),
    }
}
