pub mod inspect;
pub mod render;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regap::{parse_fragment, Bindings, Dom, HostElement, Manifest, Registry};

/// Build a registry from a manifest file or directory.
pub fn load_registry(manifest: &Path) -> Result<Registry> {
    let loaded = if manifest.is_dir() {
        Manifest::scan(manifest)
    } else {
        Manifest::load(manifest)
    };
    let manifest_data =
        loaded.with_context(|| format!("Failed to load manifest {}", manifest.display()))?;

    let mut registry = Registry::new();
    let count = manifest_data
        .register_into(&mut registry, &Bindings::new())
        .context("Failed to register elements")?;
    tracing::info!("Registered {} elements", count);

    Ok(registry)
}

/// Parse a markup file into a fresh document and upgrade its elements.
pub fn load_document(registry: &Registry, input: &Path) -> Result<(Dom, Vec<HostElement>)> {
    let markup = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let dom = Dom::new();
    parse_fragment(&dom, dom.document(), &markup)
        .with_context(|| format!("Failed to parse {}", input.display()))?;
    let hosts = registry
        .upgrade(&dom, dom.document())
        .context("Failed to render elements")?;

    Ok((dom, hosts))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    pub const MANIFEST: &str = r#"
[[element]]
tag = "x-badge"
component = "Badge"

[element.attrs.count]
type = "number"

[element.attrs.urgent]
type = "boolean"

[element.slots.icon]

[[component]]
name = "Badge"
template = '<span class="badge">{{ count }}<regap-outlet prop="icon"></regap-outlet><regap-outlet></regap-outlet></span>'
"#;

    /// Write the manifest and `markup` into a temp dir.
    pub fn project(markup: &str) -> (TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("regap.toml");
        let input = dir.path().join("page.html");
        fs::write(&manifest, MANIFEST).unwrap();
        fs::write(&input, markup).unwrap();
        (dir, manifest, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_manifest_directories() {
        let (dir, _, _) = fixtures::project("");

        let registry = load_registry(dir.path()).unwrap();

        assert!(registry.is_defined("x-badge"));
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = load_registry(&dir.path().join("nope.toml")).unwrap_err();

        assert!(err.to_string().starts_with("Failed to load manifest"));
    }
}
