//! Render command.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::{load_document, load_registry};

/// Render `input` and return the serialized document.
pub fn render(manifest: &Path, input: &Path) -> Result<String> {
    let registry = load_registry(manifest)?;
    let (dom, hosts) = load_document(&registry, input)?;
    tracing::info!("Rendered {} elements", hosts.len());

    Ok(dom.inner_html(dom.document()))
}

/// Run the render command.
pub fn run(manifest: &Path, input: &Path, output: Option<&Path>) -> Result<()> {
    let html = render(manifest, input)?;

    match output {
        Some(path) => {
            fs::write(path, &html).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{html}"),
    }

    Ok(())
}
