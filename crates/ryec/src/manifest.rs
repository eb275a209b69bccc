//! Project manifest (`rye.toml`) parsing.
//!
//! The manifest supplies defaults for CLI flags; explicit flags always win.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Name of the manifest file looked up next to the source file.
pub const MANIFEST_FILE: &str = "rye.toml";

/// The parsed `rye.toml` manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub package: PackageSection,
    #[serde(default)]
    pub build: BuildSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageSection {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildSection {
    /// Default for the constant-folding optimization flag.
    pub constant_folding: Option<bool>,
}

/// Load the manifest from `dir`, if one exists.
pub fn load(dir: &Path) -> anyhow::Result<Option<Manifest>> {
    let path = dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;
    let manifest: Manifest = toml::from_str(&text)
        .with_context(|| format!("failed to parse `{}`", path.display()))?;
    Ok(Some(manifest))
}
