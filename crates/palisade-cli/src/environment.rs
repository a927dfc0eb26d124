//! Build environment: substitution context and profile-root discovery
//!
//! The build supplies two YAML documents — a build configuration and a
//! product description — whose scalar top-level keys become the
//! substitution context for placeholder expansion, product keys winning
//! on overlap. The product document also anchors profile discovery: its
//! `profiles_root` key names the profile directory relative to the
//! product file.

use crate::error::{CliError, CliResult};
use palisade_types::SubstitutionContext;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Substitution context plus the discovery anchor.
#[derive(Debug)]
pub struct BuildEnvironment {
    pub context: SubstitutionContext,
    product_dir: PathBuf,
}

impl BuildEnvironment {
    /// Load and merge both environment documents. Both must be given:
    /// discovery cannot work from half an environment.
    pub fn load(build_config: &Path, product: &Path) -> CliResult<Self> {
        let base = scalar_map(build_config)?;
        let overlay = scalar_map(product)?;
        let context = SubstitutionContext::new(base)
            .overlaid_with(SubstitutionContext::new(overlay));
        let product_dir = product
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        debug!(product_dir = %product_dir.display(), "loaded build environment");
        Ok(Self {
            context,
            product_dir,
        })
    }

    /// Directory to discover `*.profile` sources in: the product's
    /// `profiles_root`, relative to the product document.
    pub fn profiles_root(&self) -> CliResult<PathBuf> {
        let root = self.context.get("profiles_root").ok_or_else(|| {
            CliError::Environment("`profiles_root` missing from build environment".into())
        })?;
        Ok(self.product_dir.join(root))
    }
}

/// Top-level scalar keys of a YAML document, stringified. Nested values
/// are skipped: the substitution context is a flat lookup.
fn scalar_map(path: &Path) -> CliResult<BTreeMap<String, String>> {
    let text = std::fs::read_to_string(path)?;
    let doc: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(&text)?;
    let mut flat = BTreeMap::new();
    for (key, value) in doc {
        let rendered = match value {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        flat.insert(key, rendered);
    }
    Ok(flat)
}
