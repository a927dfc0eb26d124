//! Profile source discovery

use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// List every `*.profile` file directly under `root`, sorted by path so
/// batch processing order (and therefore duplicate-id precedence) is
/// reproducible across filesystems.
pub fn discover_profiles(root: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let mut found = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "profile") {
            found.push(path);
        }
    }
    found.sort();
    debug!(root = %root.display(), count = found.len(), "discovered profile sources");
    Ok(found)
}
