//! Shared fixtures for unit tests
mod mock_registry;

pub use mock_registry::*;

use std::path::Path;

/// Writes `content` to `dir/name` and returns the path
pub fn write_file(
    dir: &Path,
    name: &str,
    content: &str,
) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
