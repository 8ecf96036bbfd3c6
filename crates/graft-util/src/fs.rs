use std::path::{Path, PathBuf};

use crate::errors::GraftError;

/// Walk up from `start` looking for a file named `filename`.
/// Returns the path to the directory containing the file, or `None`.
pub fn find_ancestor_with(start: &Path, filename: &str) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(filename);
        if candidate.is_file() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Read a whole file, mapping failures to an error that names the path.
pub fn read_text(path: &Path) -> Result<String, GraftError> {
    std::fs::read_to_string(path).map_err(|e| GraftError::Generic {
        message: format!("Failed to read {}: {e}", path.display()),
    })
}

/// Collect every `*.toml` file directly inside `dir`, sorted by path.
pub fn toml_files(dir: &Path) -> Result<Vec<PathBuf>, GraftError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    files.sort();
    tracing::trace!("found {} recipe files in {}", files.len(), dir.display());
    Ok(files)
}
