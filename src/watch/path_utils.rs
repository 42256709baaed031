// src/watch/path_utils.rs

//! Path canonicalisation shared by the graph, the watcher and the logs.
//!
//! Every path that is used as a map key goes through [`normalize`] first, so
//! `C:\src\a.js` and `C:/src/a.js` end up as the same key.

use std::path::Path;

/// Marker bundlers put into the ids of generated in-memory modules.
pub const VIRTUAL_MODULE_SENTINEL: char = '\u{0}';

/// Rewrite all path separators to forward slashes.
pub fn normalize(path: impl AsRef<str>) -> String {
    path.as_ref().replace('\\', "/")
}

/// Normalize a filesystem path (lossy for non UTF-8 names).
pub fn normalize_path(path: &Path) -> String {
    normalize(path.to_string_lossy())
}

/// Virtual modules have no file behind them and can never be watched.
pub fn is_virtual(path: impl AsRef<str>) -> bool {
    path.as_ref().contains(VIRTUAL_MODULE_SENTINEL)
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct prefix strip on the normalized strings.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(normalize_path(rel));
    }

    // Different absolute prefixes can name the same directory (notably
    // /private/var on macOS).
    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(normalize_path(rel));
        }
    }

    None
}

/// Path used in log lines: relative to `root` when possible, otherwise the
/// normalized path as given.
pub fn display_relative(root: &Path, path: &str) -> String {
    relative_str(root, Path::new(path)).unwrap_or_else(|| normalize(path))
}

/// Join several display paths for a single log line.
pub fn display_relative_list(root: &Path, paths: &[String]) -> String {
    paths
        .iter()
        .map(|p| display_relative(root, p))
        .collect::<Vec<_>>()
        .join(", ")
}
