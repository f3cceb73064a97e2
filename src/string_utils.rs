//! String helpers for canonical relative paths.
//!
//! Every comparison in the matcher and the comparison engine happens on
//! `/`-separated, root-relative strings produced here, whatever the host OS.

use std::path::Path;

/// Normalize a relative path string to the canonical `/`-separated form.
///
/// Backslashes become `/`, a leading `./` is removed, repeated separators
/// collapse and a trailing separator is dropped.
///
/// # Example
///
/// ```
/// use canopy::string_utils::normalize_path;
///
/// assert_eq!(normalize_path("src\\lib.rs"), "src/lib.rs");
/// assert_eq!(normalize_path("./docs//guide/"), "docs/guide");
/// ```
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Canonical relative path of `path` below `root`, or `None` if it is not below it.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(normalize_path(&rel.to_string_lossy()))
}

/// Append a child name to a canonical relative path.
pub fn join_relative(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Basename of a canonical relative path.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Whether a rule value should be treated as a glob rather than a literal name.
pub fn has_glob_metachars(s: &str) -> bool {
    s.contains(['*', '?', '['])
}
