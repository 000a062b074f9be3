//! Request path decoding and resolution.

use std::path::{Path, PathBuf};

/// Normalize a request target: strip the query string, percent-decode,
/// and drop the leading `/`.
///
/// `"/dist/index-ab12cd34.js?v=1"` → `"dist/index-ab12cd34.js"`.
/// Invalid UTF-8 after decoding yields `None`.
pub fn logical_path(url: &str) -> Option<String> {
    use percent_encoding::percent_decode_str;

    let path = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    Some(decoded.trim_start_matches('/').to_string())
}

/// Check that a logical path cannot escape its root.
///
/// Rejects empty segments, `.` and `..`, and backslashes.
pub fn is_safe(logical: &str) -> bool {
    !logical.is_empty()
        && !logical.contains('\\')
        && logical
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

/// Resolve a logical path to a regular file under `root`.
///
/// Canonicalizes both sides so symlinks cannot point outside `root`.
pub fn resolve_under(root: &Path, logical: &str) -> Option<PathBuf> {
    if !is_safe(logical) {
        return None;
    }

    let canonical = root.join(logical).canonicalize().ok()?;
    let root_canonical = root.canonicalize().ok()?;

    (canonical.starts_with(&root_canonical) && canonical.is_file()).then_some(canonical)
}
