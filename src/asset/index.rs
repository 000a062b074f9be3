//! Index document rendering.
//!
//! The HTML template references assets by their default, unhashed paths
//! (`dist/index.js`). At startup every default path whose entry point has
//! a hashed output is rewritten to that output; the result is kept in
//! memory for the life of the server.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::bytes::{NoExpand, Regex};

use super::metafile::EntryPointMap;
use crate::utils::hash;

/// Entry point → path the template uses when no hashed variant exists.
pub const DEFAULT_DIST_PATHS: &[(&str, &str)] = &[
    ("src/index.css", "dist/index.css"),
    ("src/index.js", "dist/index.js"),
];

/// Replace default paths in `template` with their hashed outputs.
///
/// Matching is literal and byte-wise. Associations without a (non-empty)
/// mapping leave the template untouched. A default path that cannot be
/// compiled into a matcher fails the whole render.
pub fn render(
    template: &[u8],
    map: &EntryPointMap,
    associations: &[(&str, &str)],
) -> Result<Vec<u8>, regex::Error> {
    let mut out = template.to_vec();
    for &(entry_point, default_path) in associations {
        let Some(hashed) = map.get(entry_point).filter(|h| !h.is_empty()) else {
            continue;
        };
        if default_path.is_empty() {
            continue;
        }
        let pattern = Regex::new(&regex::escape(default_path))?;
        out = pattern
            .replace_all(&out, NoExpand(hashed.as_bytes()))
            .into_owned();
    }
    Ok(out)
}

/// Rendered index plus its entity tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDocument {
    pub bytes: Vec<u8>,
    pub etag: String,
}

impl IndexDocument {
    pub fn new(bytes: Vec<u8>) -> Self {
        let etag = hash::etag(&bytes);
        Self { bytes, etag }
    }

    /// Render the template at `template_path` against `map`.
    pub fn generate(template_path: &Path, map: &EntryPointMap) -> Result<Self> {
        let template = fs::read(template_path)
            .with_context(|| format!("cannot read index template `{}`", template_path.display()))?;
        let rendered = render(&template, map, DEFAULT_DIST_PATHS)
            .with_context(|| format!("cannot render `{}`", template_path.display()))?;
        Ok(Self::new(rendered))
    }
}
