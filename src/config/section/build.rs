//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! entry_points = ["src/index.js", "src/index.css"]   # Relative to project root
//! output = "dist"                                    # Cleaned on every build
//! placeholder = "placeholder"                        # Survives cleaning
//! minify = true                                      # Minify JS and CSS
//! ```

use crate::config::ConfigDiagnostics;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Build settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Files handed to the bundler, `/`-separated and relative to the root.
    pub entry_points: Vec<String>,

    /// Output directory. Absolute after loading.
    pub output: PathBuf,

    /// Entry of `output` that cleaning leaves in place.
    pub placeholder: String,

    /// Minify JS and CSS outputs.
    pub minify: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            entry_points: vec!["src/index.js".into(), "src/index.css".into()],
            output: "dist".into(),
            placeholder: "placeholder".into(),
            minify: true,
        }
    }
}

impl BuildConfig {
    /// Check raw (not yet normalized) values.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.entry_points.is_empty() {
            diag.error_with_hint(
                "build.entry_points",
                "no entry points configured",
                "add at least one file, e.g. `entry_points = [\"src/index.js\"]`",
            );
        }
        for entry in &self.entry_points {
            if entry.is_empty() || Path::new(entry).is_absolute() || entry.starts_with('/') {
                diag.error(
                    "build.entry_points",
                    format!("entry point `{entry}` must be a path relative to the project root"),
                );
            }
        }
        if self.output.is_absolute() {
            diag.error_with_hint(
                "build.output",
                format!("`{}` must be relative to the project root", self.output.display()),
                "use `output = \"dist\"`",
            );
        }
    }
}
