//! Build metadata and the entry-point map.
//!
//! The bundler describes every output it wrote:
//!
//! ```json
//! {"outputs": {"dist/index-ab12cd34.js": {"entryPoint": "src/index.js"}}}
//! ```
//!
//! Inverting that gives the entry-point map (`src/index.js` →
//! `dist/index-ab12cd34.js`), which is persisted next to the build output
//! and loaded once by the server.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the persisted map inside the output directory.
pub const ENTRY_POINT_MAP_FILE: &str = "entry-point-map.json";

#[derive(Debug, Error)]
pub enum MapError {
    #[error("cannot parse build metadata")]
    Metadata(#[source] serde_json::Error),

    #[error("entry point `{entry_point}` produced both `{first}` and `{second}`")]
    DuplicateEntryPoint {
        entry_point: String,
        first: String,
        second: String,
    },

    #[error("cannot read `{0}`")]
    Read(PathBuf, #[source] io::Error),

    #[error("cannot parse `{0}`")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("cannot write `{0}`")]
    Write(PathBuf, #[source] io::Error),
}

/// Subset of the bundler's build metadata needed to map entry points.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, OutputMeta>,
}

/// One output artifact in the build metadata.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputMeta {
    /// Entry point this artifact is the canonical output of, if any.
    #[serde(
        rename = "entryPoint",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub entry_point: String,
}

impl BuildMetadata {
    /// Parse metadata JSON. Unknown fields are ignored.
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        serde_json::from_str(json).map_err(MapError::Metadata)
    }

    pub fn to_json(&self) -> String {
        // A map of plain strings cannot fail to serialize
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Record an output, optionally tied to an entry point.
    pub fn add_output(&mut self, output: impl Into<String>, entry_point: Option<&str>) {
        self.outputs.insert(
            output.into(),
            OutputMeta {
                entry_point: entry_point.unwrap_or_default().to_string(),
            },
        );
    }
}

/// Entry point → hashed output path.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryPointMap(BTreeMap<String, String>);

impl EntryPointMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invert build metadata.
    ///
    /// Outputs without an entry point (chunks, copied assets) are skipped.
    /// Two outputs claiming the same entry point are rejected.
    pub fn from_metadata(metadata: &BuildMetadata) -> Result<Self, MapError> {
        let mut map = Self::new();
        for (output, meta) in &metadata.outputs {
            if meta.entry_point.is_empty() {
                continue;
            }
            if let Some(first) = map.insert(meta.entry_point.clone(), output.clone()) {
                return Err(MapError::DuplicateEntryPoint {
                    entry_point: meta.entry_point.clone(),
                    first,
                    second: output.clone(),
                });
            }
        }
        Ok(map)
    }

    /// Hashed path for `entry_point`, if one was produced.
    pub fn get(&self, entry_point: &str) -> Option<&str> {
        self.0.get(entry_point).map(String::as_str)
    }

    /// Map `entry_point` to `output`, returning the output it replaced.
    pub fn insert(
        &mut self,
        entry_point: impl Into<String>,
        output: impl Into<String>,
    ) -> Option<String> {
        self.0.insert(entry_point.into(), output.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Persist as compact JSON.
    pub fn save(&self, path: &Path) -> Result<(), MapError> {
        fs::write(path, self.to_json()).map_err(|e| MapError::Write(path.to_path_buf(), e))
    }

    /// Load a previously persisted map.
    pub fn load(path: &Path) -> Result<Self, MapError> {
        let content =
            fs::read_to_string(path).map_err(|e| MapError::Read(path.to_path_buf(), e))?;
        Self::from_json(&content).map_err(|e| MapError::Parse(path.to_path_buf(), e))
    }
}
