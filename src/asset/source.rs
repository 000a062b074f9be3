//! Where the server reads build artifacts from.
//!
//! Lookups take a logical, `/`-separated path relative to the project root
//! (`dist/index-ab12cd34.js`). [`MemorySource`] snapshots the output
//! directory once at startup so a running server is unaffected by later
//! builds; [`DiskSource`] reads through to the filesystem on every request.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jwalk::WalkDir;
use rustc_hash::FxHashMap;

use crate::utils::path::{fs::to_slash_relative, url::resolve_under};

/// A readable, seekable asset body.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// An opened asset.
pub enum AssetFile {
    /// Supports seeking; can be served with ranges and a known length.
    Seekable(Box<dyn ReadSeek>),
    /// Forward-only stream.
    Stream(Box<dyn Read + Send>),
}

impl std::fmt::Debug for AssetFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seekable(_) => f.write_str("AssetFile::Seekable"),
            Self::Stream(_) => f.write_str("AssetFile::Stream"),
        }
    }
}

/// Read-only asset storage.
pub trait AssetSource: Send + Sync {
    /// Open the asset at `logical`. Missing assets are `NotFound`.
    fn open(&self, logical: &str) -> io::Result<AssetFile>;
}

fn not_found(logical: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("open {logical}: file does not exist"),
    )
}

/// Filesystem-backed source rooted at the project directory.
#[derive(Debug, Clone)]
pub struct DiskSource {
    root: PathBuf,
}

impl DiskSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DiskSource {
    fn open(&self, logical: &str) -> io::Result<AssetFile> {
        let path = resolve_under(&self.root, logical).ok_or_else(|| not_found(logical))?;
        let file = File::open(path)?;
        Ok(AssetFile::Seekable(Box::new(file)))
    }
}

/// In-memory snapshot of a directory tree.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    files: FxHashMap<String, Arc<[u8]>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every regular file under `dir`, keyed relative to `root`.
    ///
    /// `dir` is usually `<root>/dist`, giving keys like `dist/index.js`.
    pub fn from_dir(root: &Path, dir: &Path) -> io::Result<Self> {
        let mut source = Self::new();
        for entry in WalkDir::new(dir).skip_hidden(false) {
            let entry = entry.map_err(io::Error::other)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let bytes = fs::read(&path)?;
            source.insert(to_slash_relative(&path, root), bytes);
        }
        Ok(source)
    }

    pub fn insert(&mut self, logical: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.files.insert(logical.into(), bytes.into());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Total size of all stored files in bytes.
    pub fn total_bytes(&self) -> usize {
        self.files.values().map(|b| b.len()).sum()
    }
}

/// Cheap shared view over stored bytes.
struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AssetSource for MemorySource {
    fn open(&self, logical: &str) -> io::Result<AssetFile> {
        let bytes = self.files.get(logical).ok_or_else(|| not_found(logical))?;
        let cursor = Cursor::new(SharedBytes(Arc::clone(bytes)));
        Ok(AssetFile::Seekable(Box::new(cursor)))
    }
}
