//! Output directory management: cleaning and precompression.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use thiserror::Error;

use super::compress::{CompressError, precompress_file};
use crate::logger::ProgressLine;
use crate::utils::group::ErrorGroup;

/// Extensions that get `.gz` and `.br` siblings.
pub const COMPRESSIBLE_EXTENSIONS: &[&str] = &["js", "css", "wasm"];

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("cannot list `{0}`")]
    List(PathBuf, #[source] io::Error),

    #[error("cannot remove `{0}`")]
    Remove(PathBuf, #[source] io::Error),
}

#[derive(Debug, Error)]
pub enum PrecompressError {
    #[error("cannot walk output directory")]
    Walk(#[source] jwalk::Error),

    #[error("{failed} of {total} files failed to compress")]
    Compress {
        failed: usize,
        total: usize,
        #[source]
        source: CompressError,
    },
}

/// Remove every entry of `dir` except `placeholder`.
///
/// Subdirectories go recursively. A missing `dir` is created. Returns the
/// number of top-level entries removed; the first failure aborts and
/// whatever was already removed stays removed.
pub fn clean(dir: &Path, placeholder: &str) -> Result<usize, CleanError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|e| CleanError::List(dir.to_path_buf(), e))?;
            return Ok(0);
        }
        Err(e) => return Err(CleanError::List(dir.to_path_buf(), e)),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| CleanError::List(dir.to_path_buf(), e))?;
        if entry.file_name() == placeholder {
            continue;
        }
        let path = entry.path();
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        let result = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| CleanError::Remove(path, e))?;
        removed += 1;
    }
    Ok(removed)
}

/// Whether `path` has an extension in [`COMPRESSIBLE_EXTENSIONS`].
pub fn is_compressible(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| COMPRESSIBLE_EXTENSIONS.contains(&ext))
}

/// Regular files under `root` that need precompression, sorted.
///
/// Hidden files are included. Any traversal error aborts.
pub fn compressible_files(root: &Path) -> Result<Vec<PathBuf>, PrecompressError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).skip_hidden(false).sort(true) {
        let entry = entry.map_err(PrecompressError::Walk)?;
        if entry.file_type().is_file() && is_compressible(&entry.path()) {
            files.push(entry.path());
        }
    }
    Ok(files)
}

/// Compress `files` concurrently.
///
/// Every job runs to completion even after a failure; the first error is
/// reported along with the failure count.
pub fn precompress_files(files: &[PathBuf], progress: &ProgressLine) -> Result<(), PrecompressError> {
    let group = ErrorGroup::new();

    rayon::scope(|s| {
        for path in files {
            let group = &group;
            s.spawn(move |_| {
                let result = precompress_file(path);
                if result.is_ok() {
                    progress.inc("files");
                }
                group.record(result);
            });
        }
    });

    group
        .into_result()
        .map_err(|(source, failed)| PrecompressError::Compress {
            failed,
            total: files.len(),
            source,
        })
}

/// Write `.gz` and `.br` siblings for every compressible file under `root`.
///
/// Returns the number of files compressed.
pub fn precompress_dist(root: &Path) -> Result<usize, PrecompressError> {
    let files = compressible_files(root)?;
    let progress = ProgressLine::new("compress", &[("files", files.len())]);
    precompress_files(&files, &progress)?;
    progress.finish();
    Ok(files.len())
}
