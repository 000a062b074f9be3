//! Entry-point bundling.
//!
//! The build consumes a bundler through the [`Bundler`] trait: hand it a
//! set of entry points, get back hashed output files plus build metadata
//! describing which output belongs to which entry point. The metadata is
//! the only contract the rest of the pipeline relies on.
//!
//! [`MinifyBundler`] is the bundled implementation: it minifies each entry
//! point on its own (no import graph) and names outputs
//! `<outdir>/<dir>/<name>-<hash>.<ext>`, where `<dir>` is the entry's
//! directory relative to the common ancestor of all entry points.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;

use super::metafile::BuildMetadata;
use super::minify::{Minified, minify_css, minify_js};
use crate::utils::{hash, path::fs::to_slash_relative};

/// A diagnostic attached to one entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {text}")]
pub struct BundleMessage {
    pub path: String,
    pub text: String,
}

impl BundleMessage {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Inputs for one bundler run.
#[derive(Debug, Clone)]
pub struct BundleOptions<'a> {
    /// Project root. Entry points and metadata paths are relative to it.
    pub root: &'a Path,
    /// Entry points relative to `root`, `/`-separated.
    pub entry_points: &'a [String],
    /// Absolute output directory.
    pub outdir: &'a Path,
    /// Minify JS and CSS (otherwise copied verbatim, still hashed).
    pub minify: bool,
}

/// Outcome of a bundler run.
#[derive(Debug, Default)]
pub struct BundleResult {
    pub errors: Vec<BundleMessage>,
    pub warnings: Vec<BundleMessage>,
    /// Build metadata JSON: `{"outputs": {"<path>": {"entryPoint": "<path>"}}}`.
    pub metafile: String,
}

/// Something that turns entry points into hashed build outputs.
pub trait Bundler {
    fn build(&self, options: &BundleOptions<'_>) -> BundleResult;
}

/// Per-file minifier that writes content-hashed outputs.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinifyBundler;

/// Result of processing a single entry point.
struct EntryOutput {
    entry: String,
    output: Option<PathBuf>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Bundler for MinifyBundler {
    fn build(&self, options: &BundleOptions<'_>) -> BundleResult {
        let outbase = common_dir(options.entry_points);

        let outputs: Vec<EntryOutput> = options
            .entry_points
            .par_iter()
            .map(|entry| build_entry(options, &outbase, entry))
            .collect();

        let mut result = BundleResult::default();
        let mut metadata = BuildMetadata::default();
        for out in outputs {
            let EntryOutput {
                entry,
                output,
                errors,
                warnings,
            } = out;
            result
                .errors
                .extend(errors.into_iter().map(|e| BundleMessage::new(&entry, e)));
            result
                .warnings
                .extend(warnings.into_iter().map(|w| BundleMessage::new(&entry, w)));
            if let Some(path) = output {
                metadata.add_output(to_slash_relative(&path, options.root), Some(&entry));
            }
        }

        result.metafile = metadata.to_json();
        result
    }
}

fn build_entry(options: &BundleOptions<'_>, outbase: &Path, entry: &str) -> EntryOutput {
    let mut out = EntryOutput {
        entry: entry.to_string(),
        output: None,
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    let source_path = options.root.join(entry);
    let bytes = match fs::read(&source_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            out.errors.push(format!("cannot read entry point: {e}"));
            return out;
        }
    };

    let ext = Path::new(entry)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let code = match transform(&ext, entry, bytes, options.minify) {
        Ok(Minified { code, warnings }) => {
            out.warnings = warnings;
            code
        }
        Err(errors) => {
            out.errors = errors;
            return out;
        }
    };
    if code.is_empty() {
        out.warnings.push("entry point produced empty output".to_string());
    }

    let target = output_path(options.outdir, outbase, entry, &ext, &hash::fingerprint(&code));
    let written = target
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| fs::write(&target, &code));
    match written {
        Ok(()) => out.output = Some(target),
        Err(e) => out.errors.push(format!("cannot write `{}`: {e}", target.display())),
    }
    out
}

/// Apply the loader for `ext`. WASM is copied byte for byte; unknown
/// extensions have no loader and fail.
fn transform(
    ext: &str,
    entry: &str,
    bytes: Vec<u8>,
    minify: bool,
) -> Result<Minified<Vec<u8>>, Vec<String>> {
    let text = |bytes: Vec<u8>| {
        String::from_utf8(bytes).map_err(|_| vec!["entry point is not valid UTF-8".to_string()])
    };

    let minified = match ext {
        "wasm" => return Ok(Minified::verbatim(bytes)),
        "js" | "mjs" | "css" if !minify => return Ok(Minified::verbatim(bytes)),
        "js" | "mjs" => minify_js(&text(bytes)?)?,
        "css" => minify_css(entry, &text(bytes)?)?,
        _ => return Err(vec![format!("no loader is configured for \".{ext}\" files")]),
    };
    Ok(minified.into_bytes())
}

/// `<outdir>/<entry dir relative to outbase>/<stem>-<hash>.<ext>`
fn output_path(outdir: &Path, outbase: &Path, entry: &str, ext: &str, hash: &str) -> PathBuf {
    let entry = Path::new(entry);
    let stem = entry
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let rel_dir = entry
        .parent()
        .and_then(|p| p.strip_prefix(outbase).ok())
        .unwrap_or_else(|| Path::new(""));

    let name = if ext.is_empty() {
        format!("{stem}-{hash}")
    } else {
        format!("{stem}-{hash}.{ext}")
    };
    outdir.join(rel_dir).join(name)
}

/// Lowest common ancestor directory of all entry points.
fn common_dir(entry_points: &[String]) -> PathBuf {
    let mut dirs = entry_points
        .iter()
        .map(|e| Path::new(e).parent().unwrap_or_else(|| Path::new("")));

    let Some(first) = dirs.next() else {
        return PathBuf::new();
    };
    let mut common: Vec<_> = first.components().collect();
    for dir in dirs {
        let shared = common
            .iter()
            .zip(dir.components())
            .take_while(|(a, b)| *a == b)
            .count();
        common.truncate(shared);
    }
    common.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::metafile::EntryPointMap;
    use tempfile::TempDir;

    fn entries(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_common_dir() {
        assert_eq!(common_dir(&entries(&["src/index.js", "src/index.css"])), Path::new("src"));
        assert_eq!(
            common_dir(&entries(&["src/index.js", "src/wasm/main.wasm"])),
            Path::new("src")
        );
        assert_eq!(common_dir(&entries(&["src/index.js", "lib/a.js"])), Path::new(""));
        assert_eq!(common_dir(&entries(&["index.js"])), Path::new(""));
        assert_eq!(common_dir(&[]), Path::new(""));
    }

    #[test]
    fn test_output_path() {
        let out = output_path(
            Path::new("/p/dist"),
            Path::new("src"),
            "src/wasm/main.wasm",
            "wasm",
            "ab12cd34",
        );
        assert_eq!(out, Path::new("/p/dist/wasm/main-ab12cd34.wasm"));
    }

    #[test]
    fn test_build_writes_hashed_outputs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/wasm")).unwrap();
        fs::write(root.join("src/index.js"), "export const answer = 40 + 2;\n").unwrap();
        fs::write(root.join("src/index.css"), "body {\n  margin: 0px;\n}\n").unwrap();
        let wasm = [0u8, 97, 115, 109, 1, 0, 0, 0];
        fs::write(root.join("src/wasm/main.wasm"), wasm).unwrap();

        let entry_points = entries(&["src/index.js", "src/index.css", "src/wasm/main.wasm"]);
        let outdir = root.join("dist");
        let result = MinifyBundler.build(&BundleOptions {
            root,
            entry_points: &entry_points,
            outdir: &outdir,
            minify: true,
        });
        assert!(result.errors.is_empty(), "{:?}", result.errors);

        let metadata = BuildMetadata::from_json(&result.metafile).unwrap();
        let map = EntryPointMap::from_metadata(&metadata).unwrap();
        assert_eq!(map.len(), 3);

        let css = map.get("src/index.css").unwrap();
        assert!(css.starts_with("dist/index-") && css.ends_with(".css"), "{css}");
        assert_eq!(fs::read_to_string(root.join(css)).unwrap(), "body{margin:0}");

        let wasm_out = map.get("src/wasm/main.wasm").unwrap();
        assert_eq!(
            wasm_out,
            format!("dist/wasm/main-{}.wasm", hash::fingerprint(&wasm))
        );
        assert_eq!(fs::read(root.join(wasm_out)).unwrap(), wasm);

        let js = map.get("src/index.js").unwrap();
        assert!(js.starts_with("dist/index-") && js.ends_with(".js"), "{js}");
    }

    #[test]
    fn test_build_without_minify_keeps_source() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("src")).unwrap();
        let css = "body {\n  margin: 0px;\n}\n";
        fs::write(root.join("src/index.css"), css).unwrap();

        let entry_points = entries(&["src/index.css"]);
        let outdir = root.join("dist");
        let result = MinifyBundler.build(&BundleOptions {
            root,
            entry_points: &entry_points,
            outdir: &outdir,
            minify: false,
        });

        let metadata = BuildMetadata::from_json(&result.metafile).unwrap();
        let out = EntryPointMap::from_metadata(&metadata).unwrap();
        let path = out.get("src/index.css").unwrap();
        assert_eq!(path, format!("dist/index-{}.css", hash::fingerprint(css)));
        assert_eq!(fs::read_to_string(root.join(path)).unwrap(), css);
    }

    #[test]
    fn test_build_reports_errors_per_entry() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("src")).unwrap();
        fs::write(root.join("src/logo.svg"), "<svg/>").unwrap();

        let entry_points = entries(&["src/logo.svg", "src/missing.js"]);
        let outdir = root.join("dist");
        let result = MinifyBundler.build(&BundleOptions {
            root,
            entry_points: &entry_points,
            outdir: &outdir,
            minify: true,
        });

        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].path, "src/logo.svg");
        assert!(result.errors[0].text.contains("no loader"));
        assert_eq!(result.errors[1].path, "src/missing.js");
        assert_eq!(BuildMetadata::from_json(&result.metafile).unwrap(), BuildMetadata::default());
    }
}
