//! `hashdist build`: clean, bundle, map, precompress.

use std::time::Instant;

use anyhow::{Context, Result, bail};

use crate::{
    asset::{
        BuildMetadata, BundleOptions, Bundler, EntryPointMap, MinifyBundler,
        bundle::BundleMessage,
        dist::{clean, precompress_dist},
    },
    config::ProjectConfig,
    debug, log,
    utils::plural_count,
};

/// Run a full build with the bundled minifier.
pub fn build_all(config: &ProjectConfig) -> Result<EntryPointMap> {
    build_with(config, &MinifyBundler)
}

/// Run a full build with `bundler`.
///
/// Every step is fatal on failure; a failed build leaves the output
/// directory as the failing step left it.
pub fn build_with(config: &ProjectConfig, bundler: &dyn Bundler) -> Result<EntryPointMap> {
    let started = Instant::now();
    let output = &config.build.output;

    let removed = clean(output, &config.build.placeholder)?;
    debug!("build"; "cleaned {} from {}", plural_count(removed, "entry"), output.display());

    log!("build"; "bundling {}", plural_count(config.build.entry_points.len(), "entry point"));
    let result = bundler.build(&BundleOptions {
        root: &config.root,
        entry_points: &config.build.entry_points,
        outdir: output,
        minify: config.build.minify,
    });

    log_messages("warn", &result.warnings);
    if !result.errors.is_empty() {
        log_messages("error", &result.errors);
        bail!("bundling failed with {}", plural_count(result.errors.len(), "error"));
    }

    let metadata = BuildMetadata::from_json(&result.metafile)?;
    let map = EntryPointMap::from_metadata(&metadata)?;
    if map.is_empty() {
        log!("warn"; "no entry point produced a hashed output");
    }
    let map_path = config.entry_point_map_path();
    map.save(&map_path)?;
    for (entry, hashed) in map.iter() {
        debug!("build"; "{entry} -> {hashed}");
    }

    let compressed = precompress_dist(output)
        .with_context(|| format!("cannot precompress `{}`", output.display()))?;
    debug!("build"; "precompressed {}", plural_count(compressed, "file"));

    log!(
        "build";
        "done in {:.2}s, {} mapped",
        started.elapsed().as_secs_f64(),
        plural_count(map.len(), "entry point")
    );
    Ok(map)
}

fn log_messages(module: &str, messages: &[BundleMessage]) {
    for message in messages {
        log!(module; "{message}");
    }
}
