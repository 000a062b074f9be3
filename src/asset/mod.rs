//! Build artifacts: bundling, mapping, compression and storage.

pub mod bundle;
pub mod compress;
pub mod dist;
pub mod index;
pub mod metafile;
pub mod minify;
pub mod source;

pub use bundle::{BundleOptions, Bundler, MinifyBundler};
pub use index::{DEFAULT_DIST_PATHS, IndexDocument};
pub use metafile::{BuildMetadata, ENTRY_POINT_MAP_FILE, EntryPointMap};
pub use source::{AssetFile, AssetSource, DiskSource, MemorySource};
