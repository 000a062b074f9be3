//! Configuration section definitions.
//!
//! Each module corresponds to a section in `hashdist.toml`:
//!
//! | Module  | TOML Section | Purpose                                  |
//! |---------|--------------|------------------------------------------|
//! | `build` | `[build]`    | Entry points, output directory, minify   |
//! | `serve` | `[serve]`    | Listen address, index template, workers  |

mod build;
mod serve;

pub use build::BuildConfig;
pub use serve::ServeConfig;
