//! Path utilities.
//!
//! - [`fs`]: filesystem path normalization (`normalize_path`)
//! - [`url`]: request path decoding and safe resolution under a root

pub mod fs;
pub mod url;

pub use fs::normalize_path;
