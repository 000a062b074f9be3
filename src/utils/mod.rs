//! Shared helpers: dates, hashing, MIME types, paths, task groups.

pub mod date;
pub mod group;
pub mod hash;
pub mod mime;
pub mod path;
mod plural;

pub use plural::plural_count;
