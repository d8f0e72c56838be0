//! F-Droid package index acquisition and worklist extraction.
//!
//! The index is thin I/O glue around the submission core: download (with a
//! local cache), parse, and reduce to the deduplicated set of source
//! repository URLs.

mod loader;
mod model;

pub use loader::{DEFAULT_INDEX_URL, IndexError, IndexSource, load_or_fetch};
pub use model::{Package, PackageIndex, PackageMetadata};
