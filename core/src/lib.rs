//! Rewrites Papers with Code paper links to arXiv abstract links using the offline
//! Papers with Code backup.
//!
//! Build a [`MappingIndex`] once, then call [`convert`] per document.

pub mod dataset;
pub mod error;
pub mod index;
pub mod locator;
pub mod persist;
pub mod rewrite;

pub use dataset::BackupRecord;
pub use error::MappingError;
pub use index::{normalize_slug, BuildOptions, BuildReport, DuplicatePolicy, Entry, MappingIndex, TargetSelection};
pub use locator::{find_all, parse_source_url, Match, SourceHost};
pub use rewrite::{convert, Conversion, Substitution, Unresolved};
