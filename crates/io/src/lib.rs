// File I/O: permit exports, commune reference, group files, CSV export

pub mod catalog;
pub mod decode;
pub mod error;
pub mod export;
pub mod groups;
pub mod loader;
pub mod merge;
pub mod reference;

pub use catalog::{Catalog, CatalogSources, EpochToken, Snapshot};
pub use error::{ExportError, LoadError};
pub use groups::{load_groups, GroupLoad, GroupWarning};
pub use loader::{load_source, load_source_bytes, LoadLog};
pub use merge::{merge_sources, MergeOutcome, SourceDescriptor, SourceReport, SourceStatus};
pub use reference::load_communes;
