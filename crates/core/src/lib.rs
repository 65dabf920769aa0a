//! `permis-core`: building-permit record model and harmonization rules.
//!
//! Pure engine crate: text normalization, header classification, corporate
//! groups, search and aggregates over already-loaded records. No IO.

pub mod columns;
pub mod communes;
pub mod groups;
pub mod model;
pub mod normalize;
pub mod query;
pub mod stats;
pub mod years;

pub use columns::{ColumnMapper, ColumnMapping};
pub use communes::CommuneAllowlist;
pub use groups::CorporateGroup;
pub use model::{CanonicalField, PermitRecord, PermitTable, ProjectType};
pub use normalize::{normalize, normalize_header};
pub use query::{search, SearchMode, SearchOutcome, SearchQuery};
pub use years::{YearPolicy, YearRangeMode};
