//! Header-to-canonical-field matching.
//!
//! Source exports rename their columns from one year to the next, so headers
//! are classified by substring: each detector pattern is compared against the
//! normalized header, first matching detector wins. When two headers land on
//! the same field the later header in file order wins. Both rules are
//! deterministic and every unmatched or colliding header is reported.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::CanonicalField;
use crate::normalize::normalize_header;

/// One `(pattern, field)` detector. `pattern` is kept in header-normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detector {
    pub pattern: String,
    pub field: CanonicalField,
}

impl Detector {
    pub fn new(pattern: &str, field: CanonicalField) -> Self {
        Self { pattern: normalize_header(pattern), field }
    }
}

/// Default detector table, in priority order.
pub const DEFAULT_DETECTORS: [(&str, CanonicalField); 7] = [
    ("code de la commune du lieu des travaux", CanonicalField::CommuneCode),
    ("annee de depot", CanonicalField::FilingYear),
    ("denomination d un demandeur", CanonicalField::ApplicantName),
    ("numero siren", CanonicalField::ApplicantSiren),
    ("numero siret", CanonicalField::ApplicantSiret),
    ("numero d enregistrement", CanonicalField::PermitNumber),
    ("localite du terrain", CanonicalField::Locality),
];

/// A header that lost a canonical field to a later header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub field: CanonicalField,
    pub dropped: String,
    pub kept: String,
}

/// Result of mapping one file's header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Canonical field → column index of the winning header.
    columns: BTreeMap<CanonicalField, usize>,
    /// Raw headers that matched no detector, in file order.
    pub unmatched: Vec<String>,
    pub collisions: Vec<Collision>,
}

impl ColumnMapping {
    pub fn index(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// Fields that have a source column.
    pub fn mapped_fields(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.columns.keys().copied()
    }

    /// Sourced canonical fields with no matching header.
    pub fn missing_fields(&self) -> Vec<CanonicalField> {
        CanonicalField::SOURCED
            .iter()
            .copied()
            .filter(|f| !self.columns.contains_key(f))
            .collect()
    }
}

/// Ordered detector table.
#[derive(Debug, Clone)]
pub struct ColumnMapper {
    detectors: Vec<Detector>,
}

impl Default for ColumnMapper {
    fn default() -> Self {
        Self::new(
            DEFAULT_DETECTORS
                .iter()
                .map(|(pattern, field)| Detector::new(pattern, *field))
                .collect(),
        )
    }
}

impl ColumnMapper {
    pub fn new(detectors: Vec<Detector>) -> Self {
        Self { detectors }
    }

    /// Mapper used for corporate-group files: only a SIREN column matters.
    pub fn siren_only() -> Self {
        Self::new(vec![Detector::new("siren", CanonicalField::ApplicantSiren)])
    }

    /// Canonical field for a single raw header, if any detector matches.
    pub fn classify(&self, header: &str) -> Option<CanonicalField> {
        let normalized = normalize_header(header);
        self.detectors
            .iter()
            .find(|d| !d.pattern.is_empty() && normalized.contains(d.pattern.as_str()))
            .map(|d| d.field)
    }

    pub fn map_headers<S: AsRef<str>>(&self, headers: &[S]) -> ColumnMapping {
        let mut mapping = ColumnMapping::default();

        for (idx, header) in headers.iter().enumerate() {
            let header = header.as_ref();
            let Some(field) = self.classify(header) else {
                log::debug!("unmapped header: {header:?}");
                mapping.unmatched.push(header.to_string());
                continue;
            };

            if let Some(previous) = mapping.columns.insert(field, idx) {
                let dropped = headers[previous].as_ref().to_string();
                log::warn!(
                    "headers {dropped:?} and {header:?} both map to {field}; keeping the later one"
                );
                mapping.collisions.push(Collision {
                    field,
                    dropped,
                    kept: header.to_string(),
                });
            }
        }

        mapping
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
