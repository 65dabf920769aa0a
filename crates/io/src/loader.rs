// Source File Loader
//
// One permit export in, canonical records plus a diagnostics log out.
// Row-level problems are counted, never fatal.

use std::path::Path;

use permis_core::columns::Collision;
use permis_core::groups::digits_only;
use permis_core::years::{parse_year, YearCheck};
use permis_core::{
    CanonicalField, ColumnMapper, CommuneAllowlist, PermitRecord, ProjectType, YearPolicy,
};
use serde::Serialize;

use crate::decode::{csv_error, csv_reader, decode_bytes, read_headers, TextEncoding};
use crate::error::LoadError;

/// Field delimiter of the permit exports.
pub const SOURCE_DELIMITER: u8 = b';';

/// Per-source load diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadLog {
    pub source: String,
    pub project_type: ProjectType,
    /// `None` for an empty file.
    pub encoding: Option<TextEncoding>,
    pub rows_read: usize,
    pub rows_outside_communes: usize,
    /// Filing year empty or not a number.
    pub rows_invalid_year: usize,
    /// Dropped by a `reject` year policy.
    pub rows_out_of_range_year: usize,
    /// Kept but outside the range under a `flag` year policy.
    pub rows_flagged_year: usize,
    pub rows_kept: usize,
    pub unmapped_headers: Vec<String>,
    pub collisions: Vec<Collision>,
    pub missing_fields: Vec<CanonicalField>,
}

impl LoadLog {
    fn new(path: &Path, project_type: ProjectType) -> Self {
        Self {
            source: path.display().to_string(),
            project_type,
            encoding: None,
            rows_read: 0,
            rows_outside_communes: 0,
            rows_invalid_year: 0,
            rows_out_of_range_year: 0,
            rows_flagged_year: 0,
            rows_kept: 0,
            unmapped_headers: Vec::new(),
            collisions: Vec::new(),
            missing_fields: Vec::new(),
        }
    }
}

/// Read one permit export from disk.
pub fn load_source(
    path: &Path,
    project_type: ProjectType,
    communes: &CommuneAllowlist,
    years: &YearPolicy,
) -> Result<(Vec<PermitRecord>, LoadLog), LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_source_bytes(path, bytes, project_type, communes, years)
}

/// Same as [`load_source`] over bytes already in memory. `path` names the
/// source in diagnostics and errors.
pub fn load_source_bytes(
    path: &Path,
    bytes: Vec<u8>,
    project_type: ProjectType,
    communes: &CommuneAllowlist,
    years: &YearPolicy,
) -> Result<(Vec<PermitRecord>, LoadLog), LoadError> {
    let mut log = LoadLog::new(path, project_type);

    if bytes.is_empty() {
        log::warn!("{}: empty file", path.display());
        log.missing_fields = CanonicalField::SOURCED.to_vec();
        return Ok((Vec::new(), log));
    }

    let (content, encoding) = decode_bytes(path, bytes)?;
    log.encoding = Some(encoding);

    let mut reader = csv_reader(&content, SOURCE_DELIMITER);
    let headers = read_headers(path, &mut reader)?;
    let mapping = ColumnMapper::default().map_headers(&headers);

    let commune_idx = mapping.index(CanonicalField::CommuneCode);
    let year_idx = mapping.index(CanonicalField::FilingYear);
    let filter_communes = commune_idx.is_some() && !communes.is_empty();
    if commune_idx.is_none() && !communes.is_empty() {
        log::warn!("{}: no commune column; commune filter not applied", path.display());
    }

    let text_fields: Vec<(CanonicalField, usize)> = mapping
        .mapped_fields()
        .filter(|f| *f != CanonicalField::FilingYear)
        .filter_map(|f| mapping.index(f).map(|idx| (f, idx)))
        .collect();

    let mut records = Vec::new();

    for row in reader.records() {
        let row = row.map_err(|e| csv_error(path, e))?;
        log.rows_read += 1;

        let mut record = PermitRecord::new(project_type);
        for &(field, idx) in &text_fields {
            let value = row.get(idx).and_then(|cell| clean_cell(field, cell));
            record.set_text(field, value);
        }

        if filter_communes {
            let inside = record
                .commune_code
                .as_deref()
                .is_some_and(|code| communes.contains(code));
            if !inside {
                log.rows_outside_communes += 1;
                continue;
            }
        }

        if let Some(idx) = year_idx {
            let Some(year) = row.get(idx).and_then(parse_year) else {
                log.rows_invalid_year += 1;
                continue;
            };
            match years.check(year) {
                YearCheck::Ok => {}
                YearCheck::Flagged => log.rows_flagged_year += 1,
                YearCheck::Rejected => {
                    log.rows_out_of_range_year += 1;
                    continue;
                }
            }
            record.filing_year = Some(year);
        }

        records.push(record);
    }

    log.rows_kept = records.len();
    log.missing_fields = mapping.missing_fields();
    log.unmapped_headers = mapping.unmatched;
    log.collisions = mapping.collisions;

    log::info!(
        "{} ({}): {} rows read, {} kept, {} outside communes, {} invalid year",
        path.display(),
        project_type.as_str(),
        log.rows_read,
        log.rows_kept,
        log.rows_outside_communes,
        log.rows_invalid_year,
    );
    if log.rows_flagged_year > 0 {
        log::warn!(
            "{}: {} filing years outside [{}, {}]",
            path.display(),
            log.rows_flagged_year,
            years.min,
            years.max
        );
    }

    Ok((records, log))
}

/// Blank cells are `None`. Identifiers keep digits only; commune codes are
/// trimmed; other text is kept as written.
fn clean_cell(field: CanonicalField, cell: &str) -> Option<String> {
    if cell.trim().is_empty() {
        return None;
    }
    match field {
        CanonicalField::ApplicantSiren | CanonicalField::ApplicantSiret => digits_only(cell),
        _ => Some(cell.trim().to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
