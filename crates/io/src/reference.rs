// Commune reference list

use std::path::Path;

use permis_core::{normalize_header, CommuneAllowlist};

use crate::decode::{csv_error, csv_reader, read_headers, read_text};
use crate::error::LoadError;

/// Load the commune allowlist from a comma-delimited reference file.
///
/// The code column is located by header, compared after header
/// normalization, so `"Code INSEE"` also finds `"code_insee"`. An absent
/// file yields an empty allowlist (no spatial filter) and a warning; a
/// present file without the column is an error.
pub fn load_communes(path: &Path, column: &str) -> Result<CommuneAllowlist, LoadError> {
    if !path.exists() {
        log::warn!(
            "commune reference {} not found; records will not be filtered by commune",
            path.display()
        );
        return Ok(CommuneAllowlist::default());
    }

    let (content, _) = read_text(path)?;
    let mut reader = csv_reader(&content, b',');
    let headers = read_headers(path, &mut reader)?;

    let wanted = normalize_header(column);
    let idx = headers
        .iter()
        .position(|h| normalize_header(h) == wanted)
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })?;

    let mut codes = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        if let Some(code) = record.get(idx) {
            codes.push(code.to_string());
        }
    }

    let allowlist = CommuneAllowlist::new(codes);
    log::info!("{}: {} commune codes", path.display(), allowlist.len());
    Ok(allowlist)
}
