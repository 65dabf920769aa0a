// Group Resolver: scan a directory for corporate-group files

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use permis_core::{CanonicalField, ColumnMapper, CorporateGroup};
use serde::Serialize;

use crate::decode::{csv_error, csv_reader, read_headers, read_text, sniff_delimiter};
use crate::error::LoadError;

const GROUP_EXTENSION: &str = ".csv";

/// A group file that could not be used. Other groups still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupWarning {
    pub file: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupLoad {
    /// Keyed by group name.
    pub groups: BTreeMap<String, CorporateGroup>,
    pub warnings: Vec<GroupWarning>,
}

/// Group name encoded in a file name: `<prefix><name>.csv`.
pub fn group_name(file_name: &str, prefix: &str) -> Option<String> {
    let rest = file_name.strip_prefix(prefix)?;
    let name = rest.strip_suffix(GROUP_EXTENSION)?;
    Some(name.trim().to_string())
}

/// Load every group file in `dir`, in file-name order.
///
/// A missing directory yields no groups. Unreadable files and files whose
/// name leaves an empty group name are reported as warnings and skipped.
pub fn load_groups(dir: &Path, prefix: &str) -> GroupLoad {
    let mut out = GroupLoad::default();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("group directory {}: {e}", dir.display());
            return out;
        }
    };

    let mut files: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            let file_name = entry.file_name().to_str()?.to_string();
            Some((file_name, entry.path()))
        })
        .collect();
    files.sort();

    for (file_name, path) in files {
        let Some(name) = group_name(&file_name, prefix) else {
            continue;
        };

        if name.is_empty() {
            log::warn!("{}: empty group name, skipping", path.display());
            out.warnings.push(GroupWarning {
                file: path,
                message: "empty group name".into(),
            });
            continue;
        }

        match read_group_file(&path, &name) {
            Ok(group) => {
                log::debug!("group {name:?}: {} identifiers", group.identifiers.len());
                if let Some(existing) = out.groups.get_mut(&group.name) {
                    log::warn!("{}: group {name:?} already defined, identifiers merged", path.display());
                    existing.identifiers.extend(group.identifiers);
                    out.warnings.push(GroupWarning {
                        file: path,
                        message: format!("duplicate group name {name:?}, identifiers merged"),
                    });
                } else {
                    out.groups.insert(group.name.clone(), group);
                }
            }
            Err(e) => {
                log::warn!("group {name:?} skipped: {e}");
                out.warnings.push(GroupWarning {
                    file: path,
                    message: e.to_string(),
                });
            }
        }
    }

    out
}

/// One group file. No SIREN column gives a group with no identifiers,
/// matched by keyword only.
pub fn read_group_file(path: &Path, name: &str) -> Result<CorporateGroup, LoadError> {
    let (content, _) = read_text(path)?;
    let mut reader = csv_reader(&content, sniff_delimiter(&content));
    let headers = read_headers(path, &mut reader)?;

    let Some(idx) = ColumnMapper::siren_only()
        .map_headers(&headers)
        .index(CanonicalField::ApplicantSiren)
    else {
        log::info!("{}: no SIREN column, keyword match only", path.display());
        return Ok(CorporateGroup::new(name, std::iter::empty::<&str>()));
    };

    let mut identifiers = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        if let Some(cell) = record.get(idx) {
            identifiers.push(cell.to_string());
        }
    }

    Ok(CorporateGroup::new(name, identifiers))
}
