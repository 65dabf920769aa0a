// Dataset Merger

use std::path::PathBuf;

use permis_core::years::YearRangeMode;
use permis_core::{CommuneAllowlist, PermitRecord, PermitTable, ProjectType, YearPolicy};
use serde::Serialize;

use crate::error::LoadError;
use crate::loader::{load_source, LoadLog};

/// A source file and the project type stamped on its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub path: PathBuf,
    pub project_type: ProjectType,
}

impl SourceDescriptor {
    pub fn new(path: impl Into<PathBuf>, project_type: ProjectType) -> Self {
        Self { path: path.into(), project_type }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "log", rename_all = "snake_case")]
pub enum SourceStatus {
    Loaded(LoadLog),
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub path: PathBuf,
    pub project_type: ProjectType,
    pub status: SourceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub table: PermitTable,
    /// One entry per descriptor, same order.
    pub reports: Vec<SourceReport>,
}

/// Load every present source and concatenate in descriptor order.
///
/// Absent files are skipped with a warning. A present file that cannot be
/// decoded or parsed fails the whole merge.
pub fn merge_sources(
    sources: &[SourceDescriptor],
    communes: &CommuneAllowlist,
    years: &YearPolicy,
) -> Result<MergeOutcome, LoadError> {
    let mut records: Vec<PermitRecord> = Vec::new();
    let mut reports = Vec::with_capacity(sources.len());

    for source in sources {
        if !source.path.exists() {
            log::warn!(
                "source {} ({}) not found, skipping",
                source.path.display(),
                source.project_type.as_str()
            );
            reports.push(SourceReport {
                path: source.path.clone(),
                project_type: source.project_type,
                status: SourceStatus::Missing,
            });
            continue;
        }

        let (loaded, log) = load_source(&source.path, source.project_type, communes, years)?;
        records.extend(loaded);
        reports.push(SourceReport {
            path: source.path.clone(),
            project_type: source.project_type,
            status: SourceStatus::Loaded(log),
        });
    }

    // Loaders already enforce the policy per row; this pass guards the
    // concatenated table as a whole.
    if years.mode == YearRangeMode::Reject {
        let before = records.len();
        records.retain(|r| r.filing_year.map_or(true, |y| years.in_range(y)));
        let removed = before - records.len();
        if removed > 0 {
            log::warn!("{removed} records outside the year range removed after merge");
        }
    }

    if records.is_empty() {
        log::warn!("no records loaded from {} sources", sources.len());
    }

    Ok(MergeOutcome {
        table: PermitTable::new(records),
        reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const HEADER: &str = "Code de la commune du lieu des travaux;Année de dépôt;Dénomination d'un demandeur";

    #[test]
    fn concatenates_in_descriptor_order_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let c = dir.path().join("c.csv");
        fs::write(&a, format!("{HEADER}\n31555;2020;A1\n31555;2021;A2\n")).unwrap();
        fs::write(&c, format!("{HEADER}\n31555;2019;C1\n")).unwrap();

        let sources = vec![
            SourceDescriptor::new(&a, ProjectType::Housing),
            SourceDescriptor::new(dir.path().join("b.csv"), ProjectType::Demolition),
            SourceDescriptor::new(&c, ProjectType::LandDevelopment),
        ];
        let out = merge_sources(&sources, &CommuneAllowlist::default(), &YearPolicy::default()).unwrap();

        let names: Vec<_> = out.table.iter().map(|r| r.applicant_name.as_deref().unwrap()).collect();
        assert_eq!(names, vec!["A1", "A2", "C1"]);
        assert_eq!(out.table.records()[2].project_type, ProjectType::LandDevelopment);

        assert_eq!(out.reports.len(), 3);
        assert_eq!(out.reports[1].status, SourceStatus::Missing);
        assert!(matches!(out.reports[0].status, SourceStatus::Loaded(ref log) if log.rows_kept == 2));
    }

    #[test]
    fn no_sources_present_gives_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let sources: Vec<_> = ProjectType::ALL
            .iter()
            .map(|pt| SourceDescriptor::new(dir.path().join(format!("{}.csv", pt.as_str())), *pt))
            .collect();
        let out = merge_sources(&sources, &CommuneAllowlist::default(), &YearPolicy::default()).unwrap();
        assert!(out.table.is_empty());
        assert!(out.reports.iter().all(|r| r.status == SourceStatus::Missing));
    }

    #[test]
    fn undecodable_present_source_fails_the_merge() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.csv");
        fs::write(&bad, [0xFFu8, 0x81, 0x9D]).unwrap();
        let err = merge_sources(
            &[SourceDescriptor::new(&bad, ProjectType::Housing)],
            &CommuneAllowlist::default(),
            &YearPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Encoding { .. }));
    }

    #[test]
    fn report_serializes_with_status_tag() {
        let report = SourceReport {
            path: PathBuf::from("x.csv"),
            project_type: ProjectType::Housing,
            status: SourceStatus::Missing,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"]["kind"], "missing");
        assert_eq!(json["project_type"], "housing");
    }
}
