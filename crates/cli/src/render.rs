// Text rendering for the CLI commands

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use permis_config::PipelineSettings;
use permis_core::stats::{self, Coverage, Ranked, Summary};
use permis_core::{CorporateGroup, PermitRecord, ProjectType};
use permis_io::{Snapshot, SourceStatus};
use serde::Serialize;

pub fn load_report(out: &mut impl Write, snap: &Snapshot) -> io::Result<()> {
    for report in &snap.reports {
        let file = report
            .path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| report.path.display().to_string());
        match &report.status {
            SourceStatus::Missing => {
                writeln!(out, "{:<13} {}  missing", report.project_type.label(), file)?;
            }
            SourceStatus::Loaded(log) => {
                let encoding = log.encoding.map(|e| e.to_string()).unwrap_or_else(|| "empty".into());
                writeln!(
                    out,
                    "{:<13} {}  [{}]  read {}  kept {}  outside communes {}  invalid year {}",
                    report.project_type.label(),
                    file,
                    encoding,
                    log.rows_read,
                    log.rows_kept,
                    log.rows_outside_communes,
                    log.rows_invalid_year,
                )?;
                if log.rows_flagged_year + log.rows_out_of_range_year > 0 {
                    writeln!(
                        out,
                        "{:<13} year out of range: {} flagged, {} rejected",
                        "",
                        log.rows_flagged_year,
                        log.rows_out_of_range_year
                    )?;
                }
                if !log.missing_fields.is_empty() {
                    let names: Vec<&str> = log.missing_fields.iter().map(|f| f.name()).collect();
                    writeln!(out, "{:<13} no column for: {}", "", names.join(", "))?;
                }
                for c in &log.collisions {
                    writeln!(out, "{:<13} {}: '{}' overrides '{}'", "", c.field, c.kept, c.dropped)?;
                }
            }
        }
    }

    for w in &snap.group_warnings {
        writeln!(out, "warning: {}: {}", w.file.display(), w.message)?;
    }

    writeln!(
        out,
        "{} records, {} communes, {} groups (reference {})",
        snap.table.len(),
        snap.communes.len(),
        snap.groups.len(),
        snap.epoch.reference_hash
    )
}

pub fn groups(out: &mut impl Write, groups: &BTreeMap<String, CorporateGroup>) -> io::Result<()> {
    for g in groups.values() {
        writeln!(out, "{}\t{} SIREN", g.name, g.identifiers.len())?;
    }
    Ok(())
}

// ============================================================================
// stats
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TypeCount {
    pub project_type: ProjectType,
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub project_type: ProjectType,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub summary: Summary,
    pub by_project_type: Vec<TypeCount>,
    pub by_year: Vec<YearCount>,
    pub top_localities: Vec<Ranked>,
    pub top_applicants: Vec<Ranked>,
    pub applicant_threshold: usize,
    pub coverage: Coverage,
    pub missing_names: Vec<TypeCount>,
}

fn type_counts(counts: Vec<(ProjectType, usize)>) -> Vec<TypeCount> {
    counts
        .into_iter()
        .map(|(project_type, count)| TypeCount { project_type, label: project_type.label(), count })
        .collect()
}

impl StatsReport {
    pub fn compute(records: &[&PermitRecord], top: usize, threshold: usize) -> Self {
        let it = || records.iter().copied();
        Self {
            summary: stats::summary(it()),
            by_project_type: type_counts(stats::count_by_project_type(it())),
            by_year: stats::count_by_year_and_type(it())
                .into_iter()
                .map(|((year, project_type), count)| YearCount { year, project_type, count })
                .collect(),
            top_localities: stats::top_localities(it(), top),
            top_applicants: stats::top_applicants(it(), threshold),
            applicant_threshold: threshold,
            coverage: stats::column_coverage(it()),
            missing_names: type_counts(stats::missing_names_by_type(it())),
        }
    }
}

pub fn stats(out: &mut impl Write, report: &StatsReport) -> io::Result<()> {
    let s = &report.summary;
    writeln!(out, "records:     {}", s.records)?;
    writeln!(out, "applicants:  {}", s.distinct_applicants)?;
    match (s.first_year, s.last_year) {
        (Some(first), Some(last)) => writeln!(out, "period:      {first}-{last}")?,
        _ => writeln!(out, "period:      -")?,
    }

    writeln!(out, "\nby project type")?;
    for t in &report.by_project_type {
        writeln!(out, "  {:<13} {}", t.label, t.count)?;
    }

    if !report.by_year.is_empty() {
        writeln!(out, "\nby year")?;
        for y in &report.by_year {
            writeln!(out, "  {} {:<13} {}", y.year, y.project_type.label(), y.count)?;
        }
    }

    if !report.top_localities.is_empty() {
        writeln!(out, "\ntop localities")?;
        for r in &report.top_localities {
            writeln!(out, "  {:>5}  {}", r.count, r.label)?;
        }
    }

    writeln!(out, "\napplicants with at least {} filings", report.applicant_threshold)?;
    if report.top_applicants.is_empty() {
        writeln!(out, "  none")?;
    }
    for r in &report.top_applicants {
        writeln!(out, "  {:>5}  {}", r.count, r.label)?;
    }

    let c = &report.coverage;
    writeln!(out, "\ncoverage")?;
    for (name, count) in [
        ("applicant name", c.applicant_name),
        ("SIREN", c.applicant_siren),
        ("SIRET", c.applicant_siret),
        ("filing year", c.filing_year),
    ] {
        writeln!(out, "  {:<15} {:>5.1}%", name, Coverage::percent(count, c.records))?;
    }

    let missing: Vec<_> = report.missing_names.iter().filter(|t| t.count > 0).collect();
    if !missing.is_empty() {
        writeln!(out, "\nrecords without applicant name")?;
        for t in missing {
            writeln!(out, "  {:<13} {}", t.label, t.count)?;
        }
    }
    Ok(())
}

// ============================================================================
// validate
// ============================================================================

pub fn validation(
    out: &mut impl Write,
    settings: &PipelineSettings,
    communes: &Path,
    sources: &[(PathBuf, ProjectType)],
) -> io::Result<()> {
    let mark = |p: &Path| if p.exists() { "ok" } else { "missing" };

    writeln!(out, "config ok")?;
    writeln!(out, "data dir:   {}", settings.data_dir().display())?;
    writeln!(
        out,
        "communes:   {} (column '{}') {}",
        communes.display(),
        settings.communes_column,
        mark(communes)
    )?;
    for (path, pt) in sources {
        writeln!(out, "{:<11} {} {}", format!("{}:", pt.as_str()), path.display(), mark(path))?;
    }
    writeln!(out, "groups:     {}<name>.csv", settings.group_prefix)?;
    writeln!(
        out,
        "years:      {:?} [{}, {}]",
        settings.year_range.mode, settings.year_range.min, settings.year_range.max
    )?;
    writeln!(out, "cache ttl:  {}s", settings.cache_ttl_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pt: ProjectType, name: &str, year: i32) -> PermitRecord {
        let mut r = PermitRecord::new(pt);
        r.applicant_name = Some(name.into());
        r.filing_year = Some(year);
        r
    }

    #[test]
    fn stats_report_text() {
        let records = [
            rec(ProjectType::Housing, "NEXITY", 2020),
            rec(ProjectType::Housing, "NEXITY", 2021),
            rec(ProjectType::Demolition, "COGEDIM", 2021),
        ];
        let refs: Vec<&PermitRecord> = records.iter().collect();
        let report = StatsReport::compute(&refs, 10, 2);

        let mut buf = Vec::new();
        stats(&mut buf, &report).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("records:     3"));
        assert!(text.contains("period:      2020-2021"));
        assert!(text.contains("      2  NEXITY"));
        assert!(!text.contains("COGEDIM\n"));
        assert!(text.contains("applicant name  100.0%"));
    }

    #[test]
    fn stats_report_json_shape() {
        let records = [rec(ProjectType::LandDevelopment, "A", 2019)];
        let refs: Vec<&PermitRecord> = records.iter().collect();
        let json = serde_json::to_value(StatsReport::compute(&refs, 10, 10)).unwrap();
        assert_eq!(json["summary"]["records"], 1);
        assert_eq!(json["by_project_type"].as_array().unwrap().len(), 4);
        assert_eq!(json["by_year"][0]["project_type"], "land_development");
    }
}
