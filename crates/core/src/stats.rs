//! Aggregates over a record set, used by the display layer.
//!
//! All functions accept any iterator of record references so they work on the
//! full table as well as on a search result. Orderings are deterministic.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::model::{PermitRecord, ProjectType};

/// Applicants with at least this many filings appear in the ranking.
pub const DEFAULT_TOP_APPLICANT_THRESHOLD: usize = 10;

/// Number of localities in the locality ranking.
pub const DEFAULT_TOP_LOCALITIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub records: usize,
    pub distinct_applicants: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
}

pub fn summary<'a, I>(records: I) -> Summary
where
    I: IntoIterator<Item = &'a PermitRecord>,
{
    let mut count = 0;
    let mut names = BTreeSet::new();
    let mut first_year: Option<i32> = None;
    let mut last_year: Option<i32> = None;

    for r in records {
        count += 1;
        if let Some(name) = r.applicant_name.as_deref() {
            names.insert(name);
        }
        if let Some(y) = r.filing_year {
            first_year = Some(first_year.map_or(y, |f| f.min(y)));
            last_year = Some(last_year.map_or(y, |l| l.max(y)));
        }
    }

    Summary {
        records: count,
        distinct_applicants: names.len(),
        first_year,
        last_year,
    }
}

/// Record count per project type, every type present (zero if absent).
pub fn count_by_project_type<'a, I>(records: I) -> Vec<(ProjectType, usize)>
where
    I: IntoIterator<Item = &'a PermitRecord>,
{
    let mut counts = [0usize; ProjectType::ALL.len()];
    for r in records {
        counts[r.project_type as usize] += 1;
    }
    ProjectType::ALL.iter().copied().zip(counts).collect()
}

/// Yearly evolution: `(year, type) → count`, records without a year skipped.
pub fn count_by_year_and_type<'a, I>(records: I) -> BTreeMap<(i32, ProjectType), usize>
where
    I: IntoIterator<Item = &'a PermitRecord>,
{
    let mut out = BTreeMap::new();
    for r in records {
        if let Some(year) = r.filing_year {
            *out.entry((year, r.project_type)).or_insert(0) += 1;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranked {
    pub label: String,
    pub count: usize,
}

/// The `n` most frequent localities.
pub fn top_localities<'a, I>(records: I, n: usize) -> Vec<Ranked>
where
    I: IntoIterator<Item = &'a PermitRecord>,
{
    let mut ranked = rank(records.into_iter().filter_map(|r| r.locality.as_deref()));
    ranked.truncate(n);
    ranked
}

/// Applicants with at least `min_count` filings.
pub fn top_applicants<'a, I>(records: I, min_count: usize) -> Vec<Ranked>
where
    I: IntoIterator<Item = &'a PermitRecord>,
{
    rank(records.into_iter().filter_map(|r| r.applicant_name.as_deref()))
        .into_iter()
        .filter(|r| r.count >= min_count)
        .collect()
}

/// Count desc, then label asc.
fn rank<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<Ranked> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    let mut ranked: Vec<Ranked> = counts
        .into_iter()
        .map(|(label, count)| Ranked { label: label.to_string(), count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    ranked
}

/// Non-null counts for the fields that drive search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub records: usize,
    pub applicant_name: usize,
    pub applicant_siren: usize,
    pub applicant_siret: usize,
    pub filing_year: usize,
}

impl Coverage {
    pub fn percent(count: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            100.0 * count as f64 / total as f64
        }
    }
}

pub fn column_coverage<'a, I>(records: I) -> Coverage
where
    I: IntoIterator<Item = &'a PermitRecord>,
{
    let mut c = Coverage::default();
    for r in records {
        c.records += 1;
        c.applicant_name += r.applicant_name.is_some() as usize;
        c.applicant_siren += r.applicant_siren.is_some() as usize;
        c.applicant_siret += r.applicant_siret.is_some() as usize;
        c.filing_year += r.filing_year.is_some() as usize;
    }
    c
}

/// Records lacking an applicant name, per project type.
pub fn missing_names_by_type<'a, I>(records: I) -> Vec<(ProjectType, usize)>
where
    I: IntoIterator<Item = &'a PermitRecord>,
{
    count_by_project_type(records.into_iter().filter(|r| r.applicant_name.is_none()))
}
