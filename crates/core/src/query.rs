use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::groups::CorporateGroup;
use crate::model::{CanonicalField, PermitRecord, PermitTable};
use crate::normalize::normalize;

/// Free-text queries shorter than this (in characters) are treated as
/// "nothing entered" rather than matched against every record.
pub const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    All,
    Name,
    Siren,
    Siret,
    Group,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Name => write!(f, "name"),
            Self::Siren => write!(f, "siren"),
            Self::Siret => write!(f, "siret"),
            Self::Group => write!(f, "group"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    All,
    Name(String),
    Siren(String),
    Siret(String),
    /// Group name as listed in the group table.
    Group(String),
}

impl SearchQuery {
    pub fn new(mode: SearchMode, value: impl Into<String>) -> Self {
        let value = value.into();
        match mode {
            SearchMode::All => Self::All,
            SearchMode::Name => Self::Name(value),
            SearchMode::Siren => Self::Siren(value),
            SearchMode::Siret => Self::Siret(value),
            SearchMode::Group => Self::Group(value),
        }
    }

    pub fn mode(&self) -> SearchMode {
        match self {
            Self::All => SearchMode::All,
            Self::Name(_) => SearchMode::Name,
            Self::Siren(_) => SearchMode::Siren,
            Self::Siret(_) => SearchMode::Siret,
            Self::Group(_) => SearchMode::Group,
        }
    }

    /// True when a free-text query is too short to run. Name queries are
    /// measured after normalization, so separator-only input is blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Name(v) => normalize(v.as_str()).chars().count() < MIN_QUERY_CHARS,
            Self::Siren(v) | Self::Siret(v) => v.trim().chars().count() < MIN_QUERY_CHARS,
            Self::All | Self::Group(_) => false,
        }
    }
}

/// Search result. `NoQuery` and an empty `Results` are distinct outcomes.
#[derive(Debug, PartialEq, Eq)]
pub enum SearchOutcome<'a> {
    NoQuery,
    Results(Vec<&'a PermitRecord>),
}

impl<'a> SearchOutcome<'a> {
    pub fn records(&self) -> &[&'a PermitRecord] {
        match self {
            Self::NoQuery => &[],
            Self::Results(records) => records,
        }
    }

    pub fn is_no_query(&self) -> bool {
        matches!(self, Self::NoQuery)
    }
}

/// Filter the unified table.
pub fn search<'a>(
    table: &'a PermitTable,
    groups: &BTreeMap<String, CorporateGroup>,
    query: &SearchQuery,
) -> SearchOutcome<'a> {
    if query.is_blank() {
        return SearchOutcome::NoQuery;
    }

    let records = table.iter();
    let hits: Vec<&PermitRecord> = match query {
        SearchQuery::All => records.collect(),
        SearchQuery::Name(value) => {
            let needle = normalize(value.as_str());
            records
                .filter(|r| {
                    r.applicant_name
                        .as_deref()
                        .is_some_and(|name| normalize(name).contains(&needle))
                })
                .collect()
        }
        SearchQuery::Siren(value) => {
            records.filter(|r| field_contains(r, CanonicalField::ApplicantSiren, value)).collect()
        }
        SearchQuery::Siret(value) => {
            records.filter(|r| field_contains(r, CanonicalField::ApplicantSiret, value)).collect()
        }
        SearchQuery::Group(name) => match groups.get(name) {
            Some(group) => records.filter(|r| group.matches(r)).collect(),
            None => {
                log::warn!("unknown group: {name:?}");
                Vec::new()
            }
        },
    };

    SearchOutcome::Results(hits)
}

/// Raw, non-normalized substring match on an identifier field.
fn field_contains(record: &PermitRecord, field: CanonicalField, value: &str) -> bool {
    record
        .text(field)
        .is_some_and(|text| text.to_lowercase().contains(&value.to_lowercase()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
