use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::PermitRecord;

/// A curated corporate group: a SIREN allowlist plus a name keyword fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorporateGroup {
    pub name: String,
    /// Digits-only SIREN values.
    pub identifiers: BTreeSet<String>,
    /// Uppercased group name, matched as a case-insensitive substring of
    /// the applicant name.
    pub keyword: String,
}

impl CorporateGroup {
    /// Build a group from its display name and raw identifier values.
    /// Identifiers are reduced to digits; values with no digits are dropped.
    pub fn new<I, S>(name: &str, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.trim();
        let identifiers = identifiers
            .into_iter()
            .filter_map(|raw| digits_only(raw.as_ref()))
            .collect();
        Self {
            name: name.to_string(),
            identifiers,
            keyword: name.to_uppercase(),
        }
    }

    /// SIREN membership OR keyword containment. Both checks always run.
    pub fn matches(&self, record: &PermitRecord) -> bool {
        let by_siren = record
            .applicant_siren
            .as_deref()
            .is_some_and(|siren| self.identifiers.contains(siren));
        let by_name = self.matches_name(record.applicant_name.as_deref());
        by_siren | by_name
    }

    fn matches_name(&self, name: Option<&str>) -> bool {
        match name {
            Some(name) if !self.keyword.is_empty() => {
                name.to_lowercase().contains(&self.keyword.to_lowercase())
            }
            _ => false,
        }
    }
}

/// Strip every non-digit character. `None` when nothing remains.
pub fn digits_only(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (!digits.is_empty()).then_some(digits)
}
