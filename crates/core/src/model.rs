use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Project type
// ---------------------------------------------------------------------------

/// Permit category. Assigned per source file by the loader, never read from
/// the data itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ProjectType {
    Housing,
    NonResidentialPremises,
    Demolition,
    LandDevelopment,
}

impl ProjectType {
    pub const ALL: [ProjectType; 4] = [
        ProjectType::Housing,
        ProjectType::NonResidentialPremises,
        ProjectType::Demolition,
        ProjectType::LandDevelopment,
    ];

    /// Label shown to users and written on export.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Housing => "Logements",
            Self::NonResidentialPremises => "Locaux",
            Self::Demolition => "Démolition",
            Self::LandDevelopment => "Aménagement",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Housing => "housing",
            Self::NonResidentialPremises => "non_residential_premises",
            Self::Demolition => "demolition",
            Self::LandDevelopment => "land_development",
        }
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Canonical columns
// ---------------------------------------------------------------------------

/// A fixed semantic field of the unified schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    ProjectType,
    PermitNumber,
    FilingYear,
    CommuneCode,
    ApplicantName,
    ApplicantSiren,
    ApplicantSiret,
    Locality,
}

impl CanonicalField {
    /// Export/column order.
    pub const ALL: [CanonicalField; 8] = [
        CanonicalField::ProjectType,
        CanonicalField::PermitNumber,
        CanonicalField::FilingYear,
        CanonicalField::CommuneCode,
        CanonicalField::ApplicantName,
        CanonicalField::ApplicantSiren,
        CanonicalField::ApplicantSiret,
        CanonicalField::Locality,
    ];

    /// Fields read from source data (everything but `project_type`).
    pub const SOURCED: [CanonicalField; 7] = [
        CanonicalField::PermitNumber,
        CanonicalField::FilingYear,
        CanonicalField::CommuneCode,
        CanonicalField::ApplicantName,
        CanonicalField::ApplicantSiren,
        CanonicalField::ApplicantSiret,
        CanonicalField::Locality,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ProjectType => "project_type",
            Self::PermitNumber => "permit_number",
            Self::FilingYear => "filing_year",
            Self::CommuneCode => "commune_code",
            Self::ApplicantName => "applicant_name",
            Self::ApplicantSiren => "applicant_siren",
            Self::ApplicantSiret => "applicant_siret",
            Self::Locality => "locality",
        }
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One row of the unified table. Every canonical field is present; a source
/// lacking a column leaves the field `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermitRecord {
    pub project_type: ProjectType,
    pub permit_number: Option<String>,
    pub filing_year: Option<i32>,
    pub commune_code: Option<String>,
    pub applicant_name: Option<String>,
    /// Digits only.
    pub applicant_siren: Option<String>,
    /// Digits only.
    pub applicant_siret: Option<String>,
    pub locality: Option<String>,
}

impl PermitRecord {
    pub fn new(project_type: ProjectType) -> Self {
        Self {
            project_type,
            permit_number: None,
            filing_year: None,
            commune_code: None,
            applicant_name: None,
            applicant_siren: None,
            applicant_siret: None,
            locality: None,
        }
    }

    /// Text value of a field as displayed (`None` renders empty).
    pub fn display(&self, field: CanonicalField) -> String {
        match field {
            CanonicalField::ProjectType => self.project_type.label().to_string(),
            CanonicalField::FilingYear => {
                self.filing_year.map(|y| y.to_string()).unwrap_or_default()
            }
            other => self.text(other).unwrap_or_default().to_string(),
        }
    }

    /// Borrow a text-valued field. `project_type` and `filing_year` are not
    /// text and return `None`.
    pub fn text(&self, field: CanonicalField) -> Option<&str> {
        match field {
            CanonicalField::PermitNumber => self.permit_number.as_deref(),
            CanonicalField::CommuneCode => self.commune_code.as_deref(),
            CanonicalField::ApplicantName => self.applicant_name.as_deref(),
            CanonicalField::ApplicantSiren => self.applicant_siren.as_deref(),
            CanonicalField::ApplicantSiret => self.applicant_siret.as_deref(),
            CanonicalField::Locality => self.locality.as_deref(),
            CanonicalField::ProjectType | CanonicalField::FilingYear => None,
        }
    }

    pub fn set_text(&mut self, field: CanonicalField, value: Option<String>) {
        match field {
            CanonicalField::PermitNumber => self.permit_number = value,
            CanonicalField::CommuneCode => self.commune_code = value,
            CanonicalField::ApplicantName => self.applicant_name = value,
            CanonicalField::ApplicantSiren => self.applicant_siren = value,
            CanonicalField::ApplicantSiret => self.applicant_siret = value,
            CanonicalField::Locality => self.locality = value,
            CanonicalField::ProjectType | CanonicalField::FilingYear => {}
        }
    }
}

/// The merged, normalized dataset. Built once, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermitTable {
    records: Vec<PermitRecord>,
}

impl PermitTable {
    pub fn new(records: Vec<PermitRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[PermitRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PermitRecord> {
        self.records.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
