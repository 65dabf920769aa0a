// Pipeline settings
// Loaded from a permis.toml file (default: ~/.config/permis/permis.toml)

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use permis_core::{ProjectType, YearPolicy};
use serde::Deserialize;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_COMMUNES_FILE: &str = "Codes INSEE communes Toulouse Métropole.csv";
pub const DEFAULT_COMMUNES_COLUMN: &str = "Code INSEE";
pub const DEFAULT_GROUP_PREFIX: &str = "Data PC -";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

fn default_sources() -> Vec<SourceConfig> {
    [
        (ProjectType::Housing, "Liste-des-autorisations-durbanisme-creant-des-logements.2026-01.csv"),
        (
            ProjectType::NonResidentialPremises,
            "Liste-des-autorisations-durbanisme-creant-des-locaux-non-residentiels.2026-01.csv",
        ),
        (ProjectType::Demolition, "Liste-des-permis-de-demolir.2026-01.csv"),
        (ProjectType::LandDevelopment, "Liste-des-permis-damenager.2026-01.csv"),
    ]
    .into_iter()
    .map(|(project_type, file)| SourceConfig { project_type, file: file.into() })
    .collect()
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// One permit export and the project type stamped on its records.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    pub project_type: ProjectType,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Directory holding sources, reference and group files. Relative paths
    /// resolve against the config file's directory.
    pub data_dir: PathBuf,

    /// Comma-delimited commune reference file, relative to `data_dir`.
    pub communes_file: PathBuf,

    /// Header of the commune code column in `communes_file`.
    pub communes_column: String,

    /// Group files are `<group_prefix><name>.csv` inside `data_dir`.
    pub group_prefix: String,

    /// Cache epoch length.
    pub cache_ttl_secs: u64,

    pub year_range: YearPolicy,

    pub sources: Vec<SourceConfig>,

    /// Directory of the file this was loaded from.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            communes_file: PathBuf::from(DEFAULT_COMMUNES_FILE),
            communes_column: DEFAULT_COMMUNES_COLUMN.into(),
            group_prefix: DEFAULT_GROUP_PREFIX.into(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            year_range: YearPolicy::default(),
            sources: default_sources(),
            base_dir: PathBuf::from("."),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineSettings {
    /// Default config location.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("permis")
            .join("permis.toml")
    }

    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let settings: PipelineSettings =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read and validate a config file; paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_toml(&input)?;
        settings.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(settings)
    }

    /// Built-in defaults rooted at `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), ..Self::default() }
    }

    /// Override the data directory (absolute, or relative to the base dir).
    pub fn set_data_dir(&mut self, data_dir: impl Into<PathBuf>) {
        self.data_dir = data_dir.into();
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Validation("at least one source is required".into()));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.file.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "source '{}': file must not be empty",
                    source.project_type.as_str()
                )));
            }
            if !seen.insert(&source.file) {
                return Err(ConfigError::Validation(format!(
                    "source file '{}' listed twice",
                    source.file.display()
                )));
            }
        }

        if self.year_range.min > self.year_range.max {
            return Err(ConfigError::Validation(format!(
                "year_range: min {} is greater than max {}",
                self.year_range.min, self.year_range.max
            )));
        }

        if self.group_prefix.trim().is_empty() {
            return Err(ConfigError::Validation("group_prefix must not be empty".into()));
        }

        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Validation("cache_ttl_secs must be positive".into()));
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Resolved paths
    // -----------------------------------------------------------------------

    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join(&self.data_dir)
    }

    pub fn communes_path(&self) -> PathBuf {
        self.data_dir().join(&self.communes_file)
    }

    /// `(path, project_type)` per source, in configured order.
    pub fn source_paths(&self) -> Vec<(PathBuf, ProjectType)> {
        let dir = self.data_dir();
        self.sources
            .iter()
            .map(|s| (dir.join(&s.file), s.project_type))
            .collect()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
