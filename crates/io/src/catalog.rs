// Catalog: the derived dataset for one cache epoch.
//
// A snapshot is built synchronously from the configured files and shared
// read-only behind an Arc. It is rebuilt when the epoch's TTL elapses, when
// the commune reference file changes, or on explicit invalidation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use permis_config::PipelineSettings;
use permis_core::{CommuneAllowlist, CorporateGroup, PermitTable, YearPolicy};
use serde::Serialize;

use crate::error::LoadError;
use crate::groups::{load_groups, GroupWarning};
use crate::merge::{merge_sources, SourceDescriptor, SourceReport};
use crate::reference::load_communes;

/// Reference hash recorded when there is no commune file.
pub const ABSENT_REFERENCE: &str = "absent";

/// Every input a snapshot is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSources {
    pub sources: Vec<SourceDescriptor>,
    pub communes_path: PathBuf,
    pub communes_column: String,
    pub groups_dir: PathBuf,
    pub group_prefix: String,
    pub years: YearPolicy,
    pub ttl: Duration,
}

impl CatalogSources {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            sources: settings
                .source_paths()
                .into_iter()
                .map(|(path, project_type)| SourceDescriptor { path, project_type })
                .collect(),
            communes_path: settings.communes_path(),
            communes_column: settings.communes_column.clone(),
            groups_dir: settings.data_dir(),
            group_prefix: settings.group_prefix.clone(),
            years: settings.year_range,
            ttl: settings.cache_ttl(),
        }
    }
}

/// Identifies the inputs a snapshot was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpochToken {
    /// `blake3:<hex>` of the commune reference file, or [`ABSENT_REFERENCE`].
    pub reference_hash: String,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Snapshot {
    pub table: PermitTable,
    pub reports: Vec<SourceReport>,
    pub groups: BTreeMap<String, CorporateGroup>,
    pub group_warnings: Vec<GroupWarning>,
    pub communes: CommuneAllowlist,
    pub epoch: EpochToken,
}

/// Hash the reference file content.
pub fn reference_hash(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Ok(ABSENT_REFERENCE.to_string());
    }
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(format!("blake3:{}", blake3::hash(&bytes).to_hex()))
}

/// Build a snapshot from scratch. Pure function of the files on disk.
pub fn build_snapshot(sources: &CatalogSources, now: DateTime<Utc>) -> Result<Snapshot, LoadError> {
    let reference_hash = reference_hash(&sources.communes_path)?;
    let communes = load_communes(&sources.communes_path, &sources.communes_column)?;
    let merged = merge_sources(&sources.sources, &communes, &sources.years)?;
    let groups = load_groups(&sources.groups_dir, &sources.group_prefix);

    log::info!(
        "snapshot built: {} records, {} groups, {} communes",
        merged.table.len(),
        groups.groups.len(),
        communes.len()
    );

    Ok(Snapshot {
        table: merged.table,
        reports: merged.reports,
        groups: groups.groups,
        group_warnings: groups.warnings,
        communes,
        epoch: EpochToken { reference_hash, built_at: now },
    })
}

/// Holds the current snapshot and decides when it must be rebuilt.
#[derive(Debug)]
pub struct Catalog {
    sources: CatalogSources,
    current: Option<Arc<Snapshot>>,
}

impl Catalog {
    pub fn new(sources: CatalogSources) -> Self {
        Self { sources, current: None }
    }

    /// Rebuild unconditionally. On error the previous snapshot is kept.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> Result<Arc<Snapshot>, LoadError> {
        let snapshot = Arc::new(build_snapshot(&self.sources, now)?);
        self.current = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Drop the current snapshot; the next `get_or_refresh` rebuilds.
    pub fn invalidate(&mut self) {
        if self.current.take().is_some() {
            log::debug!("catalog invalidated");
        }
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.clone()
    }

    /// No snapshot, TTL elapsed, or reference file changed.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        let Some(current) = &self.current else {
            return true;
        };

        let expired = (now - current.epoch.built_at)
            .to_std()
            .is_ok_and(|age| age >= self.sources.ttl);
        if expired {
            log::debug!("cache epoch expired");
            return true;
        }

        match reference_hash(&self.sources.communes_path) {
            Ok(hash) if hash == current.epoch.reference_hash => false,
            Ok(_) => {
                log::info!("commune reference changed; snapshot is stale");
                true
            }
            Err(e) => {
                log::warn!("{e}");
                true
            }
        }
    }

    pub fn get_or_refresh(&mut self, now: DateTime<Utc>) -> Result<Arc<Snapshot>, LoadError> {
        if !self.is_stale(now) {
            if let Some(current) = &self.current {
                return Ok(Arc::clone(current));
            }
        }
        self.refresh(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permis_core::ProjectType;
    use std::fs;

    fn sources(dir: &Path) -> CatalogSources {
        fs::write(
            dir.join("logements.csv"),
            "Code de la commune du lieu des travaux;Année de dépôt;Dénomination d'un demandeur\n\
             31555;2021;NEXITY\n31003;2021;AILLEURS\n",
        )
        .unwrap();
        fs::write(dir.join("communes.csv"), "Code INSEE\n31555\n").unwrap();
        CatalogSources {
            sources: vec![SourceDescriptor::new(dir.join("logements.csv"), ProjectType::Housing)],
            communes_path: dir.join("communes.csv"),
            communes_column: "Code INSEE".into(),
            groups_dir: dir.to_path_buf(),
            group_prefix: "Data PC -".into(),
            years: YearPolicy::default(),
            ttl: Duration::from_secs(60),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn builds_lazily_and_reuses_within_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::new(sources(dir.path()));
        assert!(catalog.snapshot().is_none());
        assert!(catalog.is_stale(at(0)));

        let first = catalog.get_or_refresh(at(0)).unwrap();
        assert_eq!(first.table.len(), 1);
        assert!(first.epoch.reference_hash.starts_with("blake3:"));

        let again = catalog.get_or_refresh(at(30)).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn ttl_expiry_rebuilds() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::new(sources(dir.path()));
        let first = catalog.get_or_refresh(at(0)).unwrap();
        assert!(catalog.is_stale(at(60)));
        let second = catalog.get_or_refresh(at(61)).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.epoch.built_at, at(61));
        assert_eq!(first.table, second.table);
    }

    #[test]
    fn reference_change_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::new(sources(dir.path()));
        catalog.refresh(at(0)).unwrap();
        assert!(!catalog.is_stale(at(1)));

        fs::write(dir.path().join("communes.csv"), "Code INSEE\n31555\n31003\n").unwrap();
        assert!(catalog.is_stale(at(1)));
        assert_eq!(catalog.get_or_refresh(at(1)).unwrap().table.len(), 2);
    }

    #[test]
    fn explicit_invalidation() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::new(sources(dir.path()));
        catalog.refresh(at(0)).unwrap();
        catalog.invalidate();
        assert!(catalog.snapshot().is_none());
        assert!(catalog.is_stale(at(0)));
    }

    #[test]
    fn failed_refresh_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::new(sources(dir.path()));
        catalog.refresh(at(0)).unwrap();

        fs::write(dir.path().join("logements.csv"), [0xFFu8, 0x81, 0x9D]).unwrap();
        assert!(catalog.refresh(at(5)).is_err());
        assert_eq!(catalog.snapshot().unwrap().epoch.built_at, at(0));
    }

    #[test]
    fn absent_reference_hash() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(reference_hash(&dir.path().join("none.csv")).unwrap(), ABSENT_REFERENCE);
    }

    #[test]
    fn snapshot_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Arc<Snapshot>>();
    }
}
