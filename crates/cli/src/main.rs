// permis CLI - load, search and summarize building-permit exports

mod exit_codes;
mod render;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use permis_config::{ConfigError, PipelineSettings};
use permis_core::stats::{DEFAULT_TOP_APPLICANT_THRESHOLD, DEFAULT_TOP_LOCALITIES};
use permis_core::{search, PermitRecord, SearchMode, SearchOutcome, SearchQuery};
use permis_io::{Catalog, CatalogSources, ExportError, LoadError, Snapshot};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use exit_codes::{
    config_exit_code, export_exit_code, load_exit_code, EXIT_ERROR, EXIT_OUTPUT, EXIT_SUCCESS,
    EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "permis")]
#[command(about = "Harmonize, filter and search building-permit exports")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Pipeline config file (default: the user config dir's permis/permis.toml, if present)
    #[arg(long, short = 'c', global = true, env = "PERMIS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the exports; overrides data_dir from the config
    #[arg(long, global = true, env = "PERMIS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log more (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the unified table and report per-source diagnostics
    #[command(after_help = "\
Examples:
  permis load
  permis load --data-dir ./exports
  permis load --json | jq '.sources[].status'")]
    Load {
        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Search the unified table; matching records are written as CSV
    #[command(after_help = "\
Examples:
  permis search all -o permis.csv
  permis search name 'lp promotion'
  permis search siren 401234567
  permis search siret 00018 --json
  permis search group NEXITY

Free-text queries shorter than 2 characters are not run.")]
    Search {
        /// What to match on
        mode: ModeArg,

        /// Query text, or the group name for `group`
        value: Option<String>,

        /// Write matches to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Machine-readable output
        #[arg(long)]
        json: bool,

        /// Show at most this many records (JSON only; CSV export is never truncated)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List corporate groups found in the data directory
    #[command(after_help = "\
Examples:
  permis groups
  permis groups --json")]
    Groups {
        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Aggregate statistics over the table or over a search result
    #[command(after_help = "\
Examples:
  permis stats
  permis stats group NEXITY --top 5
  permis stats name cogedim --threshold 1 --json")]
    Stats {
        /// Restrict to a search (default: every record)
        mode: Option<ModeArg>,

        /// Query text for the search
        value: Option<String>,

        /// Number of localities to rank
        #[arg(long, default_value_t = DEFAULT_TOP_LOCALITIES)]
        top: usize,

        /// Minimum filings for an applicant to be ranked
        #[arg(long, default_value_t = DEFAULT_TOP_APPLICANT_THRESHOLD)]
        threshold: usize,

        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Check the config and show the resolved input paths
    #[command(after_help = "\
Examples:
  permis validate
  permis validate --config ./permis.toml")]
    Validate {
        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    All,
    Name,
    Siren,
    Siret,
    Group,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::All => SearchMode::All,
            ModeArg::Name => SearchMode::Name,
            ModeArg::Siren => SearchMode::Siren,
            ModeArg::Siret => SearchMode::Siret,
            ModeArg::Group => SearchMode::Group,
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("PERMIS_COMMIT"),
        ")",
        "\ntarget:  ",
        env!("PERMIS_TARGET"),
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    // The fmt subscriber also captures `log` records from the library crates.
    // try_init only fails when a global subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = resolve_settings(cli.config.as_deref(), cli.data_dir.as_deref()).and_then(
        |settings| match cli.command {
            Commands::Load { json } => cmd_load(&settings, json),
            Commands::Search { mode, value, output, json, limit } => {
                cmd_search(&settings, mode, value, output, json, limit)
            }
            Commands::Groups { json } => cmd_groups(&settings, json),
            Commands::Stats { mode, value, top, threshold, json } => {
                cmd_stats(&settings, mode, value, top, threshold, json)
            }
            Commands::Validate { json } => cmd_validate(&settings, json),
        },
    );

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn output(err: io::Error) -> Self {
        Self { code: EXIT_OUTPUT, message: format!("cannot write output: {err}"), hint: None }
    }

    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Read { .. } => Some("pass --config <file> or omit it to use built-in defaults"),
            ConfigError::Parse(_) | ConfigError::Validation(_) => None,
        };
        Self {
            code: config_exit_code(&err),
            message: err.to_string(),
            hint: hint.map(String::from),
        }
    }

    pub fn load(err: LoadError) -> Self {
        let hint = match &err {
            LoadError::Encoding { .. } => Some("re-export the file as UTF-8 or Windows-1252 CSV"),
            LoadError::MissingColumn { .. } => Some("set communes_column in the config to the code column's header"),
            LoadError::Csv { .. } => Some("permit exports must be ';'-delimited"),
            LoadError::Io { .. } => None,
        };
        Self {
            code: load_exit_code(&err),
            message: err.to_string(),
            hint: hint.map(String::from),
        }
    }

    pub fn export(err: ExportError) -> Self {
        Self { code: export_exit_code(&err), message: err.to_string(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Settings and snapshot
// ============================================================================

fn resolve_settings(
    config: Option<&Path>,
    data_dir: Option<&Path>,
) -> Result<PipelineSettings, CliError> {
    let mut settings = match config {
        Some(path) => PipelineSettings::load(path).map_err(CliError::config)?,
        None => {
            let default = PipelineSettings::config_path();
            if default.exists() {
                PipelineSettings::load(&default).map_err(CliError::config)?
            } else {
                log::info!("no config at {}, using defaults", default.display());
                PipelineSettings::with_base_dir(".")
            }
        }
    };

    if let Some(dir) = data_dir {
        // Relative to the working directory, not to the config file
        let cwd = std::env::current_dir()
            .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;
        settings.set_data_dir(cwd.join(dir));
    }

    Ok(settings)
}

fn build(settings: &PipelineSettings) -> Result<Arc<Snapshot>, CliError> {
    let mut catalog = Catalog::new(CatalogSources::from_settings(settings));
    catalog.get_or_refresh(chrono::Utc::now()).map_err(CliError::load)
}

fn build_query(mode: ModeArg, value: Option<String>) -> Result<SearchQuery, CliError> {
    match (mode, value) {
        (ModeArg::All, _) => Ok(SearchQuery::All),
        (ModeArg::Group, None) => Err(CliError::args("group search needs a group name")
            .with_hint("list available groups with `permis groups`")),
        (mode, value) => Ok(SearchQuery::new(mode.into(), value.unwrap_or_default())),
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;
    let mut out = io::stdout().lock();
    writeln!(out, "{}", text).map_err(CliError::output)
}

// ============================================================================
// load
// ============================================================================

fn cmd_load(settings: &PipelineSettings, json: bool) -> Result<(), CliError> {
    let snap = build(settings)?;

    if json {
        return print_json(&serde_json::json!({
            "records": snap.table.len(),
            "communes": snap.communes.len(),
            "groups": snap.groups.len(),
            "epoch": snap.epoch,
            "sources": snap.reports,
            "group_warnings": snap.group_warnings,
        }));
    }

    let mut out = io::stdout().lock();
    render::load_report(&mut out, &snap).map_err(CliError::output)
}

// ============================================================================
// search
// ============================================================================

fn cmd_search(
    settings: &PipelineSettings,
    mode: ModeArg,
    value: Option<String>,
    output: Option<PathBuf>,
    json: bool,
    limit: Option<usize>,
) -> Result<(), CliError> {
    let query = build_query(mode, value)?;
    let snap = build(settings)?;

    if let SearchQuery::Group(name) = &query {
        if !snap.groups.contains_key(name) {
            log::warn!("no group named {name:?}; known groups: {}", snap.groups.len());
        }
    }

    let outcome = search(&snap.table, &snap.groups, &query);
    let records: Vec<&PermitRecord> = match outcome {
        SearchOutcome::NoQuery => {
            if json {
                return print_json(&serde_json::json!({ "status": "no_query", "mode": query.mode() }));
            }
            eprintln!("no search entered ({} queries need at least 2 characters)", query.mode());
            return Ok(());
        }
        SearchOutcome::Results(records) => records,
    };

    if let Some(path) = &output {
        permis_io::export::export_csv(records.iter().copied(), path).map_err(CliError::export)?;
        eprintln!("{} records written to {}", records.len(), path.display());
        return Ok(());
    }

    if json {
        let shown = &records[..limit.unwrap_or(records.len()).min(records.len())];
        return print_json(&serde_json::json!({
            "status": "results",
            "mode": query.mode(),
            "count": records.len(),
            "records": shown,
        }));
    }

    if records.is_empty() {
        eprintln!("no matching records");
    }
    let out = io::stdout().lock();
    permis_io::export::write_csv(records.iter().copied(), out).map_err(CliError::export)
}

// ============================================================================
// groups
// ============================================================================

fn cmd_groups(settings: &PipelineSettings, json: bool) -> Result<(), CliError> {
    let load = permis_io::load_groups(&settings.data_dir(), &settings.group_prefix);

    if json {
        let groups: Vec<_> = load
            .groups
            .values()
            .map(|g| {
                serde_json::json!({
                    "name": g.name,
                    "keyword": g.keyword,
                    "identifiers": g.identifiers,
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "groups": groups,
            "warnings": load.warnings,
        }));
    }

    for w in &load.warnings {
        eprintln!("warning: {}: {}", w.file.display(), w.message);
    }
    if load.groups.is_empty() {
        eprintln!(
            "no group files matching '{}<name>.csv' in {}",
            settings.group_prefix,
            settings.data_dir().display()
        );
    }
    let mut out = io::stdout().lock();
    render::groups(&mut out, &load.groups).map_err(CliError::output)
}

// ============================================================================
// stats
// ============================================================================

fn cmd_stats(
    settings: &PipelineSettings,
    mode: Option<ModeArg>,
    value: Option<String>,
    top: usize,
    threshold: usize,
    json: bool,
) -> Result<(), CliError> {
    let query = build_query(mode.unwrap_or(ModeArg::All), value)?;
    let snap = build(settings)?;

    let records = match search(&snap.table, &snap.groups, &query) {
        SearchOutcome::NoQuery => {
            return Err(CliError::args("no search entered")
                .with_hint("free-text queries need at least 2 characters"));
        }
        SearchOutcome::Results(records) => records,
    };

    let report = render::StatsReport::compute(&records, top, threshold);
    if json {
        return print_json(&report);
    }
    let mut out = io::stdout().lock();
    render::stats(&mut out, &report).map_err(CliError::output)
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(settings: &PipelineSettings, json: bool) -> Result<(), CliError> {
    settings.validate().map_err(CliError::config)?;

    let communes = settings.communes_path();
    let sources = settings.source_paths();

    if json {
        let sources: Vec<_> = sources
            .iter()
            .map(|(path, pt)| {
                serde_json::json!({
                    "project_type": pt,
                    "path": path,
                    "exists": path.exists(),
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "valid": true,
            "data_dir": settings.data_dir(),
            "communes_file": { "path": communes, "exists": communes.exists() },
            "communes_column": settings.communes_column,
            "group_prefix": settings.group_prefix,
            "year_range": settings.year_range,
            "cache_ttl_secs": settings.cache_ttl_secs,
            "sources": sources,
        }));
    }

    let mut out = io::stdout().lock();
    render::validation(&mut out, settings, &communes, &sources).map_err(CliError::output)
}
