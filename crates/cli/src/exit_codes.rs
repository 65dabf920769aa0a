//! CLI Exit Code Registry
//!
//! Every exit code the `permis` binary can return is defined here. Scripts
//! rely on them, so existing values never change meaning.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                                   |
//! |---------|-----------|-----------------------------------------------|
//! | 0       | Universal | Success (including "no search entered")       |
//! | 1       | Universal | General error (unspecified)                   |
//! | 2       | Universal | CLI usage error (bad args, missing value)     |
//! | 3-9     | config    | Configuration file codes                      |
//! | 10-19   | load      | Source, reference and group file codes        |
//! | 20-29   | output    | Export and stdout write codes                 |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in `CliError` or the command's error handling

use permis_config::ConfigError;
use permis_io::{ExportError, LoadError};

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required values.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Config (3-9)
// =============================================================================

/// Config file exists but cannot be read.
pub const EXIT_CONFIG_READ: u8 = 3;

/// Config file is not valid TOML or has unknown values.
pub const EXIT_CONFIG_PARSE: u8 = 4;

/// Config parsed but failed validation (empty sources, inverted year range).
pub const EXIT_CONFIG_INVALID: u8 = 5;

// =============================================================================
// Load (10-19)
// =============================================================================

/// A present source or reference file cannot be read.
pub const EXIT_LOAD_IO: u8 = 10;

/// Content is neither UTF-8 nor Windows-1252.
pub const EXIT_LOAD_ENCODING: u8 = 11;

/// Malformed CSV structure.
pub const EXIT_LOAD_CSV: u8 = 12;

/// Commune reference file lacks its code column.
pub const EXIT_LOAD_MISSING_COLUMN: u8 = 13;

// =============================================================================
// Output (20-29)
// =============================================================================

/// CSV export or stdout write failed.
pub const EXIT_OUTPUT: u8 = 20;

pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Read { .. } => EXIT_CONFIG_READ,
        ConfigError::Parse(_) => EXIT_CONFIG_PARSE,
        ConfigError::Validation(_) => EXIT_CONFIG_INVALID,
    }
}

pub fn load_exit_code(err: &LoadError) -> u8 {
    match err {
        LoadError::Io { .. } => EXIT_LOAD_IO,
        LoadError::Encoding { .. } => EXIT_LOAD_ENCODING,
        LoadError::Csv { .. } => EXIT_LOAD_CSV,
        LoadError::MissingColumn { .. } => EXIT_LOAD_MISSING_COLUMN,
    }
}

pub fn export_exit_code(_err: &ExportError) -> u8 {
    EXIT_OUTPUT
}
