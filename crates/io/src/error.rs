use std::path::PathBuf;

/// Fatal load failures. Anything that can be isolated to one row or one
/// optional file is counted in the load diagnostics instead.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// File exists but cannot be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Neither UTF-8 nor Windows-1252 decodes the content.
    #[error("{}: content is neither UTF-8 nor Windows-1252", path.display())]
    Encoding { path: PathBuf },
    /// CSV structure error.
    #[error("{}: malformed CSV: {message}", path.display())]
    Csv { path: PathBuf, message: String },
    /// Required column absent from a reference file.
    #[error("{}: missing column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
