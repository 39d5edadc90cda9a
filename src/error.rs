//src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Everything that can go wrong while analysing FASTQ files.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The file could not be opened, read or decompressed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file decompressed fine but is not well-formed FASTQ.
    #[error("Invalid FASTQ format in {path}: {}", errors.join("; "))]
    InvalidFormat { path: PathBuf, errors: Vec<String> },

    /// A configuration value is missing, unparsable or out of range.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Batch-level: nothing to analyse under the given root.
    #[error("No FASTQ files found under {}", .0.display())]
    NoInputFiles(PathBuf),

    /// Analysis of one file panicked; the batch keeps going.
    #[error("Analysis panicked: {0}")]
    Panicked(String),

    /// Report serialization or writing failed.
    #[error("Report error: {0}")]
    Report(String),
}

impl AnalysisError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(e: csv::Error) -> Self {
        AnalysisError::Report(e.to_string())
    }
}

impl From<std::fmt::Error> for AnalysisError {
    fn from(e: std::fmt::Error) -> Self {
        AnalysisError::Report(e.to_string())
    }
}
