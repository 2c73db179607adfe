//! Error types for host telemetry collection.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while sampling host statistics.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The requested mount path does not exist.
    #[error("Mount path not found: {0}")]
    MountNotFound(String),

    /// The filesystem query for an existing path failed.
    #[error("Failed to query filesystem usage for {path}: {reason}")]
    DiskQuery { path: String, reason: String },

    /// A proc file could not be read.
    #[error("Failed to read {path}: {source}")]
    ProcRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A proc file was readable but not in the expected format.
    #[error("Malformed {file}: {reason}")]
    ProcParse { file: &'static str, reason: String },

    /// The platform did not report a required statistic.
    #[error("Statistic unavailable: {0}")]
    Unavailable(&'static str),
}

/// Result type for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;
