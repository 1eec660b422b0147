use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::ingestion::SkipReason;

#[derive(Error, Debug)]
pub enum WranglerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Unknown text encoding: {0}")]
    UnknownEncoding(String),

    #[error("No CSV/TSV files found in {}", .0.display())]
    NoInputFiles(PathBuf),

    #[error("Could not use source {}: {reason}", path.display())]
    SourceRejected { path: PathBuf, reason: SkipReason },
}

pub type Result<T> = std::result::Result<T, WranglerError>;
