// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the fetch step that the caller has to treat as fatal.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    #[error("{filename} is listed in the checksum manifest but missing from {dir}")]
    MissingFile { filename: String, dir: PathBuf },

    #[error("no checksum recorded for {filename}")]
    MissingChecksum { filename: String },

    #[error("checksum manifest line {line}: {reason}")]
    BadManifestLine { line: usize, reason: String },

    #[error("cannot derive a filename from URL {0}")]
    NoFilename(String),

    #[error("{failed} of {total} downloads failed")]
    DownloadsFailed { failed: usize, total: usize },
}

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("{file} (FY{fiscal_year}): required column `{column}` not found under any of {aliases:?}")]
    MissingRequiredColumn {
        file: String,
        fiscal_year: i32,
        column: String,
        aliases: Vec<String>,
    },

    #[error("{0} has no worksheets")]
    EmptyWorkbook(PathBuf),

    #[error("column policy: {0}")]
    InvalidPolicy(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartographyError {
    #[error("unknown colormap `{0}`")]
    UnknownColormap(String),

    #[error("invalid color `{0}`")]
    InvalidColor(String),
}
