// src/config.rs

use std::{env, path::PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data/dol_perm";
pub const TABLE_FILE: &str = "perm.parquet";

/// Runtime locations, read from `PERMMAPS_*` environment variables with
/// repository-relative defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Where the fetcher stores spreadsheets and the preprocessor reads them.
    pub data_dir: PathBuf,
    /// Where preprocessing outputs go; same as `data_dir` unless overridden.
    pub output_dir: PathBuf,
    /// Replacement for the embedded column policy.
    pub policy_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            output_dir: PathBuf::from(DEFAULT_DATA_DIR),
            policy_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = non_empty("PERMMAPS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let output_dir = non_empty("PERMMAPS_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.clone());
        let policy_path = non_empty("PERMMAPS_POLICY").map(PathBuf::from);

        Self {
            data_dir,
            output_dir,
            policy_path,
        }
    }

    pub fn table_path(&self) -> PathBuf {
        self.output_dir.join(TABLE_FILE)
    }
}
