// src/preprocess/policy.rs

use anyhow::{Context, Result};
use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path};

use crate::error::PreprocessError;

/// Policy shipped with the crate; see `policy/perm_columns.yaml`.
pub const DEFAULT_POLICY_YAML: &str = include_str!("../../policy/perm_columns.yaml");

/// How the values of an output column are canonicalized.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Uppercased text.
    #[default]
    Text,
    /// Float64.
    Numeric,
    /// Float64 after removing thousands separators.
    Wage,
    /// Two-letter postal abbreviation.
    State,
    /// Five-digit zero-padded code.
    PostalCode,
    /// One of YR, MTH, BI, WK, HR.
    UnitOfPay,
    /// Lowercase status with underscores.
    Status,
}

impl ColumnKind {
    pub fn arrow_type(&self) -> DataType {
        match self {
            ColumnKind::Numeric | ColumnKind::Wage => DataType::Float64,
            _ => DataType::Utf8,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub kind: ColumnKind,
    /// Filled from the fiscal year in the filename rather than a sheet column.
    #[serde(default)]
    pub from_filename: bool,
    /// Value used for every row of a year whose files lack this column.
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct StatusFilter {
    pub column: String,
    pub exclude: Vec<String>,
}

/// Which columns are kept, what they are called in each year's files, and
/// which case outcomes are dropped.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct ColumnPolicy {
    pub version: u32,
    pub key: String,
    pub status: StatusFilter,
    pub columns: Vec<ColumnSpec>,
}

/// Lowercase and replace spaces with underscores, as applied to raw headers.
pub fn canonical_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Trim, lowercase and replace spaces with underscores, as applied to statuses.
pub fn canonical_status(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

impl ColumnPolicy {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let policy: ColumnPolicy = serde_yaml::from_str(text).context("parsing column policy")?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("loading policy {}", path.display()))
    }

    /// Policy at `path` if given, otherwise the embedded default.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn is_excluded_status(&self, canonical: &str) -> bool {
        self.status
            .exclude
            .iter()
            .any(|s| canonical_status(s) == canonical)
    }

    fn validate(&self) -> Result<(), PreprocessError> {
        let invalid = |msg: String| PreprocessError::InvalidPolicy(msg);

        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name.as_str()) {
                return Err(invalid(format!("duplicate column `{}`", col.name)));
            }
            if !col.from_filename && col.aliases.is_empty() {
                return Err(invalid(format!("column `{}` has no aliases", col.name)));
            }
        }

        let filename_cols = self.columns.iter().filter(|c| c.from_filename).count();
        if filename_cols != 1 {
            return Err(invalid(format!(
                "expected exactly one `from_filename` column, found {}",
                filename_cols
            )));
        }

        for (role, name, kind) in [
            ("key", &self.key, ColumnKind::Text),
            ("status", &self.status.column, ColumnKind::Status),
        ] {
            match self.column(name) {
                Some(c) if c.required && !c.from_filename && c.kind == kind => {}
                Some(c) if c.kind != kind => {
                    return Err(invalid(format!("{} column `{}` must have kind {:?}", role, name, kind)))
                }
                Some(_) => return Err(invalid(format!("{} column `{}` must be required", role, name))),
                None => return Err(invalid(format!("{} column `{}` is not in `columns`", role, name))),
            }
        }
        Ok(())
    }

    /// The column filled from the filename.
    pub fn fiscal_year_column(&self) -> &ColumnSpec {
        self.columns
            .iter()
            .find(|c| c.from_filename)
            .expect("validated policy has a from_filename column")
    }
}

impl Default for ColumnPolicy {
    fn default() -> Self {
        Self::from_yaml(DEFAULT_POLICY_YAML).expect("embedded column policy is valid")
    }
}
