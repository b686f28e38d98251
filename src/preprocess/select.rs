// src/preprocess/select.rs

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::error::PreprocessError;
use crate::preprocess::{
    policy::{canonical_header, canonical_status, ColumnPolicy},
    sheet::RawSheet,
};

/// Status label used for rows with an empty status cell.
pub const MISSING_STATUS: &str = "<missing>";

/// One fiscal year reduced to the policy's columns, before value canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub struct YearExtract {
    pub fiscal_year: i32,
    /// Rows in policy column order.
    pub rows: Vec<Vec<Option<String>>>,
    /// Count of every canonical status in the file, kept or not.
    pub status_counts: BTreeMap<String, usize>,
    /// Share of non-null values per policy column among the kept rows.
    pub availability: Vec<f64>,
    /// Policy columns the file does not provide.
    pub missing_columns: Vec<String>,
    /// Rows dropped because the key column was empty.
    pub rows_without_key: usize,
}

/// Where each policy column comes from in one file.
#[derive(Debug, Clone, PartialEq)]
enum Source {
    Sheet(usize),
    FiscalYear,
    Default(String),
    Absent,
}

fn resolve_sources(
    sheet: &RawSheet,
    policy: &ColumnPolicy,
    file: &str,
    fiscal_year: i32,
) -> Result<(Vec<Source>, Vec<String>), PreprocessError> {
    let by_header: HashMap<String, usize> = sheet
        .headers
        .iter()
        .enumerate()
        .rev()
        .map(|(i, h)| (canonical_header(h), i))
        .collect();

    let mut sources = Vec::with_capacity(policy.columns.len());
    let mut missing = Vec::new();
    for col in &policy.columns {
        if col.from_filename {
            sources.push(Source::FiscalYear);
            continue;
        }
        match col.aliases.iter().find_map(|a| by_header.get(a.as_str())) {
            Some(&idx) => {
                debug!(column = %col.name, source = %sheet.headers[idx], "resolved column");
                sources.push(Source::Sheet(idx));
            }
            None if col.required => {
                return Err(PreprocessError::MissingRequiredColumn {
                    file: file.to_string(),
                    fiscal_year,
                    column: col.name.clone(),
                    aliases: col.aliases.clone(),
                })
            }
            None => {
                missing.push(col.name.clone());
                sources.push(match &col.default {
                    Some(value) => Source::Default(value.clone()),
                    None => Source::Absent,
                });
            }
        }
    }
    Ok((sources, missing))
}

/// Keep the policy's columns and drop rows whose status is excluded or empty.
///
/// A required column that none of its aliases resolve is an error; other
/// missing columns take their policy default (or null) for the whole year.
pub fn select_subset(
    sheet: &RawSheet,
    fiscal_year: i32,
    file: &str,
    policy: &ColumnPolicy,
) -> Result<YearExtract, PreprocessError> {
    let (sources, missing_columns) = resolve_sources(sheet, policy, file, fiscal_year)?;
    if !missing_columns.is_empty() {
        warn!(file, fiscal_year, missing = ?missing_columns, "columns not present this year");
    }

    // Both are required, so resolve_sources gave them a sheet index.
    let status_idx = policy.index_of(&policy.status.column);
    let key_idx = policy.index_of(&policy.key);

    let year = fiscal_year.to_string();
    let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut rows = Vec::new();
    let mut rows_without_key = 0;

    for raw in &sheet.rows {
        let row: Vec<Option<String>> = sources
            .iter()
            .map(|src| match src {
                Source::Sheet(i) => raw[*i].clone(),
                Source::FiscalYear => Some(year.clone()),
                Source::Default(v) => Some(v.clone()),
                Source::Absent => None,
            })
            .collect();

        let status = status_idx
            .and_then(|i| row[i].as_deref())
            .map(canonical_status)
            .filter(|s| !s.is_empty());
        let label = status.clone().unwrap_or_else(|| MISSING_STATUS.to_string());
        *status_counts.entry(label).or_default() += 1;

        let Some(status) = status else { continue };
        if policy.is_excluded_status(&status) {
            continue;
        }
        if key_idx.and_then(|i| row[i].as_ref()).is_none() {
            rows_without_key += 1;
            continue;
        }

        let mut row = row;
        if let Some(i) = status_idx {
            row[i] = Some(status);
        }
        rows.push(row);
    }

    if rows_without_key > 0 {
        warn!(file, fiscal_year, rows_without_key, "dropped rows without a case number");
    }

    let availability = availability(&rows, policy.columns.len());

    Ok(YearExtract {
        fiscal_year,
        rows,
        status_counts,
        availability,
        missing_columns,
        rows_without_key,
    })
}

/// Share of non-null values in each of `width` columns; 0 when there are no rows.
pub fn availability(rows: &[Vec<Option<String>>], width: usize) -> Vec<f64> {
    (0..width)
        .map(|c| {
            if rows.is_empty() {
                0.0
            } else {
                rows.iter().filter(|r| r[c].is_some()).count() as f64 / rows.len() as f64
            }
        })
        .collect()
}
