// src/preprocess/mod.rs
//
// Turns the yearly PERM disclosure spreadsheets into one normalized table.

use anyhow::{Context, Result};
use glob::{glob, Pattern};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{info, warn};

pub mod canonical;
pub mod policy;
pub mod report;
pub mod select;
pub mod sheet;
pub mod table;
pub mod utils;

pub use policy::ColumnPolicy;
pub use select::{select_subset, YearExtract};
pub use sheet::{read_xlsx, RawSheet};
pub use table::{load_table, write_table, ColumnData, PermTable};
pub use utils::fiscal_year_from_filename;

pub const STATUS_COUNTS_FILE: &str = "status_counts.csv";
pub const AVAILABILITY_FILE: &str = "availability.csv";
pub const AVAILABILITY_CANONICAL_FILE: &str = "availability_canonical.csv";
pub const UNRECOGNIZED_FILE: &str = "unrecognized_values.csv";

#[derive(Debug)]
pub struct PreprocessSummary {
    pub files_read: Vec<String>,
    pub files_skipped: Vec<String>,
    pub rows_written: usize,
    pub duplicates_removed: usize,
    pub table_path: PathBuf,
    /// Status counts per fiscal year, over all rows of the input files.
    pub status_counts: BTreeMap<i32, BTreeMap<String, usize>>,
}

/// Spreadsheets in `dir`, sorted by name; Excel lock files (`~$...`) are ignored.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.xlsx", Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("Failed to read glob pattern '{}'", pattern))?
        .filter_map(|entry| entry.ok())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| !n.starts_with("~$"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Sort by `(key, fiscal year)` and keep only the most recent row per key.
///
/// The sort is stable, so within one fiscal year the row read last wins.
pub fn remove_duplicates(
    mut rows: Vec<(i32, Vec<Option<String>>)>,
    key_idx: usize,
) -> (Vec<Vec<Option<String>>>, usize) {
    rows.sort_by(|(fy_a, a), (fy_b, b)| a[key_idx].cmp(&b[key_idx]).then(fy_a.cmp(fy_b)));

    let total = rows.len();
    let mut out: Vec<Vec<Option<String>>> = Vec::with_capacity(total);
    for (_, row) in rows {
        match out.last_mut() {
            Some(last) if last[key_idx] == row[key_idx] => *last = row,
            _ => out.push(row),
        }
    }
    let removed = total - out.len();
    (out, removed)
}

/// Preprocess every spreadsheet in `input_dir` and write the normalized table
/// plus its auxiliary reports to `output_dir`.
#[tracing::instrument(level = "info", skip_all, fields(input = %input_dir.as_ref().display()))]
pub fn preprocess_directory(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    policy: &ColumnPolicy,
) -> Result<PreprocessSummary> {
    let input_dir = input_dir.as_ref();
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir).with_context(|| format!("creating {}", output_dir.display()))?;
    info!(input = %input_dir.display(), output = %output_dir.display(), policy_version = policy.version, "preprocessing");

    let key_idx = policy.index_of(&policy.key).context("policy key column")?;
    let column_names = policy.column_names();
    let start = Instant::now();

    let mut files_read = Vec::new();
    let mut files_skipped = Vec::new();
    let mut status_counts: BTreeMap<i32, BTreeMap<String, usize>> = BTreeMap::new();
    let mut by_year: BTreeMap<i32, Vec<Vec<Option<String>>>> = BTreeMap::new();

    for path in discover_inputs(input_dir)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let Some(fiscal_year) = fiscal_year_from_filename(&name) else {
            warn!(file = %name, "skipping: filename does not contain a fiscal year");
            files_skipped.push(name);
            continue;
        };

        info!(file = %name, fiscal_year, "reading");
        let sheet = read_xlsx(&path, Some(output_dir))?;
        let extract = select_subset(&sheet, fiscal_year, &name, policy)?;
        info!(
            file = %name,
            rows = sheet.num_rows(),
            kept = extract.rows.len(),
            "selected subset"
        );

        let counts = status_counts.entry(fiscal_year).or_default();
        for (status, n) in extract.status_counts {
            *counts.entry(status).or_default() += n;
        }
        by_year.entry(fiscal_year).or_default().extend(extract.rows);
        files_read.push(name);
    }

    if files_read.is_empty() {
        warn!(dir = %input_dir.display(), "no spreadsheets with a fiscal year found");
    }

    // Per-year extracts and availability before value canonicalization.
    let mut availability_raw = BTreeMap::new();
    for (fy, rows) in &by_year {
        availability_raw.insert(*fy, select::availability(rows, column_names.len()));
        let extract = RawSheet::new(column_names.iter().map(|c| c.to_string()).collect(), rows.clone());
        sheet::write_raw_parquet(&extract, &output_dir.join(format!("perm_FY{}.parquet", fy)))?;
    }

    info!("normalizing data and writing output files");
    let all_rows: Vec<(i32, Vec<Option<String>>)> = by_year
        .into_iter()
        .flat_map(|(fy, rows)| rows.into_iter().map(move |r| (fy, r)))
        .collect();
    let (rows, duplicates_removed) = remove_duplicates(all_rows, key_idx);
    if duplicates_removed > 0 {
        info!(duplicates_removed, "kept the most recent fiscal year for repeated case numbers");
    }

    let (table, unrecognized) = canonical::canonicalize_rows(&rows, policy);
    if !unrecognized.is_empty() {
        let total: usize = unrecognized.values().sum();
        warn!(values = total, distinct = unrecognized.len(), "values could not be canonicalized");
    }

    let table_path = output_dir.join(crate::config::TABLE_FILE);
    write_table(&table, &table_path)?;

    // Status counts include rows later removed as duplicates.
    report::write_status_counts(&output_dir.join(STATUS_COUNTS_FILE), &status_counts)?;
    report::write_availability(&output_dir.join(AVAILABILITY_FILE), &column_names, &availability_raw)?;
    let availability_canonical =
        report::availability_by_year(&table, &policy.fiscal_year_column().name);
    report::write_availability(
        &output_dir.join(AVAILABILITY_CANONICAL_FILE),
        &column_names,
        &availability_canonical,
    )?;
    report::write_unrecognized(&output_dir.join(UNRECOGNIZED_FILE), &unrecognized)?;

    info!(
        rows = table.num_rows(),
        path = %table_path.display(),
        elapsed = ?start.elapsed(),
        "wrote normalized table"
    );

    Ok(PreprocessSummary {
        files_read,
        files_skipped,
        rows_written: table.num_rows(),
        duplicates_removed,
        table_path,
        status_counts,
    })
}
