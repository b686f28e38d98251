// src/preprocess/report.rs

use anyhow::{Context, Result};
use csv::Writer;
use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use crate::preprocess::{
    canonical::Unrecognized,
    table::{ColumnData, PermTable},
};

/// `FY,<status>...` with one row per fiscal year; statuses are the union over all years.
pub fn write_status_counts(path: &Path, counts: &BTreeMap<i32, BTreeMap<String, usize>>) -> Result<()> {
    let statuses: BTreeSet<&str> = counts
        .values()
        .flat_map(|m| m.keys().map(String::as_str))
        .collect();

    let mut wtr = Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(std::iter::once("FY").chain(statuses.iter().copied()))?;
    for (fy, per_status) in counts {
        let mut record = vec![fy.to_string()];
        record.extend(
            statuses
                .iter()
                .map(|s| per_status.get(*s).copied().unwrap_or(0).to_string()),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// `FY,<column>...` with the share of non-null values per column and year.
pub fn write_availability(path: &Path, columns: &[&str], ratios: &BTreeMap<i32, Vec<f64>>) -> Result<()> {
    let mut wtr = Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(std::iter::once("FY").chain(columns.iter().copied()))?;
    for (fy, values) in ratios {
        let mut record = vec![fy.to_string()];
        record.extend(values.iter().map(|v| format!("{:.4}", v)));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Availability per fiscal year computed from the canonicalized table.
///
/// This cannot tell a column missing from a year's files from one whose
/// values were all rejected.
pub fn availability_by_year(table: &PermTable, fiscal_year_column: &str) -> BTreeMap<i32, Vec<f64>> {
    let mut rows_by_year: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    if let Some(years) = table.number(fiscal_year_column) {
        for (row, fy) in years.iter().enumerate() {
            if let Some(fy) = fy {
                rows_by_year.entry(*fy as i32).or_default().push(row);
            }
        }
    }

    rows_by_year
        .into_iter()
        .map(|(fy, rows)| {
            let ratios = table
                .columns
                .iter()
                .map(|col| {
                    let present = rows
                        .iter()
                        .filter(|&&r| match col {
                            ColumnData::Text(v) => v[r].is_some(),
                            ColumnData::Number(v) => v[r].is_some(),
                        })
                        .count();
                    present as f64 / rows.len() as f64
                })
                .collect();
            (fy, ratios)
        })
        .collect()
}

/// `column,value,count`, most frequent first within each column.
pub fn write_unrecognized(path: &Path, unrecognized: &Unrecognized) -> Result<()> {
    let mut entries: Vec<(&(String, String), &usize)> = unrecognized.iter().collect();
    entries.sort_by(|a, b| a.0 .0.cmp(&b.0 .0).then(b.1.cmp(a.1)).then(a.0 .1.cmp(&b.0 .1)));

    let mut wtr = Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(["column", "value", "count"])?;
    for ((column, value), count) in entries {
        wtr.write_record([column.as_str(), value.as_str(), count.to_string().as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn status_counts_use_union_of_statuses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("status_counts.csv");
        let mut counts = BTreeMap::new();
        counts.insert(2020, BTreeMap::from([("certified".to_string(), 3), ("denied".to_string(), 1)]));
        counts.insert(2021, BTreeMap::from([("withdrawn".to_string(), 2)]));
        write_status_counts(&path, &counts)?;

        let text = fs::read_to_string(&path)?;
        assert_eq!(
            text,
            "FY,certified,denied,withdrawn\n2020,3,1,0\n2021,0,0,2\n"
        );
        Ok(())
    }

    #[test]
    fn availability_groups_by_year() {
        let table = PermTable {
            names: vec!["fiscal_year".into(), "job_state".into()],
            columns: vec![
                ColumnData::Number(vec![Some(2020.0), Some(2020.0), Some(2021.0)]),
                ColumnData::Text(vec![Some("CA".into()), None, None]),
            ],
            non_nullable: vec![],
        };
        let ratios = availability_by_year(&table, "fiscal_year");
        assert_eq!(ratios[&2020], vec![1.0, 0.5]);
        assert_eq!(ratios[&2021], vec![1.0, 0.0]);
    }

    #[test]
    fn unrecognized_sorted_by_frequency() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("unrecognized_values.csv");
        let mut bad = Unrecognized::new();
        bad.insert(("job_state".into(), "ONTARIO".into()), 1);
        bad.insert(("job_state".into(), "BC".into()), 4);
        write_unrecognized(&path, &bad)?;
        assert_eq!(
            fs::read_to_string(&path)?,
            "column,value,count\njob_state,BC,4\njob_state,ONTARIO,1\n"
        );
        Ok(())
    }
}
