// src/preprocess/sheet.rs

use anyhow::{Context, Result};
use arrow::{
    array::{Array, ArrayRef, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use calamine::{open_workbook_auto, Data, Reader};
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter};
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    collections::HashSet,
    fs::{self, File},
    path::Path,
    sync::Arc,
};
use tracing::{debug, info};

use crate::error::PreprocessError;
use crate::preprocess::utils::clean_str;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSheet {
    /// Column names from the first row, made unique (`NAME`, `NAME.1`, ...).
    pub headers: Vec<String>,
    /// Remaining rows, one optional string per header.
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawSheet {
    /// Build a sheet, padding or truncating every row to the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let headers = unique_headers(headers);
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Store every column as nullable Utf8.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let schema = Arc::new(Schema::new(
            self.headers
                .iter()
                .map(|h| Field::new(h, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        ));
        let columns: Vec<ArrayRef> = (0..self.headers.len())
            .map(|i| {
                let arr: StringArray = self.rows.iter().map(|row| row[i].as_deref()).collect();
                Arc::new(arr) as ArrayRef
            })
            .collect();
        RecordBatch::try_new(schema, columns).context("building raw sheet batch")
    }

    pub fn append_record_batch(&mut self, batch: &RecordBatch) -> Result<()> {
        let cols = (0..batch.num_columns())
            .map(|i| {
                batch
                    .column(i)
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .with_context(|| format!("raw sheet column {} is not Utf8", i))
            })
            .collect::<Result<Vec<_>>>()?;
        for row in 0..batch.num_rows() {
            self.rows.push(
                cols.iter()
                    .map(|c| (!c.is_null(row)).then(|| c.value(row).to_string()))
                    .collect(),
            );
        }
        Ok(())
    }
}

fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| {
            let base = if h.trim().is_empty() {
                format!("unnamed_{}", i)
            } else {
                h.trim().to_string()
            };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

/// Spreadsheet cell as text. Integral floats drop the fractional part so that
/// case numbers and postal codes stored as numbers read back as written.
pub fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => clean_str(s),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        other => clean_str(&other.to_string()),
    }
}

/// Read the first worksheet of a spreadsheet.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_spreadsheet(path: impl AsRef<Path>) -> Result<RawSheet> {
    let path = path.as_ref();
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("opening {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PreprocessError::EmptyWorkbook(path.to_path_buf()))?
        .with_context(|| format!("reading first worksheet of {}", path.display()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .map(|c| cell_to_string(c).unwrap_or_default())
            .collect(),
        None => return Ok(RawSheet::default()),
    };
    let data: Vec<Vec<Option<String>>> = rows
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    let sheet = RawSheet::new(headers, data);
    debug!(columns = sheet.headers.len(), rows = sheet.num_rows(), "read worksheet");
    Ok(sheet)
}

/// Read a spreadsheet, reusing `<cache_dir>/<stem>.raw.parquet` when present
/// and writing it otherwise.
pub fn read_xlsx(path: impl AsRef<Path>, cache_dir: Option<&Path>) -> Result<RawSheet> {
    let path = path.as_ref();
    let cache_file = cache_dir.and_then(|dir| {
        path.file_stem()
            .map(|stem| dir.join(format!("{}.raw.parquet", stem.to_string_lossy())))
    });

    if let Some(cache) = cache_file.as_deref().filter(|c| c.is_file()) {
        info!(cache = %cache.display(), "using cached sheet");
        return read_raw_parquet(cache);
    }

    let sheet = read_spreadsheet(path)?;
    if let Some(cache) = cache_file {
        write_raw_parquet(&sheet, &cache)?;
    }
    Ok(sheet)
}

pub fn write_raw_parquet(sheet: &RawSheet, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let batch = sheet.to_record_batch()?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer for raw sheet")?;
    writer.write(&batch).context("writing raw sheet")?;
    writer.close().context("closing raw sheet writer")?;
    Ok(())
}

pub fn read_raw_parquet(path: &Path) -> Result<RawSheet> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let headers = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let mut sheet = RawSheet::new(headers, Vec::new());
    for batch in builder.build()? {
        sheet.append_record_batch(&batch?)?;
    }
    Ok(sheet)
}
