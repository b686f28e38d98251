// src/preprocess/table.rs

use anyhow::{bail, Context, Result};
use arrow::{
    array::{Array, ArrayRef, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter};
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    path::Path,
    sync::Arc,
};

use crate::preprocess::policy::ColumnPolicy;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Text(Vec<Option<String>>),
    Number(Vec<Option<f64>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.len(),
            ColumnData::Number(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn non_null(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.iter().filter(|x| x.is_some()).count(),
            ColumnData::Number(v) => v.iter().filter(|x| x.is_some()).count(),
        }
    }

    fn data_type(&self) -> DataType {
        match self {
            ColumnData::Text(_) => DataType::Utf8,
            ColumnData::Number(_) => DataType::Float64,
        }
    }

    fn to_array(&self) -> ArrayRef {
        match self {
            ColumnData::Text(v) => Arc::new(v.iter().map(|x| x.as_deref()).collect::<StringArray>()),
            ColumnData::Number(v) => Arc::new(v.iter().copied().collect::<Float64Array>()),
        }
    }

    fn extend_from_array(&mut self, arr: &dyn Array) -> Result<()> {
        match self {
            ColumnData::Text(v) => {
                let arr = arr
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .context("expected Utf8 column")?;
                v.extend(arr.iter().map(|x| x.map(str::to_string)));
            }
            ColumnData::Number(v) => {
                let arr = arr
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .context("expected Float64 column")?;
                v.extend(arr.iter());
            }
        }
        Ok(())
    }
}

/// The normalized PERM table, stored column by column.
#[derive(Debug, Clone, PartialEq)]
pub struct PermTable {
    pub names: Vec<String>,
    pub columns: Vec<ColumnData>,
    /// Columns that never hold nulls.
    pub non_nullable: Vec<String>,
}

impl PermTable {
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(ColumnData::len).unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    pub fn text(&self, name: &str) -> Option<&[Option<String>]> {
        match self.column(name)? {
            ColumnData::Text(v) => Some(v),
            ColumnData::Number(_) => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<&[Option<f64>]> {
        match self.column(name)? {
            ColumnData::Number(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    pub fn schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(
            self.names
                .iter()
                .zip(&self.columns)
                .map(|(name, col)| Field::new(name, col.data_type(), !self.non_nullable.contains(name)))
                .collect::<Vec<_>>(),
        ))
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let arrays = self.columns.iter().map(ColumnData::to_array).collect();
        RecordBatch::try_new(self.schema(), arrays).context("building table record batch")
    }
}

/// Empty table with the policy's columns and types. Only the key, status and
/// fiscal-year columns are non-nullable; `required` is about headers, not cells.
pub fn empty_table(policy: &ColumnPolicy) -> PermTable {
    PermTable {
        names: policy.columns.iter().map(|c| c.name.clone()).collect(),
        columns: policy
            .columns
            .iter()
            .map(|c| match c.kind.arrow_type() {
                DataType::Float64 => ColumnData::Number(Vec::new()),
                _ => ColumnData::Text(Vec::new()),
            })
            .collect(),
        non_nullable: policy
            .columns
            .iter()
            .filter(|c| c.from_filename || c.name == policy.key || c.name == policy.status.column)
            .map(|c| c.name.clone())
            .collect(),
    }
}

/// Write the table as a single Snappy-compressed Parquet file.
pub fn write_table(table: &PermTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let batch = table.to_record_batch()?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), Some(props)).context("creating Arrow writer")?;
    writer.write(&batch).context("writing table batch")?;
    writer.close().context("closing table writer")?;
    Ok(())
}

/// Load a table written by [`write_table`].
pub fn load_table(path: impl AsRef<Path>) -> Result<PermTable> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading Parquet metadata of {}", path.display()))?;
    let schema = builder.schema().clone();

    let mut table = PermTable {
        names: Vec::with_capacity(schema.fields().len()),
        columns: Vec::with_capacity(schema.fields().len()),
        non_nullable: Vec::new(),
    };
    for field in schema.fields() {
        let data = match field.data_type() {
            DataType::Utf8 => ColumnData::Text(Vec::new()),
            DataType::Float64 => ColumnData::Number(Vec::new()),
            other => bail!("column `{}` has unsupported type {}", field.name(), other),
        };
        if !field.is_nullable() {
            table.non_nullable.push(field.name().clone());
        }
        table.names.push(field.name().clone());
        table.columns.push(data);
    }

    for batch in builder.build()? {
        let batch = batch?;
        for (col, arr) in table.columns.iter_mut().zip(batch.columns()) {
            col.extend_from_array(arr.as_ref())?;
        }
    }
    Ok(table)
}
