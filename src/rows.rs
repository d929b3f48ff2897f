//! Row batches: parsing CSV payloads into rows and writing reconciled rows back out.
//!
//! A [`RowBatch`] is fully materialized. Every row is keyed by the header
//! names, and every cell starts life as [`Value::Text`] holding the raw field.
//! [`validate_and_transform_csv()`] chains parsing, inference and
//! reconciliation into the single call the ingestion pipeline uses.

use std::{
    collections::{HashMap, HashSet},
    io::{Read, Write},
};

use anyhow::{Context, Result, bail};
use encoding_rs::{Encoding, UTF_8};
use log::debug;
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    data::Value,
    infer::infer_schema,
    io_utils,
    reconcile::{ReconcileLog, ReconcileSummary, reconcile},
    schema::Schema,
};

pub type Row = HashMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBatch {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowBatch {
    pub fn new(headers: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                bail!("Duplicate column '{header}' in header row");
            }
        }
        Ok(Self {
            headers,
            rows: Vec::new(),
        })
    }

    pub fn from_csv_str(text: &str, delimiter: u8) -> Result<Self> {
        Self::from_reader(text.as_bytes(), delimiter, UTF_8)
    }

    pub fn from_reader<R>(reader: R, delimiter: u8, encoding: &'static Encoding) -> Result<Self>
    where
        R: Read,
    {
        let mut reader = io_utils::open_csv_reader(reader, delimiter);
        let headers = io_utils::reader_headers(&mut reader, encoding)?;
        if headers.is_empty() {
            bail!("Input contains no header row");
        }
        let mut batch = Self::new(headers)?;
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
            let decoded = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {}", row_idx + 2))?;
            batch.push_record(decoded)?;
        }
        debug!(
            "Parsed {} row(s) across {} column(s)",
            batch.rows.len(),
            batch.headers.len()
        );
        Ok(batch)
    }

    pub fn push_record(&mut self, record: Vec<String>) -> Result<()> {
        if record.len() != self.headers.len() {
            bail!(
                "Row {} has {} field(s) but the header has {}",
                self.rows.len() + 2,
                record.len(),
                self.headers.len()
            );
        }
        let row = self
            .headers
            .iter()
            .cloned()
            .zip(record.into_iter().map(Value::Text))
            .collect();
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of row `idx` rendered in header order.
    pub fn record(&self, idx: usize) -> Option<Vec<String>> {
        let row = self.rows.get(idx)?;
        Some(
            self.headers
                .iter()
                .map(|header| row.get(header).map(Value::as_display).unwrap_or_default())
                .collect(),
        )
    }
}

/// Outcome of [`validate_and_transform_csv()`].
#[derive(Debug, Clone)]
pub struct ReconciledBatch {
    pub schema: Schema,
    pub batch: RowBatch,
    pub summary: ReconcileSummary,
}

/// Parses `text`, infers its schema and reconciles it against `expected`.
pub fn validate_and_transform_csv(
    text: &str,
    delimiter: u8,
    expected: &Schema,
    log: &dyn ReconcileLog,
) -> Result<ReconciledBatch> {
    let batch = RowBatch::from_csv_str(text, delimiter)?;
    reconcile_batch(batch, expected, log)
}

pub fn reconcile_batch(
    mut batch: RowBatch,
    expected: &Schema,
    log: &dyn ReconcileLog,
) -> Result<ReconciledBatch> {
    let mut schema = infer_schema(&batch);
    let summary = reconcile(&mut schema, expected, &mut batch.rows, log)?;
    debug!("Schema validation and transformation passed");
    Ok(ReconciledBatch {
        schema,
        batch,
        summary,
    })
}

pub fn write_csv<W>(batch: &RowBatch, writer: &mut csv::Writer<W>) -> Result<()>
where
    W: Write,
{
    writer
        .write_record(batch.headers.iter())
        .context("Writing output headers")?;
    for idx in 0..batch.rows.len() {
        if let Some(record) = batch.record(idx) {
            writer
                .write_record(record.iter())
                .with_context(|| format!("Writing row {}", idx + 2))?;
        }
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(())
}

struct OrderedRow<'a> {
    headers: &'a [String],
    row: &'a Row,
}

impl Serialize for OrderedRow<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for header in self.headers {
            map.serialize_entry(header, self.row.get(header).unwrap_or(&Value::Null))?;
        }
        map.end()
    }
}

pub fn write_json_lines<W>(batch: &RowBatch, mut writer: W) -> Result<()>
where
    W: Write,
{
    for (idx, row) in batch.rows.iter().enumerate() {
        let ordered = OrderedRow {
            headers: &batch.headers,
            row,
        };
        serde_json::to_writer(&mut writer, &ordered)
            .with_context(|| format!("Serializing row {} as JSON", idx + 1))?;
        writer.write_all(b"\n").context("Writing JSON line")?;
    }
    writer.flush().context("Flushing JSON output")?;
    Ok(())
}
