//! Reconciliation of an extracted schema against an expected schema.
//!
//! [`reconcile()`] walks the expected columns in order and, for each one,
//! either confirms the extracted type, widens int64 to float64 silently, or
//! coerces every row to the expected type after logging a mismatch warning.
//! The first missing column or unconvertible value aborts the whole call.
//!
//! A failed conversion does not roll back: rows converted earlier in the
//! failing column (and every column processed before it) keep their new
//! values. Callers that need the original batch must keep their own copy.

use log::{error, warn};
use thiserror::Error;

use crate::{
    data::{ConversionError, coerce_cell},
    rows::Row,
    schema::{ColumnType, Schema},
};

pub const LOG_TARGET: &str = "quake_ingest::reconcile";

/// Where mismatch warnings and abort messages go.
pub trait ReconcileLog {
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to the `log` facade under [`LOG_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFacade;

impl ReconcileLog for LogFacade {
    fn warn(&self, message: &str) {
        warn!(target: LOG_TARGET, "{message}");
    }

    fn error(&self, message: &str) {
        error!(target: LOG_TARGET, "{message}");
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentLog;

impl ReconcileLog for SilentLog {
    fn warn(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Missing column in extracted data: {column}")]
    MissingColumn { column: String },
    #[error(
        "Data type mismatch for column {column}: expected {expected}, got {extracted} (row {row}: {source})"
    )]
    Conversion {
        column: String,
        row: usize,
        value: String,
        expected: ColumnType,
        extracted: ColumnType,
        #[source]
        source: ConversionError,
    },
}

impl SchemaError {
    pub fn column(&self) -> &str {
        match self {
            SchemaError::MissingColumn { column } | SchemaError::Conversion { column, .. } => {
                column.as_str()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Widened,
    Converted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChange {
    pub column: String,
    pub from: ColumnType,
    pub to: ColumnType,
    pub kind: ChangeKind,
}

/// Columns touched by a successful reconciliation, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub changes: Vec<ColumnChange>,
}

impl ReconcileSummary {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn widened(&self) -> impl Iterator<Item = &str> {
        self.columns_of(ChangeKind::Widened)
    }

    pub fn converted(&self) -> impl Iterator<Item = &str> {
        self.columns_of(ChangeKind::Converted)
    }

    fn columns_of(&self, kind: ChangeKind) -> impl Iterator<Item = &str> {
        self.changes
            .iter()
            .filter(move |change| change.kind == kind)
            .map(|change| change.column.as_str())
    }
}

/// Aligns `extracted` with `expected`, rewriting `rows` in place.
///
/// Columns present only in `extracted` are left alone. Rows without a key
/// for a reconciled column are skipped for that column.
pub fn reconcile(
    extracted: &mut Schema,
    expected: &Schema,
    rows: &mut [Row],
    log: &dyn ReconcileLog,
) -> Result<ReconcileSummary, SchemaError> {
    let mut summary = ReconcileSummary::default();
    for column in &expected.columns {
        let name = column.name.as_str();
        let target = column.datatype;
        let Some(current) = extracted.get(name) else {
            let err = SchemaError::MissingColumn {
                column: name.to_string(),
            };
            log.error(&err.to_string());
            return Err(err);
        };
        if current == target {
            continue;
        }

        let kind = if current.widens_to(&target) {
            ChangeKind::Widened
        } else {
            log.warn(&format!(
                "Data type mismatch for column {name}: expected {target}, got {current}. Converting to {target}."
            ));
            ChangeKind::Converted
        };

        if let Err(err) = convert_column(name, current, target, rows) {
            log.error(&format!("Failed to convert column {name} to {target}: {err}"));
            return Err(err);
        }
        extracted.set(name, target);
        summary.changes.push(ColumnChange {
            column: name.to_string(),
            from: current,
            to: target,
            kind,
        });
    }
    Ok(summary)
}

pub fn reconcile_with_log_facade(
    extracted: &mut Schema,
    expected: &Schema,
    rows: &mut [Row],
) -> Result<ReconcileSummary, SchemaError> {
    reconcile(extracted, expected, rows, &LogFacade)
}

fn convert_column(
    column: &str,
    extracted: ColumnType,
    expected: ColumnType,
    rows: &mut [Row],
) -> Result<(), SchemaError> {
    for (idx, row) in rows.iter_mut().enumerate() {
        let Some(cell) = row.get_mut(column) else {
            continue;
        };
        let converted = coerce_cell(cell, &expected).map_err(|source| SchemaError::Conversion {
            column: column.to_string(),
            row: idx,
            value: cell.as_display(),
            expected,
            extracted,
            source,
        })?;
        *cell = converted;
    }
    Ok(())
}
