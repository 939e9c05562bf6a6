//! File upload: decode JSON, CSV or Excel payloads and coerce each row into
//! a [`Transaction`]. Rows that still fail shape checks are dropped.

pub mod coerce;
pub mod decode;

use chrono::NaiveDate;
use rand::Rng;

use crate::transaction::Transaction;

pub use coerce::{coerce_row, ValidationError};
pub use decode::{decode, UploadFormat};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
    #[error("could not parse file: {0}")]
    Malformed(String),
    #[error("uploaded JSON must be an array of transactions")]
    NotAnArray,
    #[error("sheet has no header row")]
    EmptySheet,
    #[error("no valid transactions found ({dropped} rows rejected)")]
    NoValidRows { dropped: usize },
}

/// A row rejected during import, with its zero-based position.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub row: usize,
    pub reason: ValidationError,
}

#[derive(Debug, Clone)]
pub struct ImportReport {
    pub transactions: Vec<Transaction>,
    pub rejected: Vec<RejectedRow>,
}

/// Coerce raw rows. Fails only when nothing survives.
pub fn import_rows<R: Rng + ?Sized>(
    rng: &mut R,
    rows: &[serde_json::Value],
    today: NaiveDate,
) -> Result<ImportReport, UploadError> {
    let mut transactions = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for (row, value) in rows.iter().enumerate() {
        match coerce_row(rng, value, today) {
            Ok(tx) => transactions.push(tx),
            Err(reason) => {
                tracing::warn!(row, %reason, "Dropping uploaded row");
                rejected.push(RejectedRow { row, reason });
            }
        }
    }

    if transactions.is_empty() {
        return Err(UploadError::NoValidRows {
            dropped: rejected.len(),
        });
    }

    Ok(ImportReport {
        transactions,
        rejected,
    })
}

/// Decode `bytes` according to `file_name`'s extension and import every row.
pub fn import<R: Rng + ?Sized>(
    rng: &mut R,
    file_name: &str,
    bytes: &[u8],
    today: NaiveDate,
) -> Result<ImportReport, UploadError> {
    let format = UploadFormat::from_file_name(file_name)?;
    let rows = decode(bytes, format)?;
    let report = import_rows(rng, &rows, today)?;

    tracing::info!(
        file = file_name,
        ?format,
        imported = report.transactions.len(),
        rejected = report.rejected.len(),
        "Upload imported"
    );

    Ok(report)
}
