//! Action-unit table parsed from the extraction backend's per-image CSV
//!
//! The backend writes one CSV per image: a header row of feature column
//! names and one data row of values. Values are kept as raw strings; this
//! service never interprets individual feature columns.

use thiserror::Error;

/// Malformed backend CSV output
#[derive(Debug, Error)]
pub enum AuTableError {
    #[error("backend CSV has no header row")]
    MissingHeader,

    #[error("backend CSV has no data row")]
    MissingDataRow,

    #[error("backend CSV row has {got} values for {expected} columns")]
    ColumnMismatch { expected: usize, got: usize },
}

/// One image's extracted feature table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuTable {
    /// Feature column names, in backend order
    pub columns: Vec<String>,
    /// One row of values, aligned with `columns`
    pub values: Vec<String>,
}

impl AuTable {
    /// Parse the backend's per-image CSV (header row + first data row).
    ///
    /// Extra data rows are ignored; the backend emits one row per image.
    pub fn from_csv(text: &str) -> Result<AuTable, AuTableError> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());

        let header = lines.next().ok_or(AuTableError::MissingHeader)?;
        let row = lines.next().ok_or(AuTableError::MissingDataRow)?;

        let columns: Vec<String> = header.split(',').map(|c| c.trim().to_string()).collect();
        let values: Vec<String> = row.split(',').map(|v| v.trim().to_string()).collect();

        if columns.len() != values.len() {
            return Err(AuTableError::ColumnMismatch {
                expected: columns.len(),
                got: values.len(),
            });
        }

        Ok(AuTable { columns, values })
    }
}
