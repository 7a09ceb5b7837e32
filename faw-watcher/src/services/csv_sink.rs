//! Append-only per-session CSV output
//!
//! Output layout: `outputRoot/{groupId}/{conversationId}.csv`. The header is
//! the backend's feature columns plus `arousal, valence, filename,
//! timeStamp`; it is written once when the file is created and never again.
//! Each row is formatted in memory and written with a single call, so a row
//! is either fully present or absent.

use crate::models::{AffectScore, AuTable, SessionFolder};
use chrono::{DateTime, Utc};
use faw_common::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Per-session append-only CSV writer
pub struct CsvSink {
    output_root: PathBuf,
}

impl CsvSink {
    pub fn new(output_root: PathBuf) -> Self {
        Self { output_root }
    }

    /// Append one action-unit row for `session`.
    ///
    /// `affect` is `None` when scoring failed; the affect columns are then
    /// left empty. Returns the path written to.
    pub fn append_row(
        &self,
        session: &SessionFolder,
        table: &AuTable,
        affect: Option<AffectScore>,
        filename: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let path = session.output_csv(&self.output_root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let is_new = !path.exists();

        let mut record = String::new();
        if is_new {
            for column in &table.columns {
                record.push_str(&escape_field(column));
                record.push(',');
            }
            record.push_str("arousal,valence,filename,timeStamp\n");
        }

        for value in &table.values {
            record.push_str(&escape_field(value));
            record.push(',');
        }
        match affect {
            Some(score) => {
                record.push_str(&format!("{},{},", score.arousal, score.valence));
            }
            None => record.push_str(",,"),
        }
        record.push_str(&escape_field(filename));
        record.push(',');
        record.push_str(&timestamp.to_rfc3339());
        record.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        file.write_all(record.as_bytes())?;
        file.flush()?;

        Ok(path)
    }

    /// Output root this sink writes under.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }
}

/// Quote a CSV field if it contains a delimiter, quote, or newline.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
