//! Loading exported tracker data into the local store.

use std::path::Path;

use serde::Serialize;

use crate::activity::Activity;
use crate::error::{Error, Result};
use crate::storage::repository;
use crate::storage::Database;
use crate::validate::validate_value;

/// Outcome of importing one export file.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub source: String,
    pub status: ImportStatus,
    pub imported: u64,
    pub rejected: u64,
    /// One message per rejected record, prefixed with its position in the file.
    pub errors: Vec<String>,
}

impl ImportReport {
    /// Create an ImportReport with the status derived from counts.
    pub fn from_counts(source: String, imported: u64, errors: Vec<String>) -> Self {
        let rejected = errors.len() as u64;
        let status = if rejected == 0 {
            ImportStatus::Success
        } else if imported > 0 {
            ImportStatus::PartialFailure
        } else {
            ImportStatus::Failed
        };
        Self {
            source,
            status,
            imported,
            rejected,
            errors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportStatus {
    Success,
    PartialFailure,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Success => "Success",
            ImportStatus::PartialFailure => "PartialFailure",
            ImportStatus::Failed => "Failed",
        }
    }
}

/// Pull the record list out of an export: either a bare array or an object
/// with an `issues` array.
pub fn extract_records(value: serde_json::Value) -> Result<Vec<serde_json::Value>> {
    match value {
        serde_json::Value::Array(items) => Ok(items),
        serde_json::Value::Object(mut map) => match map.remove("issues") {
            Some(serde_json::Value::Array(items)) => Ok(items),
            Some(_) => Err(Error::Import("\"issues\" must be an array".into())),
            None => Err(Error::Import(
                "expected a JSON array or an object with an \"issues\" array".into(),
            )),
        },
        _ => Err(Error::Import(
            "expected a JSON array or an object with an \"issues\" array".into(),
        )),
    }
}

/// Validate every record, splitting them into accepted activities and
/// per-record error messages.
pub fn validate_records(records: Vec<serde_json::Value>) -> (Vec<Activity>, Vec<String>) {
    let mut accepted = Vec::with_capacity(records.len());
    let mut errors = Vec::new();
    for (i, record) in records.into_iter().enumerate() {
        let label = record
            .get("key")
            .and_then(|k| k.as_str())
            .map(|k| format!("record {i} ({k})"))
            .unwrap_or_else(|| format!("record {i}"));
        match validate_value(record) {
            Ok(activity) => accepted.push(activity),
            Err(e) => {
                log::warn!("rejected {label}: {e}");
                errors.push(format!("{label}: {e}"));
            }
        }
    }
    (accepted, errors)
}

/// Import a JSON export file into the database.
///
/// Unreadable or malformed files are an error; individual invalid records
/// are reported in the returned [`ImportReport`] instead.
pub async fn import_file(db: &Database, path: impl AsRef<Path>) -> Result<ImportReport> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let contents = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&contents)?;
    import_value(db, source, value).await
}

/// Import already-parsed JSON. `source` labels the report.
pub async fn import_value(
    db: &Database,
    source: String,
    value: serde_json::Value,
) -> Result<ImportReport> {
    let records = extract_records(value)?;
    let total = records.len();
    let (accepted, errors) = validate_records(records);

    let imported = accepted.len() as u64;
    let report = ImportReport::from_counts(source, imported, errors);

    let log_source = report.source.clone();
    let status = report.status.as_str();
    let rejected = report.rejected;
    db.writer()
        .call(move |conn| {
            let tx = conn.transaction()?;
            for activity in &accepted {
                repository::upsert_activity(&tx, activity)?;
            }
            repository::insert_import_log(&tx, &log_source, status, imported, rejected)?;
            tx.commit()?;
            Ok::<(), rusqlite::Error>(())
        })
        .await?;

    log::info!(
        "imported {imported} of {total} records from {} ({} rejected)",
        report.source,
        report.rejected
    );
    Ok(report)
}
