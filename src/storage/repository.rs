use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::schema::{from_sql_timestamp, to_sql_timestamp};
use crate::activity::{Activity, Assignee};

// ── Activities ─────────────────────────────────────────────────────

pub fn upsert_activity(conn: &Connection, activity: &Activity) -> Result<(), rusqlite::Error> {
    let time_spent = i64::try_from(activity.time_spent).unwrap_or_else(|_| {
        log::warn!(
            "{}: time_spent {} exceeds storable range, clamping to {}",
            activity.key,
            activity.time_spent,
            i64::MAX
        );
        i64::MAX
    });
    conn.execute(
        "INSERT OR REPLACE INTO activities (
            activity_id, activity_key, summary, priority, status, time_spent,
            created_at, updated_at, assignee_id, assignee_name, imported_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            activity.id,
            activity.key,
            activity.summary,
            activity.priority,
            activity.status,
            time_spent,
            to_sql_timestamp(&activity.created),
            to_sql_timestamp(&activity.updated),
            activity.assignee.id,
            activity.assignee.display_name,
            to_sql_timestamp(&Utc::now()),
        ],
    )?;
    Ok(())
}

/// Activities whose `updated` timestamp falls in the half-open range
/// `[start, end)`, or all activities when no range is given.
pub fn list_activities(
    conn: &Connection,
    range: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Result<Vec<Activity>, rusqlite::Error> {
    const COLUMNS: &str = "SELECT activity_id, activity_key, summary, priority, status, time_spent,
                created_at, updated_at, assignee_id, assignee_name
         FROM activities";

    match range {
        Some((start, end)) => {
            let mut stmt = conn.prepare(&format!(
                "{COLUMNS} WHERE updated_at >= ?1 AND updated_at < ?2
                 ORDER BY created_at, activity_key"
            ))?;
            let rows = stmt.query_map(
                params![to_sql_timestamp(&start), to_sql_timestamp(&end)],
                activity_from_row,
            )?;
            rows.collect()
        }
        None => {
            let mut stmt =
                conn.prepare(&format!("{COLUMNS} ORDER BY created_at, activity_key"))?;
            let rows = stmt.query_map([], activity_from_row)?;
            rows.collect()
        }
    }
}

fn activity_from_row(row: &Row<'_>) -> Result<Activity, rusqlite::Error> {
    let time_spent: i64 = row.get(5)?;
    let created: String = row.get(6)?;
    let updated: String = row.get(7)?;
    Ok(Activity {
        id: row.get(0)?,
        key: row.get(1)?,
        summary: row.get(2)?,
        priority: row.get(3)?,
        status: row.get(4)?,
        time_spent: time_spent.max(0) as u64,
        created: from_sql_timestamp(6, &created)?,
        updated: from_sql_timestamp(7, &updated)?,
        assignee: Assignee::new(row.get::<_, String>(8)?, row.get::<_, String>(9)?),
    })
}

pub fn count_activities(conn: &Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))
}

pub fn count_users(conn: &Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(DISTINCT assignee_id) FROM activities",
        [],
        |row| row.get(0),
    )
}

/// Earliest `created` and latest `updated` timestamps across stored activities.
pub fn activity_span(conn: &Connection) -> Result<Option<(String, String)>, rusqlite::Error> {
    conn.query_row(
        "SELECT MIN(created_at), MAX(updated_at) FROM activities",
        [],
        |row| {
            let first: Option<String> = row.get(0)?;
            let last: Option<String> = row.get(1)?;
            Ok(first.zip(last))
        },
    )
}

// ── Import log ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ImportLogEntry {
    pub source: String,
    pub status: String,
    pub imported: i64,
    pub rejected: i64,
    pub imported_at: String,
}

pub fn insert_import_log(
    conn: &Connection,
    source: &str,
    status: &str,
    imported: u64,
    rejected: u64,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO import_log (source, status, imported, rejected, imported_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))",
        params![source, status, imported as i64, rejected as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn last_import(conn: &Connection) -> Result<Option<ImportLogEntry>, rusqlite::Error> {
    conn.query_row(
        "SELECT source, status, imported, rejected, imported_at
         FROM import_log ORDER BY import_id DESC LIMIT 1",
        [],
        |row| {
            Ok(ImportLogEntry {
                source: row.get(0)?,
                status: row.get(1)?,
                imported: row.get(2)?,
                rejected: row.get(3)?,
                imported_at: row.get(4)?,
            })
        },
    )
    .optional()
}

// ── App Config ─────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

// ── Narrative cache ────────────────────────────────────────────────

/// A cached AI narrative row. `input` is the report text the narrative was
/// written from.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredNarrative {
    pub headline: String,
    pub narrative: String,
    pub key_points: Vec<String>,
    pub input: String,
    pub generated_at: String,
}

pub fn get_cached_narrative(
    conn: &Connection,
    period_key: &str,
    prompt_version: &str,
) -> Result<Option<StoredNarrative>, rusqlite::Error> {
    conn.query_row(
        "SELECT headline, narrative, key_points, input_json, generated_at FROM fact_narratives
         WHERE period_key = ?1 AND prompt_version = ?2",
        params![period_key, prompt_version],
        |row| {
            let raw_points: String = row.get(2)?;
            let key_points = serde_json::from_str(&raw_points).unwrap_or_else(|e| {
                log::warn!("{period_key}: unreadable cached key_points ({e}), dropping them");
                Vec::new()
            });
            Ok(StoredNarrative {
                headline: row.get(0)?,
                narrative: row.get(1)?,
                key_points,
                input: row.get(3)?,
                generated_at: row.get(4)?,
            })
        },
    )
    .optional()
}

pub fn store_narrative(
    conn: &Connection,
    period_key: &str,
    prompt_version: &str,
    headline: &str,
    narrative: &str,
    key_points: &[String],
    input: &str,
) -> Result<(), rusqlite::Error> {
    let key_points = serde_json::to_string(key_points)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        "INSERT OR REPLACE INTO fact_narratives
         (period_key, prompt_version, headline, narrative, key_points, input_json, generated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))",
        params![period_key, prompt_version, headline, narrative, key_points, input],
    )?;
    Ok(())
}
