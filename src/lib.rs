pub mod activity;
pub mod date_util;
pub mod error;
pub mod import;
pub mod llm;
pub mod period;
pub mod processor;
pub mod storage;
pub mod summary;
pub mod validate;

pub use activity::{Activity, Assignee};
pub use error::{Error, Result};
pub use import::{ImportReport, ImportStatus};
pub use period::Period;
pub use processor::{DataProcessor, ProcessingOptions, ProcessingResult, TimeRange};
pub use storage::Database;
pub use summary::{SummaryFormat, SummaryGenerator, SummaryRequest, SummaryResponse};

// Re-export repository types needed by the binary crate, but not the module itself
pub use storage::repository::ImportLogEntry;

use serde::Serialize;
use storage::repository;

/// Config key holding the default `minimum_time_spent` filter, in seconds.
pub const MINIMUM_TIME_SPENT_KEY: &str = "minimum_time_spent";

/// Snapshot of what the local store holds.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub activities: i64,
    pub users: i64,
    pub first_created: Option<String>,
    pub last_updated: Option<String>,
    pub last_import: Option<ImportLogEntry>,
}

/// Main entry point: imported activities plus the processing and summary pipeline.
pub struct WorkPulse {
    db: Database,
}

impl WorkPulse {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    // ── Import ─────────────────────────────────────────────────────

    pub async fn import_file(&self, path: impl AsRef<std::path::Path>) -> Result<ImportReport> {
        import::import_file(&self.db, path).await
    }

    // ── Processing ─────────────────────────────────────────────────

    /// Stored activities last updated within the period.
    pub async fn activities(&self, period: &Period) -> Result<Vec<Activity>> {
        let range = period.bounds()?;
        let activities = self
            .db
            .reader()
            .call(move |conn| repository::list_activities(conn, range))
            .await?;
        log::debug!("loaded {} activities for period {period}", activities.len());
        Ok(activities)
    }

    pub async fn process(
        &self,
        period: &Period,
        options: &ProcessingOptions,
    ) -> Result<ProcessingResult> {
        let activities = self.activities(period).await?;
        Ok(DataProcessor::new().process_activities(&activities, options))
    }

    /// Process the period and render it as a summary. An empty `request.period`
    /// is filled with the period's human label.
    pub async fn summarize(
        &self,
        period: &Period,
        options: &ProcessingOptions,
        request: SummaryRequest,
    ) -> Result<SummaryResponse> {
        let result = self.process(period, options).await?;
        let request = if request.period.is_empty() {
            SummaryRequest {
                period: period.label(),
                ..request
            }
        } else {
            request
        };
        SummaryGenerator::new().generate_summary(Some(&result), &request)
    }

    /// The configured default activity filter, if any.
    pub async fn minimum_time_spent(&self) -> Result<Option<u64>> {
        self.config_get(MINIMUM_TIME_SPENT_KEY)
            .await?
            .map(|v| parse_seconds(&v))
            .transpose()
    }

    pub async fn status(&self) -> Result<StoreStatus> {
        self.db
            .reader()
            .call(|conn| {
                let span = repository::activity_span(conn)?;
                let (first_created, last_updated) = match span {
                    Some((first, last)) => (Some(first), Some(last)),
                    None => (None, None),
                };
                Ok::<StoreStatus, rusqlite::Error>(StoreStatus {
                    activities: repository::count_activities(conn)?,
                    users: repository::count_users(conn)?,
                    first_created,
                    last_updated,
                    last_import: repository::last_import(conn)?,
                })
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    // ── Config commands ────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .reader()
            .call({
                let key = key.to_string();
                move |conn| repository::get_config(conn, &key)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Store a config value. Known keys are checked before they are written.
    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        match key {
            MINIMUM_TIME_SPENT_KEY => {
                parse_seconds(value)?;
            }
            "llm_provider" => {
                llm::resolve_model(value, llm::DEFAULT_MODEL)?;
            }
            _ => {}
        }
        self.db
            .writer()
            .call({
                let key = key.to_string();
                let value = value.to_string();
                move |conn| repository::set_config(conn, &key, &value)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        self.db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }
}

fn parse_seconds(value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| {
        Error::Config(format!(
            "{MINIMUM_TIME_SPENT_KEY} must be a whole number of seconds, got '{value}'"
        ))
    })
}
